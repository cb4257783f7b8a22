use chrono::Utc;
use folio_common::forms::FeedbackDraft;
use folio_common::types::{FeedbackType, ModelFeedback};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use crate::entities::model_feedback::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;

fn to_feedback(m: model_feedback::Model) -> ModelFeedback {
    ModelFeedback {
        feedback_type: m.feedback_type.parse().unwrap_or(FeedbackType::NotSure),
        id: m.id,
        inference_request_id: m.inference_request_id,
        user_id: m.user_id,
        comment: m.comment,
        rating: m.rating,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl Store {
    /// One feedback row per (request, user); a second submission is a
    /// [`StorageError::Conflict`].
    pub async fn create_feedback(
        &self,
        inference_request_id: &str,
        user_id: &str,
        draft: &FeedbackDraft,
    ) -> Result<ModelFeedback> {
        let am = model_feedback::ActiveModel {
            id: Set(folio_common::id::next_id()),
            inference_request_id: Set(inference_request_id.to_owned()),
            user_id: Set(user_id.to_owned()),
            feedback_type: Set(draft.feedback_type.as_str().to_owned()),
            comment: Set(draft.comment.clone()),
            rating: Set(draft.rating),
            created_at: Set(Utc::now().fixed_offset()),
        };
        match am.insert(self.db()).await {
            Ok(m) => Ok(to_feedback(m)),
            Err(e) => match StorageError::from(e) {
                StorageError::Conflict(_) => Err(StorageError::Conflict(format!(
                    "feedback for inference request {inference_request_id} already submitted"
                ))),
                other => Err(other),
            },
        }
    }

    pub async fn get_feedback(&self, inference_request_id: &str, user_id: &str) -> Result<Option<ModelFeedback>> {
        let m = Entity::find()
            .filter(Column::InferenceRequestId.eq(inference_request_id))
            .filter(Column::UserId.eq(user_id))
            .one(self.db())
            .await?;
        Ok(m.map(to_feedback))
    }
}
