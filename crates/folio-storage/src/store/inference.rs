use chrono::Utc;
use folio_common::types::{InferenceRequest, InferenceStatus};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde_json::Value;

use crate::entities::inference_request::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;

fn to_request(m: inference_request::Model) -> Result<InferenceRequest> {
    Ok(InferenceRequest {
        input_data: serde_json::from_str(&m.input_data)?,
        parameters: serde_json::from_str(&m.parameters)?,
        result: m.result.as_deref().map(serde_json::from_str::<Value>).transpose()?,
        status: m.status.parse().map_err(StorageError::Other)?,
        id: m.id,
        model_id: m.model_id,
        user_id: m.user_id,
        error_message: m.error_message,
        processing_time: m.processing_time,
        created_at: m.created_at.with_timezone(&Utc),
        started_at: m.started_at.map(|t| t.with_timezone(&Utc)),
        completed_at: m.completed_at.map(|t| t.with_timezone(&Utc)),
    })
}

/// Field changes applied together with a status transition.
#[derive(Debug, Clone, Default)]
pub struct InferenceOutcome {
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub processing_time: Option<f64>,
}

impl Store {
    /// Record a new request in `pending` status.
    pub async fn create_inference_request(
        &self,
        model_id: &str,
        user_id: &str,
        input_data: &Value,
        parameters: &Value,
    ) -> Result<InferenceRequest> {
        let am = inference_request::ActiveModel {
            id: Set(folio_common::id::next_id()),
            model_id: Set(model_id.to_owned()),
            user_id: Set(user_id.to_owned()),
            input_data: Set(serde_json::to_string(input_data)?),
            parameters: Set(serde_json::to_string(parameters)?),
            status: Set(InferenceStatus::Pending.as_str().to_owned()),
            result: Set(None),
            error_message: Set(String::new()),
            processing_time: Set(None),
            created_at: Set(Utc::now().fixed_offset()),
            started_at: Set(None),
            completed_at: Set(None),
        };
        to_request(am.insert(self.db()).await?)
    }

    pub async fn get_inference_request(&self, id: &str) -> Result<Option<InferenceRequest>> {
        Entity::find_by_id(id)
            .one(self.db())
            .await?
            .map(to_request)
            .transpose()
    }

    /// Most recent requests against a model.
    pub async fn list_recent_inferences(&self, model_id: &str, limit: u64) -> Result<Vec<InferenceRequest>> {
        Entity::find()
            .filter(Column::ModelId.eq(model_id))
            .order_by(Column::CreatedAt, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .limit(limit)
            .all(self.db())
            .await?
            .into_iter()
            .map(to_request)
            .collect()
    }

    /// Move a request to `next`, rejecting transitions the state machine
    /// does not allow. `processing` stamps `started_at`; terminal states
    /// stamp `completed_at`.
    pub async fn transition_inference(
        &self,
        id: &str,
        next: InferenceStatus,
        outcome: InferenceOutcome,
    ) -> Result<InferenceRequest> {
        let m = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "inference_request",
                id: id.to_string(),
            })?;
        let current: InferenceStatus = m.status.parse().map_err(StorageError::Other)?;
        if !current.can_transition_to(next) {
            return Err(StorageError::InvalidTransition {
                entity: "inference_request",
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let now = Utc::now().fixed_offset();
        let mut active: inference_request::ActiveModel = m.into();
        active.status = Set(next.as_str().to_owned());
        if next == InferenceStatus::Processing {
            active.started_at = Set(Some(now));
        }
        if next.is_terminal() {
            active.completed_at = Set(Some(now));
        }
        if let Some(result) = outcome.result {
            active.result = Set(Some(serde_json::to_string(&result)?));
        }
        if let Some(message) = outcome.error_message {
            active.error_message = Set(message);
        }
        if let Some(secs) = outcome.processing_time {
            active.processing_time = Set(Some(secs));
        }
        to_request(active.update(self.db()).await?)
    }

    /// Close a request whose run was interrupted: `processing` becomes
    /// `failed` with `reason`, `pending` becomes `cancelled`. Returns `None`
    /// when the request is already terminal.
    pub async fn abandon_inference(&self, id: &str, reason: &str) -> Result<Option<InferenceRequest>> {
        let Some(current) = self.get_inference_request(id).await? else {
            return Ok(None);
        };
        let next = match current.status {
            InferenceStatus::Pending => InferenceStatus::Cancelled,
            InferenceStatus::Processing => InferenceStatus::Failed,
            _ => return Ok(None),
        };
        let outcome = InferenceOutcome {
            error_message: Some(reason.to_string()),
            ..Default::default()
        };
        self.transition_inference(id, next, outcome).await.map(Some)
    }
}
