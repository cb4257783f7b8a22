use chrono::{DateTime, Utc};
use folio_common::forms::ModelDraft;
use folio_common::slug;
use folio_common::types::{success_rate, AIModel, ModelStatus, ModelType};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::entities::ai_model::{self, Column, Entity};
use crate::entities::{ai_model_category, model_team_member};
use crate::error::Result;
use crate::store::{icontains, taken_slugs, Store};

/// Filters for model listings. Every `Some` field narrows the result (AND).
#[derive(Debug, Clone, Default)]
pub struct ModelFilter {
    /// Only `is_public` models in `ready` status
    pub visible_only: bool,
    pub created_by: Option<String>,
    /// Exact category slug
    pub category_slug: Option<String>,
    pub model_type: Option<ModelType>,
    /// Case-insensitive substring of name or description
    pub search: Option<String>,
}

impl ModelFilter {
    pub fn visible() -> Self {
        Self {
            visible_only: true,
            ..Default::default()
        }
    }
}

/// Per-owner counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub total_models: u64,
    pub public_models: u64,
    pub ready_models: u64,
}

type ModelSelect = sea_orm::Select<Entity>;

fn apply_model_filter(mut q: ModelSelect, filter: &ModelFilter) -> ModelSelect {
    if filter.visible_only {
        q = q
            .filter(Column::IsPublic.eq(true))
            .filter(Column::Status.eq(ModelStatus::Ready.as_str()));
    }
    if let Some(ref created_by) = filter.created_by {
        q = q.filter(Column::CreatedBy.eq(created_by.as_str()));
    }
    if let Some(ref slug) = filter.category_slug {
        q = q.filter(
            Column::CategoryId.in_subquery(
                Query::select()
                    .column(ai_model_category::Column::Id)
                    .from(ai_model_category::Entity)
                    .and_where(ai_model_category::Column::Slug.eq(slug.as_str()))
                    .to_owned(),
            ),
        );
    }
    if let Some(model_type) = filter.model_type {
        q = q.filter(Column::ModelType.eq(model_type.as_str()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        q = q.filter(
            Condition::any()
                .add(icontains(Column::Name, search))
                .add(icontains(Column::Description, search)),
        );
    }
    q
}

fn json_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::Object(Default::default()))
}

impl Store {
    async fn team_for_models(&self, model_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        let mut out: HashMap<String, Vec<String>> = HashMap::new();
        if model_ids.is_empty() {
            return Ok(out);
        }
        let links = model_team_member::Entity::find()
            .filter(model_team_member::Column::ModelId.is_in(model_ids.iter().map(String::as_str)))
            .all(self.db())
            .await?;
        let user_ids: Vec<String> = links.iter().map(|l| l.user_id.clone()).collect();
        let names = self.usernames_by_ids(&user_ids).await?;
        for link in links {
            if let Some(name) = names.get(&link.user_id) {
                out.entry(link.model_id).or_default().push(name.clone());
            }
        }
        for members in out.values_mut() {
            members.sort();
        }
        Ok(out)
    }

    async fn hydrate_models(&self, models: Vec<ai_model::Model>) -> Result<Vec<AIModel>> {
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let creator_ids: Vec<String> = models.iter().map(|m| m.created_by.clone()).collect();
        let category_ids: Vec<String> = models.iter().filter_map(|m| m.category_id.clone()).collect();
        let creators = self.usernames_by_ids(&creator_ids).await?;
        let categories = self.categories_by_ids(&category_ids).await?;
        let mut teams = self.team_for_models(&ids).await?;

        Ok(models
            .into_iter()
            .map(|m| AIModel {
                category: m.category_id.as_ref().and_then(|id| categories.get(id).cloned()),
                created_by_username: creators.get(&m.created_by).cloned().unwrap_or_default(),
                team_members: teams.remove(&m.id).unwrap_or_default(),
                success_rate: success_rate(m.total_inferences, m.successful_inferences),
                model_type: m.model_type.parse().unwrap_or(ModelType::Custom),
                status: m.status.parse().unwrap_or(ModelStatus::Training),
                input_format: json_text(&m.input_format),
                output_format: json_text(&m.output_format),
                id: m.id,
                name: m.name,
                slug: m.slug,
                description: m.description,
                version: m.version,
                framework: m.framework,
                model_file: m.model_file,
                config_file: m.config_file,
                accuracy: m.accuracy,
                precision: m.precision_score,
                recall: m.recall,
                f1_score: m.f1_score,
                max_input_length: m.max_input_length,
                batch_size: m.batch_size,
                is_public: m.is_public,
                created_by: m.created_by,
                last_trained: m.last_trained.map(|t| t.with_timezone(&Utc)),
                total_inferences: m.total_inferences,
                successful_inferences: m.successful_inferences,
                created_at: m.created_at.with_timezone(&Utc),
                updated_at: m.updated_at.with_timezone(&Utc),
            })
            .collect())
    }

    async fn hydrate_model(&self, model: Option<ai_model::Model>) -> Result<Option<AIModel>> {
        match model {
            None => Ok(None),
            Some(m) => Ok(self.hydrate_models(vec![m]).await?.pop()),
        }
    }

    /// Newest first.
    pub async fn list_models(&self, filter: &ModelFilter, limit: u64, offset: u64) -> Result<Vec<AIModel>> {
        let rows = apply_model_filter(Entity::find(), filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        self.hydrate_models(rows).await
    }

    pub async fn count_models(&self, filter: &ModelFilter) -> Result<u64> {
        Ok(apply_model_filter(Entity::find(), filter).count(self.db()).await?)
    }

    pub async fn get_model_by_slug(&self, slug: &str) -> Result<Option<AIModel>> {
        let m = Entity::find()
            .filter(Column::Slug.eq(slug))
            .one(self.db())
            .await?;
        self.hydrate_model(m).await
    }

    pub async fn get_model_by_id(&self, id: &str) -> Result<Option<AIModel>> {
        let m = Entity::find_by_id(id).one(self.db()).await?;
        self.hydrate_model(m).await
    }

    pub async fn get_model_by_name_version(&self, name: &str, version: &str) -> Result<Option<AIModel>> {
        let m = Entity::find()
            .filter(Column::Name.eq(name))
            .filter(Column::Version.eq(version))
            .one(self.db())
            .await?;
        self.hydrate_model(m).await
    }

    /// Insert a model in `training` status with its creator as the first team
    /// member. A colliding slug gets a numeric suffix.
    pub async fn create_model(&self, created_by: &str, draft: &ModelDraft) -> Result<AIModel> {
        self.create_model_with_status(created_by, draft, ModelStatus::Training)
            .await
    }

    pub async fn create_model_with_status(
        &self,
        created_by: &str,
        draft: &ModelDraft,
        status: ModelStatus,
    ) -> Result<AIModel> {
        let now = Utc::now().fixed_offset();
        let txn = self.db().begin().await?;
        let taken = taken_slugs::<Entity, _>(&txn, Column::Slug, &draft.slug_base, slug::MODEL_SLUG_MAX).await?;
        let am = ai_model::ActiveModel {
            id: Set(folio_common::id::next_id()),
            name: Set(draft.name.clone()),
            slug: Set(slug::disambiguate(&draft.slug_base, &taken, slug::MODEL_SLUG_MAX)),
            description: Set(draft.description.clone()),
            model_type: Set(draft.model_type.as_str().to_owned()),
            category_id: Set(draft.category_id.clone()),
            version: Set(draft.version.clone()),
            framework: Set(draft.framework.clone()),
            model_file: Set(None),
            config_file: Set(None),
            accuracy: Set(draft.accuracy),
            precision_score: Set(draft.precision),
            recall: Set(draft.recall),
            f1_score: Set(draft.f1_score),
            input_format: Set(draft.input_format.to_string()),
            output_format: Set(draft.output_format.to_string()),
            max_input_length: Set(draft.max_input_length),
            batch_size: Set(draft.batch_size),
            status: Set(status.as_str().to_owned()),
            is_public: Set(draft.is_public),
            created_by: Set(created_by.to_owned()),
            last_trained: Set(None),
            total_inferences: Set(0),
            successful_inferences: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(&txn).await?;
        model_team_member::ActiveModel {
            model_id: Set(m.id.clone()),
            user_id: Set(created_by.to_owned()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        tracing::info!(model_id = %m.id, slug = %m.slug, "AI model registered");
        self.hydrate_model(Some(m))
            .await?
            .ok_or_else(|| crate::error::StorageError::Other("created model vanished".to_string()))
    }

    /// Replace the form-editable fields. Slug, status and counters are untouched.
    pub async fn update_model(&self, id: &str, draft: &ModelDraft) -> Result<Option<AIModel>> {
        let Some(m) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut active: ai_model::ActiveModel = m.into();
        active.name = Set(draft.name.clone());
        active.description = Set(draft.description.clone());
        active.model_type = Set(draft.model_type.as_str().to_owned());
        active.category_id = Set(draft.category_id.clone());
        active.version = Set(draft.version.clone());
        active.framework = Set(draft.framework.clone());
        active.accuracy = Set(draft.accuracy);
        active.precision_score = Set(draft.precision);
        active.recall = Set(draft.recall);
        active.f1_score = Set(draft.f1_score);
        active.input_format = Set(draft.input_format.to_string());
        active.output_format = Set(draft.output_format.to_string());
        active.max_input_length = Set(draft.max_input_length);
        active.batch_size = Set(draft.batch_size);
        active.is_public = Set(draft.is_public);
        active.updated_at = Set(Utc::now().fixed_offset());
        let m = active.update(self.db()).await?;
        self.hydrate_model(Some(m)).await
    }

    pub async fn set_model_status(
        &self,
        id: &str,
        status: ModelStatus,
        last_trained: Option<DateTime<Utc>>,
    ) -> Result<Option<AIModel>> {
        let Some(m) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut active: ai_model::ActiveModel = m.into();
        active.status = Set(status.as_str().to_owned());
        if let Some(t) = last_trained {
            active.last_trained = Set(Some(t.fixed_offset()));
        }
        active.updated_at = Set(Utc::now().fixed_offset());
        let m = active.update(self.db()).await?;
        self.hydrate_model(Some(m)).await
    }

    /// Replace the team with `user_ids`.
    pub async fn set_model_team(&self, model_id: &str, user_ids: &[String]) -> Result<Option<AIModel>> {
        let txn = self.db().begin().await?;
        let Some(m) = Entity::find_by_id(model_id).one(&txn).await? else {
            return Ok(None);
        };
        model_team_member::Entity::delete_many()
            .filter(model_team_member::Column::ModelId.eq(model_id))
            .exec(&txn)
            .await?;
        let mut seen = std::collections::HashSet::new();
        for user_id in user_ids.iter().filter(|id| seen.insert(id.as_str())) {
            model_team_member::ActiveModel {
                model_id: Set(model_id.to_owned()),
                user_id: Set(user_id.clone()),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;
        self.hydrate_model(Some(m)).await
    }

    /// Store uploaded artifact paths; `None` leaves the current value.
    pub async fn set_model_files(
        &self,
        id: &str,
        model_file: Option<&str>,
        config_file: Option<&str>,
    ) -> Result<Option<AIModel>> {
        let Some(m) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut active: ai_model::ActiveModel = m.into();
        if let Some(path) = model_file {
            active.model_file = Set(Some(path.to_owned()));
        }
        if let Some(path) = config_file {
            active.config_file = Set(Some(path.to_owned()));
        }
        active.updated_at = Set(Utc::now().fixed_offset());
        let m = active.update(self.db()).await?;
        self.hydrate_model(Some(m)).await
    }

    /// Atomically bump the inference counters of a model.
    pub async fn record_inference_outcome(&self, model_id: &str, success: bool) -> Result<()> {
        let mut update = Entity::update_many()
            .col_expr(Column::TotalInferences, Expr::col(Column::TotalInferences).add(1));
        if success {
            update = update.col_expr(
                Column::SuccessfulInferences,
                Expr::col(Column::SuccessfulInferences).add(1),
            );
        }
        update
            .filter(Column::Id.eq(model_id))
            .exec(self.db())
            .await?;
        Ok(())
    }

    pub async fn model_stats(&self, created_by: &str) -> Result<ModelStats> {
        let mine = || Entity::find().filter(Column::CreatedBy.eq(created_by));
        Ok(ModelStats {
            total_models: mine().count(self.db()).await?,
            public_models: mine()
                .filter(Column::IsPublic.eq(true))
                .count(self.db())
                .await?,
            ready_models: mine()
                .filter(Column::Status.eq(ModelStatus::Ready.as_str()))
                .count(self.db())
                .await?,
        })
    }
}
