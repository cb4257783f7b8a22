use chrono::Utc;
use folio_common::forms::DeploymentDraft;
use folio_common::types::{DeploymentType, ModelDeployment};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};

use crate::entities::model_deployment::{self, Column, Entity};
use crate::error::Result;
use crate::store::Store;

fn to_deployment(m: model_deployment::Model) -> ModelDeployment {
    ModelDeployment {
        deployment_type: m.deployment_type.parse().unwrap_or(DeploymentType::Local),
        id: m.id,
        model_id: m.model_id,
        endpoint_url: m.endpoint_url,
        is_active: m.is_active,
        replicas: m.replicas,
        cpu_limit: m.cpu_limit,
        memory_limit: m.memory_limit,
        health_check_url: m.health_check_url,
        last_health_check: m.last_health_check.map(|t| t.with_timezone(&Utc)),
        is_healthy: m.is_healthy,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn create_deployment(&self, model_id: &str, draft: &DeploymentDraft) -> Result<ModelDeployment> {
        let now = Utc::now().fixed_offset();
        let am = model_deployment::ActiveModel {
            id: Set(folio_common::id::next_id()),
            model_id: Set(model_id.to_owned()),
            deployment_type: Set(draft.deployment_type.as_str().to_owned()),
            endpoint_url: Set(draft.endpoint_url.clone()),
            is_active: Set(draft.is_active),
            replicas: Set(draft.replicas),
            cpu_limit: Set(draft.cpu_limit.clone()),
            memory_limit: Set(draft.memory_limit.clone()),
            health_check_url: Set(draft.health_check_url.clone()),
            last_health_check: Set(None),
            is_healthy: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(to_deployment(am.insert(self.db()).await?))
    }

    /// Newest first.
    pub async fn list_deployments(&self, model_id: &str) -> Result<Vec<ModelDeployment>> {
        let rows = Entity::find()
            .filter(Column::ModelId.eq(model_id))
            .order_by(Column::CreatedAt, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_deployment).collect())
    }

    pub async fn get_deployment(&self, id: &str) -> Result<Option<ModelDeployment>> {
        let m = Entity::find_by_id(id).one(self.db()).await?;
        Ok(m.map(to_deployment))
    }

    /// Stamp a health check. No probe is sent; an active deployment is
    /// reported healthy.
    pub async fn record_health_check(&self, id: &str) -> Result<Option<ModelDeployment>> {
        let Some(m) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let now = Utc::now().fixed_offset();
        let healthy = m.is_active;
        let mut active: model_deployment::ActiveModel = m.into();
        active.last_health_check = Set(Some(now));
        active.is_healthy = Set(healthy);
        active.updated_at = Set(now);
        Ok(Some(to_deployment(active.update(self.db()).await?)))
    }
}
