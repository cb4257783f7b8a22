use chrono::Utc;
use folio_common::types::ModelUsageLog;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::model_usage_log::{self, Column, Entity};
use crate::error::Result;
use crate::store::Store;

/// Request metadata captured for one inference call.
#[derive(Debug, Clone)]
pub struct UsageLogEntry {
    pub model_id: String,
    pub user_id: String,
    pub inference_request_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub api_endpoint: String,
    /// Seconds from request arrival to response
    pub response_time: f64,
}

fn to_log(m: model_usage_log::Model) -> ModelUsageLog {
    ModelUsageLog {
        id: m.id,
        model_id: m.model_id,
        user_id: m.user_id,
        inference_request_id: m.inference_request_id,
        ip_address: m.ip_address,
        user_agent: m.user_agent,
        api_endpoint: m.api_endpoint,
        response_time: m.response_time,
        cpu_usage: m.cpu_usage,
        gpu_usage: m.gpu_usage,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn insert_usage_log(&self, entry: &UsageLogEntry) -> Result<ModelUsageLog> {
        let am = model_usage_log::ActiveModel {
            id: Set(folio_common::id::next_id()),
            model_id: Set(entry.model_id.clone()),
            user_id: Set(entry.user_id.clone()),
            inference_request_id: Set(entry.inference_request_id.clone()),
            ip_address: Set(entry.ip_address.clone()),
            user_agent: Set(entry.user_agent.clone()),
            api_endpoint: Set(entry.api_endpoint.clone()),
            response_time: Set(entry.response_time),
            cpu_usage: Set(None),
            gpu_usage: Set(None),
            created_at: Set(Utc::now().fixed_offset()),
        };
        Ok(to_log(am.insert(self.db()).await?))
    }

    /// Newest first.
    pub async fn list_usage_logs(&self, model_id: &str, limit: u64, offset: u64) -> Result<Vec<ModelUsageLog>> {
        let rows = Entity::find()
            .filter(Column::ModelId.eq(model_id))
            .order_by(Column::CreatedAt, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_log).collect())
    }

    pub async fn count_usage_logs(&self, model_id: &str) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::ModelId.eq(model_id))
            .count(self.db())
            .await?)
    }
}
