use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "model_usage_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub model_id: String,
    pub user_id: String,
    #[sea_orm(unique)]
    pub inference_request_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub api_endpoint: String,
    pub response_time: f64,
    pub cpu_usage: Option<f64>,
    pub gpu_usage: Option<f64>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
