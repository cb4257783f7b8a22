use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "model_deployments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub model_id: String,
    pub deployment_type: String,
    pub endpoint_url: Option<String>,
    pub is_active: bool,
    pub replicas: i32,
    pub cpu_limit: String,
    pub memory_limit: String,
    pub health_check_url: Option<String>,
    pub last_health_check: Option<DateTimeWithTimeZone>,
    pub is_healthy: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
