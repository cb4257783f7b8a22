use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ai_models")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: String,
    pub model_type: String,
    pub category_id: Option<String>,
    pub version: String,
    pub framework: String,
    pub model_file: Option<String>,
    pub config_file: Option<String>,
    pub accuracy: Option<f64>,
    pub precision_score: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
    /// JSON object text
    pub input_format: String,
    /// JSON object text
    pub output_format: String,
    pub max_input_length: i32,
    pub batch_size: i32,
    pub status: String,
    pub is_public: bool,
    pub created_by: String,
    pub last_trained: Option<DateTimeWithTimeZone>,
    pub total_inferences: i64,
    pub successful_inferences: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
