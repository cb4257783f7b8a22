use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// String-backed enum stored as its snake_case name.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($value:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($value => Ok($name::$variant),)+
                    _ => Err(format!(
                        "Select a valid choice. {s} is not one of the available choices."
                    )),
                }
            }
        }
    };
}

text_enum! {
    /// Publication state of a blog post.
    pub enum PostStatus {
        Draft => ("draft", "Draft"),
        Published => ("published", "Published"),
    }
}

text_enum! {
    pub enum ModelType {
        TextClassification => ("text_classification", "Text Classification"),
        TextGeneration => ("text_generation", "Text Generation"),
        ImageClassification => ("image_classification", "Image Classification"),
        ObjectDetection => ("object_detection", "Object Detection"),
        SentimentAnalysis => ("sentiment_analysis", "Sentiment Analysis"),
        NamedEntityRecognition => ("named_entity_recognition", "Named Entity Recognition"),
        MachineTranslation => ("machine_translation", "Machine Translation"),
        QuestionAnswering => ("question_answering", "Question Answering"),
        Summarization => ("summarization", "Text Summarization"),
        Custom => ("custom", "Custom Model"),
    }
}

text_enum! {
    /// Lifecycle of a registered model. Only `ready` models are listed publicly.
    pub enum ModelStatus {
        Training => ("training", "Training"),
        Ready => ("ready", "Ready"),
        Deployed => ("deployed", "Deployed"),
        Maintenance => ("maintenance", "Maintenance"),
        Archived => ("archived", "Archived"),
    }
}

impl ModelStatus {
    /// Whether inference requests may be served in this state.
    pub fn accepts_inference(&self) -> bool {
        matches!(self, ModelStatus::Ready | ModelStatus::Deployed)
    }
}

text_enum! {
    pub enum InferenceStatus {
        Pending => ("pending", "Pending"),
        Processing => ("processing", "Processing"),
        Completed => ("completed", "Completed"),
        Failed => ("failed", "Failed"),
        Cancelled => ("cancelled", "Cancelled"),
    }
}

impl InferenceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InferenceStatus::Completed | InferenceStatus::Failed | InferenceStatus::Cancelled
        )
    }

    /// pending -> processing | cancelled, processing -> completed | failed | cancelled.
    pub fn can_transition_to(&self, next: InferenceStatus) -> bool {
        use InferenceStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }
}

text_enum! {
    pub enum FeedbackType {
        Correct => ("correct", "Correct"),
        Incorrect => ("incorrect", "Incorrect"),
        PartiallyCorrect => ("partially_correct", "Partially Correct"),
        NotSure => ("not_sure", "Not Sure"),
    }
}

text_enum! {
    pub enum DeploymentType {
        Local => ("local", "Local"),
        Cloud => ("cloud", "Cloud"),
        Edge => ("edge", "Edge"),
        Api => ("api", "API Endpoint"),
    }
}

/// Public URL prefix under which uploaded files are served.
pub const MEDIA_URL_PREFIX: &str = "/media/";

pub fn media_url(relative_path: &str) -> String {
    format!("{MEDIA_URL_PREFIX}{}", relative_path.trim_start_matches('/'))
}

/// Percentage of successful inferences; 0 when nothing has run yet.
pub fn success_rate(total: i64, successful: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub password_hash: String,
    pub is_staff: bool,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub token_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub slug: String,
    /// Hex colour, e.g. `#007bff`
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub author_id: String,
    pub author_username: String,
    /// Markdown source
    pub body: String,
    pub excerpt: String,
    pub featured_image: Option<String>,
    pub featured_image_url: Option<String>,
    pub status: PostStatus,
    pub views: i64,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostImage {
    pub id: String,
    pub post_id: String,
    /// Path relative to the media root
    pub image: String,
    pub url: String,
    pub alt_text: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AIModelCategory {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AIModel {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub model_type: ModelType,
    pub category: Option<AIModelCategory>,
    pub version: String,
    pub framework: String,
    pub model_file: Option<String>,
    pub config_file: Option<String>,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
    #[schema(value_type = Object)]
    pub input_format: Value,
    #[schema(value_type = Object)]
    pub output_format: Value,
    pub max_input_length: i32,
    pub batch_size: i32,
    pub status: ModelStatus,
    pub is_public: bool,
    pub created_by: String,
    pub created_by_username: String,
    /// Usernames of the team, creator included
    pub team_members: Vec<String>,
    pub last_trained: Option<DateTime<Utc>>,
    pub total_inferences: i64,
    pub successful_inferences: i64,
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AIModel {
    /// Creator, team members and staff may edit a model.
    pub fn can_edit(&self, user: &User) -> bool {
        user.is_staff
            || self.created_by == user.id
            || self.team_members.iter().any(|u| u == &user.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InferenceRequest {
    pub id: String,
    pub model_id: String,
    pub user_id: String,
    #[schema(value_type = Object)]
    pub input_data: Value,
    #[schema(value_type = Object)]
    pub parameters: Value,
    pub status: InferenceStatus,
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
    pub error_message: String,
    /// Seconds spent in the engine
    pub processing_time: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelUsageLog {
    pub id: String,
    pub model_id: String,
    pub user_id: String,
    pub inference_request_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub api_endpoint: String,
    pub response_time: f64,
    pub cpu_usage: Option<f64>,
    pub gpu_usage: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelFeedback {
    pub id: String,
    pub inference_request_id: String,
    pub user_id: String,
    pub feedback_type: FeedbackType,
    pub comment: String,
    pub rating: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelDeployment {
    pub id: String,
    pub model_id: String,
    pub deployment_type: DeploymentType,
    pub endpoint_url: Option<String>,
    pub is_active: bool,
    pub replicas: i32,
    pub cpu_limit: String,
    pub memory_limit: String,
    pub health_check_url: Option<String>,
    pub last_health_check: Option<DateTime<Utc>>,
    pub is_healthy: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_strings() {
        for t in ModelType::ALL {
            assert_eq!(t.as_str().parse::<ModelType>().unwrap(), *t);
        }
        assert_eq!("Published".parse::<PostStatus>().unwrap(), PostStatus::Published);
        assert!("weird".parse::<ModelStatus>().is_err());
        assert_eq!(ModelType::ALL.len(), 10);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&FeedbackType::PartiallyCorrect).unwrap();
        assert_eq!(json, "\"partially_correct\"");
        let t: ModelType = serde_json::from_str("\"named_entity_recognition\"").unwrap();
        assert_eq!(t, ModelType::NamedEntityRecognition);
    }

    #[test]
    fn success_rate_handles_zero() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(4, 3), 75.0);
        assert_eq!(success_rate(3, 3), 100.0);
    }

    #[test]
    fn inference_transitions() {
        use InferenceStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in InferenceStatus::ALL {
                assert!(!terminal.can_transition_to(*next));
            }
        }
    }

    #[test]
    fn media_urls() {
        assert_eq!(media_url("posts/content/2024/01/a.png"), "/media/posts/content/2024/01/a.png");
        assert_eq!(media_url("/x.png"), "/media/x.png");
    }
}
