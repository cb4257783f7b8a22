pub mod ai_model;
pub mod ai_model_category;
pub mod comment;
pub mod inference_request;
pub mod model_deployment;
pub mod model_feedback;
pub mod model_team_member;
pub mod model_usage_log;
pub mod post;
pub mod post_image;
pub mod post_tag;
pub mod tag;
pub mod user;
