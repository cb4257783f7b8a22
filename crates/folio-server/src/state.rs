use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use folio_inference::InferenceEngine;
use folio_storage::Store;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub engine: Arc<dyn InferenceEngine>,
    pub start_time: DateTime<Utc>,
    pub jwt_secret: Arc<String>,
    pub token_expire_secs: u64,
    pub media_root: Arc<PathBuf>,
    pub config: Arc<ServerConfig>,
}
