//! Persistence for the blog and the model registry.
//!
//! [`Store`] wraps a SeaORM connection (SQLite by default) and exposes one
//! `async` method per query or mutation. Rows are returned as the shared
//! types from `folio_common::types`.

pub mod auth;
pub mod entities;
pub mod error;
pub mod store;


pub use error::StorageError;
pub use store::{InferenceOutcome, ModelFilter, ModelStats, PostFilter, Store, UsageLogEntry};

/// SQLite connection URL for a database file inside `data_dir`.
pub fn sqlite_url(data_dir: &std::path::Path, file_name: &str) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join(file_name).display())
}
