use sea_orm::{DbErr, SqlErr};

/// Errors returned by [`crate::Store`].
///
/// Unique-constraint violations surface as [`StorageError::Conflict`] so the
/// HTTP layer can answer 409 without inspecting driver messages.
///
/// ```rust
/// use folio_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "post",
///     id: "hello-world".to_string(),
/// };
/// assert!(err.to_string().contains("post"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// A unique column already holds the value being written.
    #[error("Storage: conflict: {0}")]
    Conflict(String),

    /// A state change that the current row state does not allow.
    #[error("Storage: invalid transition of {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Storage: database error: {0}")]
    Database(DbErr),

    /// JSON text columns (`input_data`, `result`, ...) failed to (de)serialize.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage: {0}")]
    Other(String),
}

impl From<DbErr> for StorageError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => StorageError::Conflict(msg),
            _ => StorageError::Database(err),
        }
    }
}

impl StorageError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict(_))
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
