//! Errors surfaced by `ArticleStore`

use thiserror::Error;

use crate::remote::{ConfigError, RemoteError};
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Remote configuration could not be read or lacks an API key
    #[error("Invalid remote configuration: {0}")]
    ConfigInvalid(#[from] ConfigError),

    /// Article payload is missing required fields
    #[error("Invalid article: {0}")]
    Validation(String),

    /// Remote failure that does not trigger the local fallback
    #[error("Remote database error: {0}")]
    Remote(#[from] RemoteError),

    /// Local storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
