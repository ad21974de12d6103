//! Remote document database
//!
//! The remote backend is a collection of JSON documents keyed by opaque,
//! backend-assigned ids, reachable after anonymous authentication.
//!
//! - `RemoteBackend`: the operations the article store needs
//! - `RemoteConnector`: builds a backend handle from a `RemoteConfig`
//! - `FirestoreBackend`: Cloud Firestore over its REST API
//! - `MemoryBackend`: in-process backend with failure injection
//!
//! Every failure is a `RemoteError` carrying a canonical code, which is
//! what the store's fallback policy classifies on.

mod config;
mod firestore;
mod literal;
mod memory;
mod value;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use config::{ConfigError, RemoteConfig};
pub use firestore::{FirestoreBackend, FirestoreConnector, SESSION_KEY};
pub use memory::{MemoryBackend, MemoryConnector};

/// Document body: field name to JSON value
pub type Fields = Map<String, Value>;

/// Message text the remote database uses for rule rejections
pub const INSUFFICIENT_PERMISSIONS: &str = "Missing or insufficient permissions";

/// Canonical remote error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl ErrorCode {
    /// Kebab-case code, e.g. `permission-denied`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Unknown => "unknown",
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::DeadlineExceeded => "deadline-exceeded",
            ErrorCode::NotFound => "not-found",
            ErrorCode::AlreadyExists => "already-exists",
            ErrorCode::PermissionDenied => "permission-denied",
            ErrorCode::ResourceExhausted => "resource-exhausted",
            ErrorCode::FailedPrecondition => "failed-precondition",
            ErrorCode::Aborted => "aborted",
            ErrorCode::OutOfRange => "out-of-range",
            ErrorCode::Unimplemented => "unimplemented",
            ErrorCode::Internal => "internal",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::DataLoss => "data-loss",
            ErrorCode::Unauthenticated => "unauthenticated",
        }
    }

    /// Parse a REST status such as `PERMISSION_DENIED`
    pub fn from_status(status: &str) -> Option<Self> {
        let code = match status {
            "CANCELLED" => ErrorCode::Cancelled,
            "UNKNOWN" => ErrorCode::Unknown,
            "INVALID_ARGUMENT" => ErrorCode::InvalidArgument,
            "DEADLINE_EXCEEDED" => ErrorCode::DeadlineExceeded,
            "NOT_FOUND" => ErrorCode::NotFound,
            "ALREADY_EXISTS" => ErrorCode::AlreadyExists,
            "PERMISSION_DENIED" => ErrorCode::PermissionDenied,
            "RESOURCE_EXHAUSTED" => ErrorCode::ResourceExhausted,
            "FAILED_PRECONDITION" => ErrorCode::FailedPrecondition,
            "ABORTED" => ErrorCode::Aborted,
            "OUT_OF_RANGE" => ErrorCode::OutOfRange,
            "UNIMPLEMENTED" => ErrorCode::Unimplemented,
            "INTERNAL" => ErrorCode::Internal,
            "UNAVAILABLE" => ErrorCode::Unavailable,
            "DATA_LOSS" => ErrorCode::DataLoss,
            "UNAUTHENTICATED" => ErrorCode::Unauthenticated,
            _ => return None,
        };
        Some(code)
    }

    /// Best-effort mapping from an HTTP status code
    pub fn from_http(status: u16) -> Self {
        match status {
            400 => ErrorCode::InvalidArgument,
            401 => ErrorCode::Unauthenticated,
            403 => ErrorCode::PermissionDenied,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Aborted,
            429 => ErrorCode::ResourceExhausted,
            499 => ErrorCode::Cancelled,
            500 => ErrorCode::Internal,
            501 => ErrorCode::Unimplemented,
            503 => ErrorCode::Unavailable,
            504 => ErrorCode::DeadlineExceeded,
            _ => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by the remote backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn permission_denied() -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            format!("{}.", INSUFFICIENT_PERMISSIONS),
        )
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    /// Whether this error should demote the store to local storage
    ///
    /// True for permission-denied and unavailable codes, and for any
    /// message reporting insufficient permissions.
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::PermissionDenied | ErrorCode::Unavailable
        ) || self.message.contains(INSUFFICIENT_PERMISSIONS)
    }
}

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A document read from a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Operations the article store performs against the remote database
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Whether a signed-in user is attached to this handle
    fn is_authenticated(&self) -> bool;

    /// Sign in anonymously, resuming a saved session when the backend
    /// keeps one
    async fn sign_in_anonymously(&self) -> RemoteResult<()>;

    /// Fetch every document in `collection`
    async fn list_documents(&self, collection: &str) -> RemoteResult<Vec<Document>>;

    /// Insert a document and return its backend-assigned id
    async fn add_document(&self, collection: &str, fields: Fields) -> RemoteResult<String>;

    /// Overwrite only the given fields of an existing document
    ///
    /// Fails with `not-found` if the document does not exist.
    async fn update_document(&self, collection: &str, id: &str, fields: Fields)
        -> RemoteResult<()>;

    /// Delete a document; deleting a missing document succeeds
    async fn delete_document(&self, collection: &str, id: &str) -> RemoteResult<()>;
}

/// Builds remote handles
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, config: &RemoteConfig) -> RemoteResult<Arc<dyn RemoteBackend>>;
}
