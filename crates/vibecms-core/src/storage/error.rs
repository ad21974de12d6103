//! Local storage errors
//!
//! I/O failures carry the path involved and are classified so the CLI can
//! print a hint next to the message.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot create storage directory '{path}': {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Access to '{path}' was denied")]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Out of disk space writing '{path}'")]
    NoSpace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure; `action` is "read", "write", "remove" ...
    #[error("Could not {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Could not encode '{key}' for storage: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The temp file was written but could not replace the target
    #[error("Could not move '{from}' into place at '{to}': {source}")]
    Replace {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classify an I/O error raised while performing `action` on `path`
    pub fn io(action: &'static str, path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            StorageError::AccessDenied { path, source }
        } else if is_out_of_space(&source) {
            StorageError::NoSpace { path, source }
        } else {
            StorageError::Io {
                action,
                path,
                source,
            }
        }
    }

    /// What the user can do about it, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::NoSpace { .. } => Some("Free up disk space and try again."),
            StorageError::AccessDenied { .. } | StorageError::Directory { .. } => {
                Some("Check permissions on the data directory (see `vibecms config show`).")
            }
            _ => None,
        }
    }
}

fn is_out_of_space(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

pub type StorageResult<T> = Result<T, StorageError>;
