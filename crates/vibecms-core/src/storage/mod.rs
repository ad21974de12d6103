//! Local storage layer
//!
//! A synchronous key-value blob store plus the article collection kept
//! inside it.
//!
//! ## Layout
//!
//! - `articles`: the whole article collection as one JSON array
//! - `remote_config`: the last remote configuration that initialized
//!   successfully, in strict JSON
//! - `auth_session`: refresh token of the anonymous remote user
//!
//! Local storage never fails for permission reasons of the remote kind,
//! which is what makes it the fallback target.

pub mod articles;
pub mod error;
pub mod kv;

pub use articles::{LocalArticles, ARTICLES_KEY};
pub use error::{StorageError, StorageResult};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
