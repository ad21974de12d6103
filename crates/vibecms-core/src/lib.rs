//! VibeCMS Core Library
//!
//! This crate provides the core functionality for VibeCMS, a single-user
//! content-management tool for short articles.
//!
//! # Architecture
//!
//! - **Remote first**: articles live in a Firestore collection once a
//!   remote configuration has been supplied
//! - **Local fallback**: a permission or availability failure switches the
//!   session to a local key-value blob and retries there
//!
//! # Quick Start
//!
//! ```text
//! let store = ArticleStore::open(&config);
//! store.restore().await;
//!
//! // Create an article
//! let article = store.save(&ArticleDraft::new("Hello", "First post")).await?;
//!
//! // Query articles
//! let articles = store.list().await?;
//! ```
//!
//! # Modules
//!
//! - `store`: Article persistence facade (main entry point)
//! - `models`: Article, draft and status types
//! - `context`: Mode, remote handle and notice state
//! - `remote`: Remote backend trait, Firestore client, config parsing
//! - `storage`: Local key-value storage
//! - `assistant`: AI drafting helpers
//! - `config`: Application configuration

pub mod assistant;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod notice;
pub mod remote;
pub mod storage;
pub mod store;

pub use assistant::{Assistant, AssistantError, GeminiClient, TextGenerator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use context::{PersistenceContext, StoreMode};
pub use error::{StoreError, StoreResult};
pub use models::{Article, ArticleDraft, ArticleStatus};
pub use notice::{LogNotifier, Notifier, PERMISSION_NOTICE};
pub use remote::{ErrorCode, RemoteBackend, RemoteConfig, RemoteConnector, RemoteError};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError};
pub use store::ArticleStore;
