//! Article store
//!
//! The `ArticleStore` is the single persistence entry point. It routes
//! `list`, `save` and `delete` to the remote document database while in
//! remote mode, and to the local blob store otherwise.
//!
//! ## Fallback
//!
//! When the remote database rejects an operation with a permission or
//! availability error, the store:
//!
//! 1. shows a one-time notice through its `Notifier`
//! 2. switches to local mode for the rest of the session
//! 3. re-runs the same operation against local storage
//!
//! The local retry is not wrapped again; if it fails, that error is
//! returned. Every other remote error is returned unchanged.
//!
//! ## Usage
//!
//! ```ignore
//! let store = ArticleStore::open(&config);
//! store.restore().await;  // reconnect with the saved remote config
//!
//! let article = store.save(&ArticleDraft::new("Title", "Body")).await?;
//! let articles = store.list().await?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::context::{PersistenceContext, StoreMode};
use crate::error::{StoreError, StoreResult};
use crate::models::{Article, ArticleDraft};
use crate::notice::{LogNotifier, Notifier, PERMISSION_NOTICE};
use crate::remote::{FirestoreConnector, RemoteConfig, RemoteConnector, RemoteError, SESSION_KEY};
use crate::storage::{FileKeyValueStore, KeyValueStore, LocalArticles};

/// Remote collection holding one document per article
pub const REMOTE_COLLECTION: &str = "articles";

/// Local key holding the last remote configuration that initialized
pub const REMOTE_CONFIG_KEY: &str = "remote_config";

/// Persistence facade with remote-first, local-fallback routing
pub struct ArticleStore {
    context: PersistenceContext,
    connector: Arc<dyn RemoteConnector>,
    kv: Arc<dyn KeyValueStore>,
    local: LocalArticles,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ArticleStore {
    /// Create a store in local mode
    pub fn new(kv: Arc<dyn KeyValueStore>, connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            context: PersistenceContext::new(),
            connector,
            local: LocalArticles::new(Arc::clone(&kv)),
            kv,
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
        }
    }

    /// Open the store described by `config`: files under `data_dir`,
    /// Firestore as the remote
    pub fn open(config: &Config) -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(&config.data_dir));
        let connector = FirestoreConnector::new().with_session_store(Arc::clone(&kv));
        Self::new(kv, Arc::new(connector))
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn mode(&self) -> StoreMode {
        self.context.mode()
    }

    pub fn context(&self) -> &PersistenceContext {
        &self.context
    }

    // ==================== Remote setup ====================

    /// Connect to the remote database and switch to remote mode
    ///
    /// Returns false without touching any state when the API key is
    /// missing, and false in local mode when the client cannot be built.
    /// A failed anonymous sign-in is only logged.
    pub async fn initialize(&self, config: &RemoteConfig) -> bool {
        if let Err(e) = config.validate() {
            warn!("Remote initialization skipped: {}", e);
            return false;
        }

        let backend = match self
            .context
            .get_or_create_remote_handle(self.connector.as_ref(), config)
            .await
        {
            Ok(backend) => backend,
            Err(e) => {
                warn!("Remote initialization failed: {}", e);
                self.context.set_mode(StoreMode::Local);
                return false;
            }
        };

        if !backend.is_authenticated() {
            match backend.sign_in_anonymously().await {
                Ok(()) => info!("Signed in anonymously to the remote database"),
                Err(e) => warn!(
                    "Anonymous sign-in failed; requests will fail if the database rules require auth: {}",
                    e
                ),
            }
        }

        self.context.clear_notified();
        self.context.set_mode(StoreMode::Remote);
        info!("Remote database initialized for project {}", config.project_id);
        true
    }

    /// Parse pasted configuration text, initialize with it, and remember
    /// it for `restore` if initialization succeeds
    pub async fn configure(&self, text: &str) -> StoreResult<bool> {
        let config = RemoteConfig::parse_validated(text)?;
        if !self.initialize(&config).await {
            return Ok(false);
        }
        self.kv.set(REMOTE_CONFIG_KEY, &config.to_json())?;
        Ok(true)
    }

    /// Initialize from the remembered configuration, if any
    pub async fn restore(&self) -> bool {
        match self.saved_remote_config() {
            Ok(Some(config)) => self.initialize(&config).await,
            Ok(None) => false,
            Err(e) => {
                warn!("Ignoring saved remote configuration: {}", e);
                false
            }
        }
    }

    /// The remembered remote configuration
    pub fn saved_remote_config(&self) -> StoreResult<Option<RemoteConfig>> {
        let Some(raw) = self.kv.get(REMOTE_CONFIG_KEY)? else {
            return Ok(None);
        };
        Ok(Some(RemoteConfig::parse(&raw)?))
    }

    /// Forget the remembered configuration and go back to local mode
    pub async fn forget_remote(&self) -> StoreResult<()> {
        self.kv.remove(REMOTE_CONFIG_KEY)?;
        self.kv.remove(SESSION_KEY)?;
        self.context.reset().await;
        Ok(())
    }

    // ==================== Article operations ====================

    /// All articles
    ///
    /// Remote results are sorted by `updatedAt`, newest first; local
    /// results keep their stored order.
    pub async fn list(&self) -> StoreResult<Vec<Article>> {
        let Some(remote) = self.context.active_remote().await else {
            return Ok(self.local.list()?);
        };

        match remote.list_documents(REMOTE_COLLECTION).await {
            Ok(documents) => {
                let now = self.clock.now_millis();
                let mut articles: Vec<Article> = documents
                    .iter()
                    .map(|doc| Article::from_fields(doc.id.as_str(), &doc.fields, now))
                    .collect();
                articles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                Ok(articles)
            }
            Err(e) => {
                self.fall_back("list", e)?;
                Ok(self.local.list()?)
            }
        }
    }

    /// Find one article by exact id
    pub async fn get(&self, id: &str) -> StoreResult<Option<Article>> {
        Ok(self.list().await?.into_iter().find(|a| a.id == id))
    }

    /// Create (no id) or update (with id) an article
    ///
    /// A remote update returns the written fields merged with the id,
    /// without reading the document back; unsent fields carry list
    /// defaults. Use `get` for the full record.
    pub async fn save(&self, draft: &ArticleDraft) -> StoreResult<Article> {
        draft.validate().map_err(StoreError::Validation)?;
        let now = self.clock.now_millis();

        let Some(remote) = self.context.active_remote().await else {
            return Ok(self.local.save(draft, now)?);
        };

        let mut fields = draft.to_fields(now);
        let result = match &draft.id {
            Some(id) => remote
                .update_document(REMOTE_COLLECTION, id, fields.clone())
                .await
                .map(|()| Article::from_fields(id.as_str(), &fields, now)),
            None => {
                fields.insert("createdAt".into(), Value::from(now));
                remote
                    .add_document(REMOTE_COLLECTION, fields.clone())
                    .await
                    .map(|id| Article::from_fields(id, &fields, now))
            }
        };

        match result {
            Ok(article) => {
                debug!("Saved article {} remotely", article.id);
                Ok(article)
            }
            Err(e) => {
                self.fall_back("save", e)?;
                Ok(self.local.save(draft, now)?)
            }
        }
    }

    /// Delete an article; unknown ids are a no-op
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let Some(remote) = self.context.active_remote().await else {
            return Ok(self.local.delete(id)?);
        };

        match remote.delete_document(REMOTE_COLLECTION, id).await {
            Ok(()) => {
                debug!("Deleted article {} remotely", id);
                Ok(())
            }
            Err(e) => {
                self.fall_back("delete", e)?;
                Ok(self.local.delete(id)?)
            }
        }
    }

    /// Apply the fallback policy to a remote failure
    ///
    /// `Ok` means the caller should retry locally; any other error is
    /// handed back unchanged.
    fn fall_back(&self, operation: &str, error: RemoteError) -> StoreResult<()> {
        if !error.is_fallback_trigger() {
            warn!("Remote {} failed: {}", operation, error);
            return Err(StoreError::Remote(error));
        }

        warn!(
            "Remote {} rejected ({}); switching to local storage",
            operation, error
        );
        if self.context.mark_notified() {
            self.notifier.notify(PERMISSION_NOTICE);
        }
        self.context.demote();
        Ok(())
    }
}
