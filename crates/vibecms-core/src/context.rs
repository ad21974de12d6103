//! Persistence context
//!
//! Owns the state that decides where article operations go:
//!
//! - the store mode (`Remote` or `Local`)
//! - the remote handle, constructed at most once per configuration
//! - whether the fallback notice has already been shown
//!
//! Mode and notice flag are atomics so a demotion is never observed
//! half-done; the handle sits behind an async mutex so concurrent
//! `initialize` calls cannot construct two clients.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::remote::{RemoteBackend, RemoteConfig, RemoteConnector, RemoteResult};

/// Which backend article operations are routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Remote,
    Local,
}

impl StoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMode::Remote => "remote",
            StoreMode::Local => "local",
        }
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct RemoteHandle {
    config: RemoteConfig,
    backend: Arc<dyn RemoteBackend>,
}

/// Mode, remote handle and notice state for one `ArticleStore`
pub struct PersistenceContext {
    remote_mode: AtomicBool,
    notified: AtomicBool,
    handle: Mutex<Option<RemoteHandle>>,
}

impl Default for PersistenceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceContext {
    /// A fresh context in local mode
    pub fn new() -> Self {
        Self {
            remote_mode: AtomicBool::new(false),
            notified: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> StoreMode {
        if self.remote_mode.load(Ordering::SeqCst) {
            StoreMode::Remote
        } else {
            StoreMode::Local
        }
    }

    pub(crate) fn set_mode(&self, mode: StoreMode) {
        let previous = self
            .remote_mode
            .swap(mode == StoreMode::Remote, Ordering::SeqCst);
        if previous != (mode == StoreMode::Remote) {
            info!("Storage mode is now {}", mode);
        }
    }

    /// Switch to local mode; returns true if the store was remote
    pub(crate) fn demote(&self) -> bool {
        let was_remote = self.remote_mode.swap(false, Ordering::SeqCst);
        if was_remote {
            info!("Storage mode is now {}", StoreMode::Local);
        }
        was_remote
    }

    /// Whether the fallback notice has been shown
    pub fn notified(&self) -> bool {
        self.notified.load(Ordering::SeqCst)
    }

    /// Record that the notice is being shown; true only for the first caller
    pub(crate) fn mark_notified(&self) -> bool {
        !self.notified.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn clear_notified(&self) {
        self.notified.store(false, Ordering::SeqCst);
    }

    /// The remote handle to use for the next operation, if in remote mode
    pub(crate) async fn active_remote(&self) -> Option<Arc<dyn RemoteBackend>> {
        if self.mode() != StoreMode::Remote {
            return None;
        }
        self.handle
            .lock()
            .await
            .as_ref()
            .map(|h| Arc::clone(&h.backend))
    }

    /// Whether a remote handle has been constructed
    pub async fn has_remote_handle(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Return the held handle or construct one
    ///
    /// A handle built from an equal configuration is reused; a different
    /// configuration replaces it.
    pub(crate) async fn get_or_create_remote_handle(
        &self,
        connector: &dyn RemoteConnector,
        config: &RemoteConfig,
    ) -> RemoteResult<Arc<dyn RemoteBackend>> {
        let mut handle = self.handle.lock().await;

        if let Some(existing) = handle.as_ref() {
            if existing.config == *config {
                debug!("Reusing remote handle");
                return Ok(Arc::clone(&existing.backend));
            }
            debug!("Remote configuration changed, replacing handle");
        }

        let backend = connector.connect(config).await?;
        *handle = Some(RemoteHandle {
            config: config.clone(),
            backend: Arc::clone(&backend),
        });
        Ok(backend)
    }

    /// Drop the held handle and return to local mode
    pub(crate) async fn reset(&self) {
        *self.handle.lock().await = None;
        self.set_mode(StoreMode::Local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryBackend, MemoryConnector};

    #[test]
    fn test_starts_local() {
        let context = PersistenceContext::new();
        assert_eq!(context.mode(), StoreMode::Local);
        assert!(!context.notified());
    }

    #[test]
    fn test_mark_notified_once() {
        let context = PersistenceContext::new();
        assert!(context.mark_notified());
        assert!(!context.mark_notified());
        assert!(context.notified());

        context.clear_notified();
        assert!(context.mark_notified());
    }

    #[test]
    fn test_demote() {
        let context = PersistenceContext::new();
        assert!(!context.demote());

        context.set_mode(StoreMode::Remote);
        assert!(context.demote());
        assert_eq!(context.mode(), StoreMode::Local);
    }

    #[tokio::test]
    async fn test_handle_reused_for_same_config() {
        let connector = MemoryConnector::new(Arc::new(MemoryBackend::new()));
        let context = PersistenceContext::new();
        let config = RemoteConfig::new("key", "demo");

        context
            .get_or_create_remote_handle(&connector, &config)
            .await
            .unwrap();
        context
            .get_or_create_remote_handle(&connector, &config)
            .await
            .unwrap();
        assert_eq!(connector.connects(), 1);

        context
            .get_or_create_remote_handle(&connector, &RemoteConfig::new("other", "demo"))
            .await
            .unwrap();
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_active_remote_requires_remote_mode() {
        let connector = MemoryConnector::new(Arc::new(MemoryBackend::new()));
        let context = PersistenceContext::new();
        context
            .get_or_create_remote_handle(&connector, &RemoteConfig::new("key", "demo"))
            .await
            .unwrap();

        assert!(context.has_remote_handle().await);
        assert!(context.active_remote().await.is_none());

        context.set_mode(StoreMode::Remote);
        assert!(context.active_remote().await.is_some());

        context.reset().await;
        assert!(!context.has_remote_handle().await);
        assert_eq!(context.mode(), StoreMode::Local);
    }
}
