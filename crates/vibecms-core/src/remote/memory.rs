//! In-process remote backend
//!
//! Behaves like the document database (backend-assigned ids, partial
//! updates that fail on missing documents, idempotent deletes) without a
//! network. Failures can be injected to exercise the store's fallback
//! path, and every document operation is counted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    Document, ErrorCode, Fields, RemoteBackend, RemoteConfig, RemoteConnector, RemoteError,
    RemoteResult,
};

#[derive(Default)]
struct State {
    /// collection name -> documents in insertion order
    collections: HashMap<String, Vec<Document>>,
    /// error returned by every document operation while set
    failure: Option<RemoteError>,
    sign_in_failure: Option<RemoteError>,
}

/// In-memory document database
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    authenticated: AtomicBool,
    next_id: AtomicUsize,
    calls: AtomicUsize,
    sign_ins: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail every document operation with `error` until cleared
    pub fn fail_with(&self, error: Option<RemoteError>) {
        self.lock().failure = error;
    }

    /// Fail anonymous sign-in with `error` until cleared
    pub fn fail_sign_in(&self, error: Option<RemoteError>) {
        self.lock().sign_in_failure = error;
    }

    /// Number of document operations attempted (including failed ones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of sign-in attempts
    pub fn sign_ins(&self) -> usize {
        self.sign_ins.load(Ordering::SeqCst)
    }

    /// Insert a document with a fixed id, bypassing failure injection
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        let mut state = self.lock();
        let docs = state.collections.entry(collection.to_string()).or_default();
        docs.retain(|d| d.id != id);
        docs.push(Document {
            id: id.to_string(),
            fields,
        });
    }

    /// Read a document directly, bypassing failure injection
    pub fn get(&self, collection: &str, id: &str) -> Option<Fields> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .map(|d| d.fields.clone())
    }

    /// Number of documents in `collection`
    pub fn len(&self, collection: &str) -> usize {
        self.lock().collections.get(collection).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Count the call and return the injected failure, if any
    fn begin(&self) -> RemoteResult<MutexGuard<'_, State>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        match &state.failure {
            Some(error) => Err(error.clone()),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl RemoteBackend for MemoryBackend {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn sign_in_anonymously(&self) -> RemoteResult<()> {
        self.sign_ins.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.lock().sign_in_failure.clone() {
            return Err(error);
        }
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn list_documents(&self, collection: &str) -> RemoteResult<Vec<Document>> {
        let state = self.begin()?;
        Ok(state.collections.get(collection).cloned().unwrap_or_default())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> RemoteResult<String> {
        let mut state = self.begin()?;
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> RemoteResult<()> {
        let mut state = self.begin()?;
        let document = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| {
                RemoteError::new(
                    ErrorCode::NotFound,
                    format!("No document to update: {}/{}", collection, id),
                )
            })?;
        for (key, value) in fields {
            document.fields.insert(key, value);
        }
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> RemoteResult<()> {
        let mut state = self.begin()?;
        if let Some(docs) = state.collections.get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }
}

/// Connector handing out one shared `MemoryBackend`
pub struct MemoryConnector {
    backend: Arc<MemoryBackend>,
    connects: AtomicUsize,
    fail_connect: AtomicBool,
}

impl MemoryConnector {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        Self {
            backend,
            connects: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }

    /// Number of handles constructed
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make handle construction fail
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteConnector for MemoryConnector {
    async fn connect(&self, _config: &RemoteConfig) -> RemoteResult<Arc<dyn RemoteBackend>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(RemoteError::new(
                ErrorCode::InvalidArgument,
                "could not construct client",
            ));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.backend.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_add_list_update_delete() {
        let backend = MemoryBackend::new();

        let id = backend
            .add_document("articles", fields(json!({"title": "A"})))
            .await
            .unwrap();
        assert_eq!(id, "doc-1");

        backend
            .update_document("articles", &id, fields(json!({"status": "published"})))
            .await
            .unwrap();
        let docs = backend.list_documents("articles").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields["title"], json!("A"));
        assert_eq!(docs[0].fields["status"], json!("published"));

        backend.delete_document("articles", &id).await.unwrap();
        backend.delete_document("articles", "missing").await.unwrap();
        assert!(backend.is_empty("articles"));
        assert_eq!(backend.calls(), 5);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend
            .update_document("articles", "nope", Fields::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = MemoryBackend::new();
        backend.fail_with(Some(RemoteError::permission_denied()));
        assert!(backend.list_documents("articles").await.is_err());

        backend.fail_with(None);
        assert!(backend.list_documents("articles").await.is_ok());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_sign_in() {
        let backend = MemoryBackend::new();
        backend.fail_sign_in(Some(RemoteError::new(ErrorCode::Unauthenticated, "disabled")));
        assert!(backend.sign_in_anonymously().await.is_err());
        assert!(!backend.is_authenticated());

        backend.fail_sign_in(None);
        backend.sign_in_anonymously().await.unwrap();
        assert!(backend.is_authenticated());
        assert_eq!(backend.sign_ins(), 2);
    }
}
