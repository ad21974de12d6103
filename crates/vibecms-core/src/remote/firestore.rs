//! Cloud Firestore backend
//!
//! Talks to the Firestore REST API with reqwest. Anonymous sign-in goes
//! through the Identity Toolkit `accounts:signUp` endpoint; the returned
//! ID token is sent as a bearer token on every document request, so
//! security rules requiring `request.auth != null` pass.
//!
//! With a session store attached, the refresh token is kept under
//! `SESSION_KEY` and the next process resumes that user through the
//! secure token endpoint instead of creating another anonymous account.
//!
//! Endpoints can be pointed at the local emulator suite with
//! `FirestoreConnector::with_endpoints`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::value::{decode_fields, encode_fields, field_path};
use super::{
    Document, ErrorCode, Fields, RemoteBackend, RemoteConfig, RemoteConnector, RemoteError,
    RemoteResult,
};
use crate::storage::KeyValueStore;

/// Identity Toolkit base URL
pub const AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Secure token service base URL, used to resume saved sessions
pub const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Firestore REST base URL
pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 30;

/// Documents fetched per list page
const PAGE_SIZE: u32 = 300;

/// Local key holding the anonymous session
pub const SESSION_KEY: &str = "auth_session";

/// Builds `FirestoreBackend` handles
#[derive(Clone)]
pub struct FirestoreConnector {
    auth_url: String,
    token_url: String,
    firestore_url: String,
    sessions: Option<Arc<dyn KeyValueStore>>,
}

impl Default for FirestoreConnector {
    fn default() -> Self {
        Self {
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            firestore_url: FIRESTORE_URL.to_string(),
            sessions: None,
        }
    }
}

impl FirestoreConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use alternative endpoints (e.g. the emulator suite)
    pub fn with_endpoints(mut self, auth_url: &str, token_url: &str, firestore_url: &str) -> Self {
        self.auth_url = auth_url.trim_end_matches('/').to_string();
        self.token_url = token_url.trim_end_matches('/').to_string();
        self.firestore_url = firestore_url.trim_end_matches('/').to_string();
        self
    }

    /// Keep anonymous sessions in `store` so later runs reuse the same user
    pub fn with_session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.sessions = Some(store);
        self
    }
}

#[async_trait]
impl RemoteConnector for FirestoreConnector {
    async fn connect(&self, config: &RemoteConfig) -> RemoteResult<Arc<dyn RemoteBackend>> {
        if config.project_id.trim().is_empty() {
            return Err(RemoteError::new(
                ErrorCode::InvalidArgument,
                "projectId is required to reach the document database",
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .user_agent(concat!("vibecms/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::new(ErrorCode::Internal, e.to_string()))?;

        info!("Connected document database client for project {}", config.project_id);

        Ok(Arc::new(FirestoreBackend {
            http,
            api_key: config.api_key.clone(),
            auth_url: self.auth_url.clone(),
            token_url: self.token_url.clone(),
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                self.firestore_url, config.project_id
            ),
            id_token: Mutex::new(None),
            session: self
                .sessions
                .clone()
                .map(|store| SessionCache::new(store, config)),
        }))
    }
}

/// Refresh token saved between runs
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct SavedSession {
    project_id: String,
    api_key: String,
    refresh_token: String,
}

/// The saved session for one project and API key
///
/// Storage failures are logged and otherwise ignored; the worst case is a
/// fresh anonymous sign-in.
struct SessionCache {
    store: Arc<dyn KeyValueStore>,
    project_id: String,
    api_key: String,
}

impl SessionCache {
    fn new(store: Arc<dyn KeyValueStore>, config: &RemoteConfig) -> Self {
        Self {
            store,
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Refresh token saved for this project, if any
    fn load(&self) -> Option<String> {
        let text = match self.store.get(SESSION_KEY) {
            Ok(text) => text?,
            Err(e) => {
                warn!("Could not read saved session: {}", e);
                return None;
            }
        };
        let saved: SavedSession = match serde_json::from_str(&text) {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Ignoring unreadable saved session: {}", e);
                return None;
            }
        };
        (saved.project_id == self.project_id && saved.api_key == self.api_key)
            .then_some(saved.refresh_token)
            .filter(|token| !token.is_empty())
    }

    fn save(&self, refresh_token: &str) {
        if refresh_token.is_empty() {
            return;
        }
        let saved = SavedSession {
            project_id: self.project_id.clone(),
            api_key: self.api_key.clone(),
            refresh_token: refresh_token.to_string(),
        };
        let result = serde_json::to_string(&saved)
            .map_err(|e| e.to_string())
            .and_then(|text| self.store.set(SESSION_KEY, &text).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("Could not save session: {}", e);
        }
    }
}

/// Firestore REST client bound to one project
pub struct FirestoreBackend {
    http: Client,
    api_key: String,
    auth_url: String,
    token_url: String,
    /// `.../projects/{p}/databases/(default)/documents`
    documents_url: String,
    id_token: Mutex<Option<String>>,
    session: Option<SessionCache>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    local_id: String,
}

/// Secure token service reply; unlike Identity Toolkit it uses snake_case
#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RawDocument {
    fn into_document(self) -> Document {
        let id = self.name.rsplit('/').next().unwrap_or_default().to_string();
        Document {
            id,
            fields: decode_fields(&self.fields),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

impl FirestoreBackend {
    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }

    fn token(&self) -> Option<String> {
        self.id_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Install a fresh ID token and remember the refresh token
    fn signed_in(&self, id_token: String, refresh_token: &str) {
        *self
            .id_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(id_token);
        if let Some(session) = &self.session {
            session.save(refresh_token);
        }
    }

    /// Exchange a saved refresh token for an ID token
    async fn resume(&self, refresh_token: &str) -> RemoteResult<()> {
        let url = format!("{}/token", self.token_url);
        let request = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)]);

        let response = self.send(request).await?;
        let body: TokenResponse = Self::read_json(response).await?;

        debug!("Resumed anonymous session for {}", body.user_id);
        self.signed_in(body.id_token, &body.refresh_token);
        Ok(())
    }

    /// Attach the API key and, once signed in, the bearer token
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("key", self.api_key.as_str())]);
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request, turning transport failures and error statuses into
    /// `RemoteError`
    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(parse_error(status.as_u16(), &body))
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> RemoteResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::new(ErrorCode::Unknown, format!("Malformed response: {}", e)))
    }
}

#[async_trait]
impl RemoteBackend for FirestoreBackend {
    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    async fn sign_in_anonymously(&self) -> RemoteResult<()> {
        if let Some(refresh_token) = self.session.as_ref().and_then(SessionCache::load) {
            match self.resume(&refresh_token).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Saved session could not be resumed, signing in again: {}", e),
            }
        }

        let url = format!("{}/accounts:signUp", self.auth_url);
        let request = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "returnSecureToken": true }));

        let response = self.send(request).await?;
        let body: SignUpResponse = Self::read_json(response).await?;

        debug!("Signed in anonymously as {}", body.local_id);
        self.signed_in(body.id_token, &body.refresh_token);
        Ok(())
    }

    async fn list_documents(&self, collection: &str) -> RemoteResult<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.collection_url(collection))
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = self.send(self.authorize(request)).await?;
            let page: ListResponse = Self::read_json(response).await?;
            documents.extend(page.documents.into_iter().map(RawDocument::into_document));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Fetched {} documents from {}", documents.len(), collection);
        Ok(documents)
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> RemoteResult<String> {
        let request = self
            .http
            .post(self.collection_url(collection))
            .json(&json!({ "fields": encode_fields(&fields) }));

        let response = self.send(self.authorize(request)).await?;
        let created: RawDocument = Self::read_json(response).await?;
        let document = created.into_document();

        debug!("Created document {}/{}", collection, document.id);
        Ok(document.id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> RemoteResult<()> {
        let mut request = self
            .http
            .patch(self.document_url(collection, id))
            .query(&[("currentDocument.exists", "true")]);
        for name in fields.keys() {
            request = request.query(&[("updateMask.fieldPaths", field_path(name))]);
        }
        let request = request.json(&json!({ "fields": encode_fields(&fields) }));

        self.send(self.authorize(request)).await?;
        debug!("Updated document {}/{}", collection, id);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> RemoteResult<()> {
        let request = self.http.delete(self.document_url(collection, id));
        self.send(self.authorize(request)).await?;
        debug!("Deleted document {}/{}", collection, id);
        Ok(())
    }
}

/// Network-level failures mean the service could not be reached
fn transport_error(error: reqwest::Error) -> RemoteError {
    RemoteError::unavailable(format!("Could not reach the document database: {}", error))
}

/// Map an error response to a `RemoteError`
///
/// Prefers the canonical `status` in the body and falls back to the HTTP
/// status code.
fn parse_error(http_status: u16, body: &str) -> RemoteError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = envelope
                .error
                .status
                .as_deref()
                .and_then(ErrorCode::from_status)
                .unwrap_or_else(|| ErrorCode::from_http(http_status));
            RemoteError::new(code, envelope.error.message)
        }
        Err(_) => RemoteError::new(
            ErrorCode::from_http(http_status),
            format!("HTTP {}: {}", http_status, body.trim()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;

    #[test]
    fn test_parse_permission_error() {
        let body = r#"{"error": {"code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED"}}"#;
        let err = parse_error(403, body);
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(err.is_fallback_trigger());
    }

    #[test]
    fn test_parse_not_found_error() {
        let body = r#"{"error": {"code": 404, "message": "No document to update: projects/p/databases/(default)/documents/articles/x", "status": "NOT_FOUND"}}"#;
        let err = parse_error(404, body);
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(!err.is_fallback_trigger());
    }

    #[test]
    fn test_parse_unstructured_error_uses_http_status() {
        let err = parse_error(503, "Service Unavailable");
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert!(err.message.contains("Service Unavailable"));
    }

    #[test]
    fn test_raw_document_id_from_name() {
        let raw: RawDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/articles/abc123",
            "fields": {"title": {"stringValue": "Hi"}},
            "createTime": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let doc = raw.into_document();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.fields["title"], json!("Hi"));
    }

    #[test]
    fn test_empty_list_response() {
        let page: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_connect_requires_project_id() {
        let connector = FirestoreConnector::new();
        let result = connector.connect(&RemoteConfig::new("key", "")).await;
        assert_eq!(result.err().map(|e| e.code), Some(ErrorCode::InvalidArgument));
    }

    #[tokio::test]
    async fn test_connect_builds_unauthenticated_handle() {
        let connector = FirestoreConnector::new().with_endpoints(
            "http://localhost:9099/identitytoolkit.googleapis.com/v1",
            "http://localhost:9099/securetoken.googleapis.com/v1",
            "http://localhost:8080/v1",
        );
        let backend = connector.connect(&RemoteConfig::new("key", "demo")).await.unwrap();
        assert!(!backend.is_authenticated());
    }

    #[test]
    fn test_session_saved_and_loaded_per_project() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let demo = SessionCache::new(store.clone(), &RemoteConfig::new("key", "demo"));
        assert!(demo.load().is_none());

        demo.save("refresh-1");
        assert_eq!(demo.load().as_deref(), Some("refresh-1"));

        // Another project or key never picks up this session
        let other = SessionCache::new(store.clone(), &RemoteConfig::new("key", "other"));
        assert!(other.load().is_none());
        let rotated = SessionCache::new(store.clone(), &RemoteConfig::new("key2", "demo"));
        assert!(rotated.load().is_none());

        // An empty token does not replace the saved one
        demo.save("");
        assert_eq!(demo.load().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_unreadable_session_is_ignored() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        store.set(SESSION_KEY, "{not json").unwrap();

        let cache = SessionCache::new(store, &RemoteConfig::new("key", "demo"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_token_response_is_snake_case() {
        let body: TokenResponse = serde_json::from_value(json!({
            "id_token": "id",
            "refresh_token": "refresh",
            "user_id": "u1",
            "expires_in": "3600"
        }))
        .unwrap();
        assert_eq!(body.id_token, "id");
        assert_eq!(body.refresh_token, "refresh");
        assert_eq!(body.user_id, "u1");
    }
}
