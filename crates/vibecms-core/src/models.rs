//! Data models for VibeCMS
//!
//! Defines the persisted `Article`, its publication status, and the
//! `ArticleDraft` payload accepted by `ArticleStore::save`.
//!
//! Field names serialize in camelCase (`createdAt`, `updatedAt`) so the
//! local blob and the remote documents share one shape.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of content characters kept in a derived excerpt
pub const EXCERPT_LEN: usize = 150;

/// Title used when a remote document carries none
pub const UNTITLED: &str = "Untitled";

/// Publication status of an article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(ArticleStatus::Draft),
            "published" => Ok(ArticleStatus::Published),
            other => Err(format!(
                "Unknown status '{}'. Use 'draft' or 'published'.",
                other
            )),
        }
    }
}

/// A persisted article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Article {
    /// Backend-assigned identifier
    pub id: String,
    pub title: String,
    /// Markdown body
    pub content: String,
    /// Derived from content at save time
    pub excerpt: String,
    pub tags: Vec<String>,
    pub status: ArticleStatus,
    /// Milliseconds since epoch, set once on create
    pub created_at: i64,
    /// Milliseconds since epoch, refreshed on every save
    pub updated_at: i64,
}

impl Article {
    /// Rebuild an article from raw document fields
    ///
    /// Missing or mistyped fields fall back to defaults; timestamps fall
    /// back to `now`.
    pub fn from_fields(id: impl Into<String>, fields: &Map<String, Value>, now: i64) -> Self {
        let string_field = |key: &str, default: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let timestamp_field = |key: &str| fields.get(key).and_then(Value::as_i64).unwrap_or(now);

        let tags = match fields.get("tags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let status = fields
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            id: id.into(),
            title: string_field("title", UNTITLED),
            content: string_field("content", ""),
            excerpt: string_field("excerpt", ""),
            tags,
            status,
            created_at: timestamp_field("createdAt"),
            updated_at: timestamp_field("updatedAt"),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }

    /// Overlay cleaned fields onto this article, returning the merged record
    pub(crate) fn merged_with(&self, fields: &Map<String, Value>) -> serde_json::Result<Self> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(ref mut current) = value {
            for (key, field) in fields {
                current.insert(key.clone(), field.clone());
            }
        }
        serde_json::from_value(value)
    }
}

/// Save payload: `id` absent means create
///
/// Every `None` field is "not supplied" and never reaches a backend.
/// `excerpt` and the timestamps are owned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleDraft {
    pub id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ArticleStatus>,
}

impl ArticleDraft {
    /// A draft for a brand new article
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// An empty update for an existing article
    pub fn update(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_create(&self) -> bool {
        self.id.is_none()
    }

    /// Check required fields
    ///
    /// Creates need a non-empty title and content; updates may omit them
    /// but may not blank them.
    pub fn validate(&self) -> Result<(), String> {
        let check = |name: &str, value: &Option<String>| match value {
            Some(v) if v.trim().is_empty() => Err(format!("{} cannot be empty", name)),
            None if self.is_create() => Err(format!("{} is required", name)),
            _ => Ok(()),
        };
        check("Title", &self.title)?;
        check("Content", &self.content)?;
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err("Article id cannot be empty".to_string());
            }
        }
        Ok(())
    }

    /// Produce the backend payload: supplied fields, derived excerpt and
    /// `updatedAt`, never `id`
    pub fn to_fields(&self, now: i64) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(title) = &self.title {
            fields.insert("title".into(), Value::from(title.as_str()));
        }
        if let Some(content) = &self.content {
            fields.insert("content".into(), Value::from(content.as_str()));
            fields.insert("excerpt".into(), Value::from(excerpt(content)));
        }
        if let Some(tags) = &self.tags {
            fields.insert("tags".into(), Value::from(tags.clone()));
        }
        if let Some(status) = self.status {
            fields.insert("status".into(), Value::from(status.as_str()));
        }
        fields.insert("updatedAt".into(), Value::from(now));
        fields
    }
}

/// Derive an excerpt: the first `EXCERPT_LEN` characters plus an ellipsis
pub fn excerpt(content: &str) -> String {
    let mut out: String = content.chars().take(EXCERPT_LEN).collect();
    out.push_str("...");
    out
}

/// Union `incoming` tags into `existing`, keeping first-seen order
pub fn merge_tags(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + incoming.len());
    for tag in existing.iter().chain(incoming) {
        let tag = tag.trim();
        if !tag.is_empty() && !merged.iter().any(|t| t == tag) {
            merged.push(tag.to_string());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("draft".parse::<ArticleStatus>().unwrap(), ArticleStatus::Draft);
        assert_eq!(
            "Published".parse::<ArticleStatus>().unwrap(),
            ArticleStatus::Published
        );
        assert!("archived".parse::<ArticleStatus>().is_err());
        assert_eq!(ArticleStatus::Published.to_string(), "published");
        assert_eq!(ArticleStatus::default(), ArticleStatus::Draft);
    }

    #[test]
    fn test_article_serializes_camel_case() {
        let article = Article {
            id: "abc".into(),
            title: "T".into(),
            created_at: 1,
            updated_at: 2,
            ..Article::default()
        };
        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["createdAt"], 1);
        assert_eq!(value["updatedAt"], 2);
        assert_eq!(value["status"], "draft");
    }

    #[test]
    fn test_from_fields_applies_defaults() {
        let article = Article::from_fields("doc1", &Map::new(), 42);
        assert_eq!(article.id, "doc1");
        assert_eq!(article.title, UNTITLED);
        assert_eq!(article.content, "");
        assert_eq!(article.excerpt, "");
        assert!(article.tags.is_empty());
        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(article.created_at, 42);
        assert_eq!(article.updated_at, 42);
    }

    #[test]
    fn test_from_fields_ignores_non_array_tags() {
        let f = fields(json!({"title": "Hello", "tags": "rust", "status": "published", "updatedAt": 7}));
        let article = Article::from_fields("doc1", &f, 42);
        assert_eq!(article.title, "Hello");
        assert!(article.tags.is_empty());
        assert!(article.is_published());
        assert_eq!(article.updated_at, 7);
        assert_eq!(article.created_at, 42);
    }

    #[test]
    fn test_excerpt_truncates_on_chars() {
        assert_eq!(excerpt("short"), "short...");
        let long = "é".repeat(200);
        let ex = excerpt(&long);
        assert_eq!(ex.chars().count(), EXCERPT_LEN + 3);
        assert!(ex.ends_with("..."));
    }

    #[test]
    fn test_merge_tags_dedups_in_order() {
        let existing = vec!["rust".to_string(), "cli".to_string()];
        let incoming = vec!["cli".to_string(), " web ".to_string(), "rust".to_string()];
        assert_eq!(merge_tags(&existing, &incoming), vec!["rust", "cli", "web"]);
    }

    #[test]
    fn test_draft_fields_omit_unset_values() {
        let draft = ArticleDraft::update("x").with_title("New title");
        let f = draft.to_fields(99);
        assert_eq!(f.get("title"), Some(&json!("New title")));
        assert_eq!(f.get("updatedAt"), Some(&json!(99)));
        assert!(!f.contains_key("content"));
        assert!(!f.contains_key("excerpt"));
        assert!(!f.contains_key("tags"));
        assert!(!f.contains_key("status"));
        assert!(!f.contains_key("id"));
        assert!(f.values().all(|v| !v.is_null()));
    }

    #[test]
    fn test_draft_fields_derive_excerpt() {
        let f = ArticleDraft::new("A", "Body text").to_fields(1);
        assert_eq!(f.get("excerpt"), Some(&json!("Body text...")));
    }

    #[test]
    fn test_draft_validation() {
        assert!(ArticleDraft::new("A", "B").validate().is_ok());
        assert!(ArticleDraft::new("", "B").validate().is_err());
        assert!(ArticleDraft::new("A", "   ").validate().is_err());
        assert!(ArticleDraft::default().validate().is_err());
        assert!(ArticleDraft::update("id1").validate().is_ok());
        assert!(ArticleDraft::update("id1").with_title("").validate().is_err());
        assert!(ArticleDraft::update(" ").validate().is_err());
    }

    #[test]
    fn test_merged_with_overlays_fields() {
        let original = Article {
            id: "a".into(),
            title: "Old".into(),
            content: "Body".into(),
            created_at: 10,
            updated_at: 10,
            ..Article::default()
        };
        let merged = original
            .merged_with(&ArticleDraft::update("a").with_title("New").to_fields(20))
            .unwrap();
        assert_eq!(merged.title, "New");
        assert_eq!(merged.content, "Body");
        assert_eq!(merged.created_at, 10);
        assert_eq!(merged.updated_at, 20);
    }

    #[test]
    fn test_article_serialization() {
        let mut article = Article::from_fields("id", &Map::new(), 5);
        article.tags = vec!["a".into()];
        let json = serde_json::to_string(&article).unwrap();
        let deserialized: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(article, deserialized);
    }
}
