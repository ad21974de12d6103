//! Local article collection
//!
//! The whole collection lives under a single key as one JSON array,
//! newest-first by insertion. Reads fail closed: a blob that no longer
//! parses is treated as an empty collection, and the first write after
//! that copies the unreadable text to `<key>.corrupt` before replacing it.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{StorageError, StorageResult};
use super::kv::KeyValueStore;
use crate::models::{Article, ArticleDraft};

/// Key holding the serialized article collection
pub const ARTICLES_KEY: &str = "articles";

/// Local article persistence over a key-value store
#[derive(Clone)]
pub struct LocalArticles {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl LocalArticles {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            key: ARTICLES_KEY.to_string(),
        }
    }

    fn backup_key(&self) -> String {
        format!("{}.corrupt", self.key)
    }

    /// Read the stored collection as-is
    pub fn list(&self) -> StorageResult<Vec<Article>> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Create or update an article from `draft`
    ///
    /// An update whose id is not stored falls through to create, and the
    /// record gets a freshly minted id.
    pub fn save(&self, draft: &ArticleDraft, now: i64) -> StorageResult<Article> {
        let mut articles = self.load_for_write()?;
        let fields = draft.to_fields(now);

        if let Some(id) = &draft.id {
            if let Some(existing) = articles.iter_mut().find(|a| &a.id == id) {
                let merged = existing
                    .merged_with(&fields)
                    .map_err(|source| StorageError::Encode {
                        key: self.key.clone(),
                        source,
                    })?;
                *existing = merged.clone();
                self.store(&articles)?;
                debug!("Updated local article {}", id);
                return Ok(merged);
            }
            warn!("Article {} not found locally, saving as a new article", id);
        }

        let mut article = Article::default()
            .merged_with(&fields)
            .map_err(|source| StorageError::Encode {
                key: self.key.clone(),
                source,
            })?;
        article.id = mint_id();
        article.created_at = now;

        articles.insert(0, article.clone());
        self.store(&articles)?;
        debug!("Created local article {}", article.id);
        Ok(article)
    }

    /// Remove any article with `id`; absent ids are a no-op
    pub fn delete(&self, id: &str) -> StorageResult<()> {
        let Some(articles) = self.load_for_write_if_present()? else {
            return Ok(());
        };
        let before = articles.len();
        let remaining: Vec<Article> = articles.into_iter().filter(|a| a.id != id).collect();
        if remaining.len() != before {
            debug!("Deleted local article {}", id);
        }
        self.store(&remaining)
    }

    /// Parse the stored collection; `None` when the key is absent
    fn load(&self) -> StorageResult<Option<Vec<Article>>> {
        let Some(raw) = self.kv.get(&self.key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(articles) => Ok(Some(articles)),
            Err(e) => {
                warn!("Stored article collection is corrupted ({}); reading as empty", e);
                Ok(Some(Vec::new()))
            }
        }
    }

    fn load_for_write(&self) -> StorageResult<Vec<Article>> {
        Ok(self.load_for_write_if_present()?.unwrap_or_default())
    }

    /// Like `load`, but preserves a corrupt blob before it gets replaced
    fn load_for_write_if_present(&self) -> StorageResult<Option<Vec<Article>>> {
        let Some(raw) = self.kv.get(&self.key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(articles) => Ok(Some(articles)),
            Err(e) => {
                let backup = self.backup_key();
                warn!(
                    "Stored article collection is corrupted ({}); backing it up to '{}'",
                    e, backup
                );
                self.kv.set(&backup, &raw)?;
                Ok(Some(Vec::new()))
            }
        }
    }

    fn store(&self, articles: &[Article]) -> StorageResult<()> {
        let json = serde_json::to_string(articles).map_err(|source| StorageError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.kv.set(&self.key, &json)
    }
}

/// Mint an opaque local id
fn mint_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleStatus;
    use crate::storage::kv::MemoryKeyValueStore;

    fn local() -> (Arc<MemoryKeyValueStore>, LocalArticles) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let articles = LocalArticles::new(kv.clone());
        (kv, articles)
    }

    #[test]
    fn test_list_empty_when_absent() {
        let (_, local) = local();
        assert!(local.list().unwrap().is_empty());
    }

    #[test]
    fn test_create_prepends() {
        let (_, local) = local();
        let first = local.save(&ArticleDraft::new("First", "one"), 100).unwrap();
        let second = local.save(&ArticleDraft::new("Second", "two"), 200).unwrap();

        let all = local.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_create_sets_timestamps_and_excerpt() {
        let (_, local) = local();
        let article = local.save(&ArticleDraft::new("A", "B"), 1234).unwrap();

        assert!(!article.id.is_empty());
        assert_eq!(article.created_at, 1234);
        assert_eq!(article.updated_at, 1234);
        assert_eq!(article.excerpt, "B...");
        assert_eq!(article.status, ArticleStatus::Draft);
    }

    #[test]
    fn test_update_merges_in_place() {
        let (_, local) = local();
        let article = local
            .save(
                &ArticleDraft::new("A", "B").with_tags(vec!["x".into()]),
                100,
            )
            .unwrap();

        let updated = local
            .save(
                &ArticleDraft::update(&article.id).with_status(ArticleStatus::Published),
                500,
            )
            .unwrap();

        assert_eq!(updated.id, article.id);
        assert_eq!(updated.title, "A");
        assert_eq!(updated.tags, vec!["x"]);
        assert_eq!(updated.status, ArticleStatus::Published);
        assert_eq!(updated.created_at, 100);
        assert_eq!(updated.updated_at, 500);
        assert_eq!(local.list().unwrap(), vec![updated]);
    }

    #[test]
    fn test_update_unknown_id_creates_with_new_id() {
        let (_, local) = local();
        let saved = local.save(&ArticleDraft::new("A", "B"), 10).unwrap();
        let orphan = ArticleDraft {
            id: Some("missing".into()),
            ..ArticleDraft::new("Orphan", "text")
        };
        let created = local.save(&orphan, 20).unwrap();

        assert_ne!(created.id, "missing");
        assert_eq!(created.created_at, 20);
        let all = local.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, created.id);
        assert_eq!(all[1].id, saved.id);
    }

    #[test]
    fn test_delete() {
        let (_, local) = local();
        let a = local.save(&ArticleDraft::new("A", "a"), 1).unwrap();
        let b = local.save(&ArticleDraft::new("B", "b"), 2).unwrap();

        local.delete(&a.id).unwrap();
        assert_eq!(local.list().unwrap(), vec![b.clone()]);

        local.delete("not-there").unwrap();
        assert_eq!(local.list().unwrap(), vec![b]);
    }

    #[test]
    fn test_delete_without_collection_writes_nothing() {
        let (kv, local) = local();
        local.delete("anything").unwrap();
        assert!(kv.get(ARTICLES_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_blob_fails_closed_and_is_backed_up() {
        let (kv, local) = local();
        kv.set(ARTICLES_KEY, "{not json").unwrap();

        assert!(local.list().unwrap().is_empty());
        assert!(kv.get("articles.corrupt").unwrap().is_none());

        let article = local.save(&ArticleDraft::new("A", "B"), 1).unwrap();
        assert_eq!(
            kv.get("articles.corrupt").unwrap().as_deref(),
            Some("{not json")
        );
        assert_eq!(local.list().unwrap(), vec![article]);
    }

    #[test]
    fn test_write_failure_propagates() {
        let (kv, local) = local();
        kv.set_fail_writes(true);
        assert!(local.save(&ArticleDraft::new("A", "B"), 1).is_err());
    }
}
