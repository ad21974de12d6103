//! Article command handlers

use anyhow::{bail, Context, Result};

use vibecms_core::{Article, ArticleDraft, ArticleStatus, ArticleStore};

use crate::editor::{confirm, edit_text, parse_tags, prompt_with_default};
use crate::output::{short_id, Output};

/// Fields supplied on the command line for `new` and `edit`
#[derive(Debug, Default)]
pub struct ArticleArgs {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Vec<String>,
}

impl ArticleArgs {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_empty()
    }
}

/// List articles, optionally filtered by tag and status
pub async fn list(
    store: &ArticleStore,
    tag: Option<String>,
    status: Option<ArticleStatus>,
    output: &Output,
) -> Result<()> {
    let articles = store.list().await.context("Failed to list articles")?;
    let articles = filter(articles, tag.as_deref(), status);
    output.print_articles(&articles);
    Ok(())
}

fn filter(articles: Vec<Article>, tag: Option<&str>, status: Option<ArticleStatus>) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| tag.map_or(true, |t| a.tags.iter().any(|x| x.eq_ignore_ascii_case(t))))
        .filter(|a| status.map_or(true, |s| a.status == s))
        .collect()
}

/// Show a single article
pub async fn show(store: &ArticleStore, id: String, output: &Output) -> Result<()> {
    let article = resolve(store, &id).await?;
    output.print_article(&article);
    Ok(())
}

/// Create an article
///
/// A missing title is prompted for; missing content opens the editor.
pub async fn create(
    store: &ArticleStore,
    args: ArticleArgs,
    publish: bool,
    output: &Output,
) -> Result<()> {
    let title = match args.title {
        Some(title) => title,
        None => prompt_with_default("Title", "")?.unwrap_or_default(),
    };
    let content = match args.content {
        Some(content) => content,
        None => edit_text("")?,
    };

    let status = if publish {
        ArticleStatus::Published
    } else {
        ArticleStatus::Draft
    };
    let mut draft = ArticleDraft::new(title, content).with_status(status);
    if !args.tags.is_empty() {
        draft = draft.with_tags(args.tags);
    }

    let article = store.save(&draft).await.context("Failed to create article")?;

    output.success(&format!("Created article: {}", article.id));
    output.print_article(&article);
    Ok(())
}

/// Edit an article
///
/// Only the fields given on the command line are written. With none given,
/// the title is prompted for and the content opens in the editor.
pub async fn edit(store: &ArticleStore, id: String, args: ArticleArgs, output: &Output) -> Result<()> {
    let article = resolve(store, &id).await?;

    let draft = if args.is_empty() {
        interactive_edit(&article)?
    } else {
        let mut draft = ArticleDraft::update(&article.id);
        draft.title = args.title;
        draft.content = args.content;
        if !args.tags.is_empty() {
            draft.tags = Some(args.tags);
        }
        draft
    };

    if draft.title.is_none() && draft.content.is_none() && draft.tags.is_none() {
        output.message("No changes.");
        return Ok(());
    }

    let updated = update(store, &draft).await?;

    output.success("Article updated");
    output.print_article(&updated);
    Ok(())
}

/// Save a partial update and read the article back
///
/// A remote save only reports the fields it wrote, so the full record is
/// fetched again before it is shown.
async fn update(store: &ArticleStore, draft: &ArticleDraft) -> Result<Article> {
    let saved = store.save(draft).await.context("Failed to update article")?;
    let reloaded = store
        .get(&saved.id)
        .await
        .context("Failed to reload article")?;
    Ok(reloaded.unwrap_or(saved))
}

fn interactive_edit(article: &Article) -> Result<ArticleDraft> {
    let mut draft = ArticleDraft::update(&article.id);

    println!("Editing article: {}", article.id);
    println!("Press Enter to keep current value, or type new value.\n");

    if let Some(title) = prompt_with_default("Title", &article.title)? {
        draft.title = Some(title);
    }

    let current_tags = article.tags.join(", ");
    if let Some(tags) = prompt_with_default("Tags (comma-separated)", &current_tags)? {
        draft.tags = Some(parse_tags(&tags));
    }

    let content = edit_text(&article.content)?;
    if content != article.content {
        draft.content = Some(content);
    }

    Ok(draft)
}

/// Set the publication status of an article
pub async fn set_status(
    store: &ArticleStore,
    id: String,
    status: ArticleStatus,
    output: &Output,
) -> Result<()> {
    let article = resolve(store, &id).await?;

    if article.status == status {
        output.message(&format!("Article is already {}.", status));
        return Ok(());
    }

    let updated = store
        .save(&ArticleDraft::update(&article.id).with_status(status))
        .await
        .context("Failed to update article")?;

    output.success(&format!("Article {} is now {}", short_id(&updated.id), status));
    Ok(())
}

/// Delete an article
pub async fn delete(store: &ArticleStore, id: String, force: bool, output: &Output) -> Result<()> {
    let article = resolve(store, &id).await?;

    if !force && output.should_prompt() {
        println!("Delete article: {} - {}", short_id(&article.id), article.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete(&article.id)
        .await
        .context("Failed to delete article")?;

    output.success(&format!("Deleted article: {}", article.id));
    Ok(())
}

/// Find an article by full id or unique prefix
pub async fn resolve(store: &ArticleStore, id: &str) -> Result<Article> {
    let articles = store.list().await.context("Failed to list articles")?;
    find_by_prefix(articles, id)
}

fn find_by_prefix(articles: Vec<Article>, id: &str) -> Result<Article> {
    if id.is_empty() {
        bail!("Article ID cannot be empty");
    }

    let mut matches: Vec<Article> = Vec::new();
    for article in articles {
        if article.id == id {
            return Ok(article);
        }
        if article.id.starts_with(id) {
            matches.push(article);
        }
    }

    match matches.len() {
        0 => bail!("No article found matching: {}", id),
        1 => Ok(matches.remove(0)),
        _ => {
            eprintln!("Multiple articles match '{}':", id);
            for article in &matches {
                eprintln!("  {} - {}", article.id, article.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vibecms_core::remote::{MemoryBackend, MemoryConnector};
    use vibecms_core::{MemoryKeyValueStore, RemoteConfig};

    fn article(id: &str, tags: &[&str], status: ArticleStatus) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Title {}", id),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            status,
            ..Article::default()
        }
    }

    fn sample() -> Vec<Article> {
        vec![
            article("abc123", &["Rust"], ArticleStatus::Published),
            article("abd456", &["web"], ArticleStatus::Draft),
            article("abc", &[], ArticleStatus::Draft),
        ]
    }

    #[test]
    fn test_find_exact_beats_prefix() {
        let found = find_by_prefix(sample(), "abc").unwrap();
        assert_eq!(found.id, "abc");
    }

    #[test]
    fn test_find_unique_prefix() {
        assert_eq!(find_by_prefix(sample(), "abd").unwrap().id, "abd456");
    }

    #[test]
    fn test_find_ambiguous_and_missing() {
        assert!(find_by_prefix(sample(), "ab").is_err());
        assert!(find_by_prefix(sample(), "zzz").is_err());
        assert!(find_by_prefix(sample(), "").is_err());
    }

    #[test]
    fn test_filter() {
        let by_tag = filter(sample(), Some("rust"), None);
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, "abc123");

        let drafts = filter(sample(), None, Some(ArticleStatus::Draft));
        assert_eq!(drafts.len(), 2);

        assert!(filter(sample(), Some("web"), Some(ArticleStatus::Published)).is_empty());
        assert_eq!(filter(sample(), None, None).len(), 3);
    }

    fn memory_store() -> ArticleStore {
        ArticleStore::new(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryConnector::new(Arc::new(MemoryBackend::new()))),
        )
    }

    #[tokio::test]
    async fn test_resolve_against_store() {
        let store = memory_store();
        let created = store.save(&ArticleDraft::new("Hello", "World")).await.unwrap();

        let found = resolve(&store, &created.id[..6]).await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_update_reports_full_remote_record() {
        let store = memory_store();
        assert!(store.initialize(&RemoteConfig::new("AIzaTestKey", "demo")).await);

        let created = store
            .save(&ArticleDraft::new("Real title", "Real body"))
            .await
            .unwrap();
        let draft = ArticleDraft::update(&created.id).with_tags(vec!["x".to_string()]);

        let updated = update(&store, &draft).await.unwrap();
        assert_eq!(updated.title, "Real title");
        assert_eq!(updated.content, "Real body");
        assert_eq!(updated.tags, vec!["x".to_string()]);
        assert_eq!(updated.created_at, created.created_at);
    }
}
