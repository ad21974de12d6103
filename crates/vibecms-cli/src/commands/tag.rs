//! Tag command handlers

use std::collections::HashMap;

use anyhow::{Context, Result};

use vibecms_core::{Article, ArticleStore};

use crate::output::Output;

/// List all tags with usage counts
pub async fn list(store: &ArticleStore, output: &Output) -> Result<()> {
    let articles = store.list().await.context("Failed to list articles")?;
    output.print_tags(&tag_counts(&articles));
    Ok(())
}

/// Tags with the number of articles carrying them, most used first
fn tag_counts(articles: &[Article]) -> Vec<(String, i64)> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for tag in articles.iter().flat_map(|a| a.tags.iter()) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }

    let mut tags: Vec<(String, i64)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_counts() {
        let tagged = |tags: &[&str]| Article {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Article::default()
        };
        let articles = vec![tagged(&["rust", "web"]), tagged(&["rust"]), tagged(&["ai"])];

        assert_eq!(
            tag_counts(&articles),
            vec![
                ("rust".to_string(), 2),
                ("ai".to_string(), 1),
                ("web".to_string(), 1)
            ]
        );
        assert!(tag_counts(&[]).is_empty());
    }
}
