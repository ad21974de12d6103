//! AI drafting command handlers

use anyhow::{Context, Result};

use vibecms_core::models::merge_tags;
use vibecms_core::{Assistant, ArticleDraft, ArticleStore, Config, GeminiClient};

use super::article::resolve;
use crate::output::{short_id, Output};

fn assistant(config: &Config) -> Result<Assistant<GeminiClient>> {
    let client = GeminiClient::from_config(config).context("Assistant is not available")?;
    Ok(Assistant::new(client))
}

/// Suggest titles for a topic
pub async fn ideas(config: &Config, topic: String, output: &Output) -> Result<()> {
    let ideas = assistant(config)?.title_ideas(&topic).await;
    if ideas.is_empty() {
        output.message("No ideas generated. Check the assistant API key.");
        return Ok(());
    }
    output.print_lines(&format!("Ideas for \"{}\":", topic), &ideas);
    Ok(())
}

/// Write a full draft about a topic, optionally saving it as a new article
pub async fn draft(
    store: &ArticleStore,
    config: &Config,
    topic: String,
    save: bool,
    output: &Output,
) -> Result<()> {
    let content = assistant(config)?
        .draft_article(&topic)
        .await
        .context("Failed to generate article")?;

    if !save {
        println!("{}", content);
        return Ok(());
    }

    let article = store
        .save(&ArticleDraft::new(topic, content))
        .await
        .context("Failed to save generated article")?;
    output.success(&format!("Saved draft: {}", article.id));
    output.print_article(&article);
    Ok(())
}

/// Rewrite an article's content
pub async fn polish(store: &ArticleStore, config: &Config, id: String, output: &Output) -> Result<()> {
    let article = resolve(store, &id).await?;
    let polished = assistant(config)?.polish(&article.content).await;

    if polished == article.content {
        output.message("Content unchanged.");
        return Ok(());
    }

    store
        .save(&ArticleDraft::update(&article.id).with_content(polished))
        .await
        .context("Failed to save polished content")?;
    output.success(&format!("Polished article {}", short_id(&article.id)));
    Ok(())
}

/// Add suggested tags to an article
pub async fn tag(store: &ArticleStore, config: &Config, id: String, output: &Output) -> Result<()> {
    let article = resolve(store, &id).await?;
    let suggested = assistant(config)?.suggest_tags(&article.content).await;
    let merged = merge_tags(&article.tags, &suggested);

    if merged == article.tags {
        output.message("No new tags.");
        return Ok(());
    }

    store
        .save(&ArticleDraft::update(&article.id).with_tags(merged.clone()))
        .await
        .context("Failed to save tags")?;
    output.print_lines(&format!("Tags for {}:", short_id(&article.id)), &merged);
    Ok(())
}
