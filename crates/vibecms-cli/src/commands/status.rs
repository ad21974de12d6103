//! Status command handler

use anyhow::{Context, Result};

use vibecms_core::{ArticleStore, Config};

use crate::output::{Output, OutputFormat};

/// Show storage mode and article counts
pub async fn show(store: &ArticleStore, config: &Config, output: &Output) -> Result<()> {
    // Listing first so a fallback during the call is reflected in the mode
    let articles = store.list().await.context("Failed to list articles")?;
    let mode = store.mode();
    let remote = store.saved_remote_config().ok().flatten();

    let total = articles.len();
    let published = articles.iter().filter(|a| a.is_published()).count();
    let drafts = total - published;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "mode": mode.as_str(),
                    "project_id": remote.as_ref().map(|r| r.project_id.clone()),
                    "data_dir": config.data_dir,
                    "counts": {
                        "total": total,
                        "published": published,
                        "draft": drafts
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", mode);
        }
        OutputFormat::Human => {
            println!("VibeCMS Status");
            println!("==============");
            println!();
            println!("Storage:");
            println!("  Mode:     {}", mode);
            match &remote {
                Some(remote) => println!("  Project:  {}", remote.project_id),
                None => println!("  Project:  (not configured)"),
            }
            println!("  Location: {}", config.data_dir.display());
            println!();
            println!("Articles:");
            println!("  Total:     {}", total);
            println!("  Published: {}", published);
            println!("  Drafts:    {}", drafts);
        }
    }

    Ok(())
}
