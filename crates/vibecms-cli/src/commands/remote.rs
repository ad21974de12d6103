//! Remote database command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use vibecms_core::ArticleStore;

use crate::editor::read_stdin;
use crate::output::{Output, OutputFormat};

/// Connect to a remote database from pasted configuration
///
/// Accepts the JSON or JavaScript object literal shown in the Firebase
/// console, read from `file` or stdin.
pub async fn connect(store: &ArticleStore, file: Option<PathBuf>, output: &Output) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?,
        None => read_stdin("Paste your Firebase config, then press Ctrl-D:")?,
    };

    if !store
        .configure(&text)
        .await
        .context("Could not use this configuration")?
    {
        bail!("Could not connect to the remote database. Still using local storage.");
    }

    let project = store
        .saved_remote_config()?
        .map(|c| c.project_id)
        .unwrap_or_default();
    output.success(&format!("Connected to remote database (project {})", project));
    Ok(())
}

/// Show the saved remote configuration
pub fn show(store: &ArticleStore, output: &Output) -> Result<()> {
    let Some(config) = store.saved_remote_config()? else {
        output.message("No remote database configured. Using local storage.");
        return Ok(());
    };

    match output.format {
        OutputFormat::Json => {
            let mut masked = config.clone();
            masked.api_key = config.masked_api_key();
            println!("{}", masked.to_json_pretty());
        }
        OutputFormat::Quiet => {
            println!("{}", config.project_id);
        }
        OutputFormat::Human => {
            println!("Remote database:");
            println!("  projectId:  {}", config.project_id);
            println!("  authDomain: {}", display(&config.auth_domain));
            println!("  appId:      {}", display(&config.app_id));
            println!("  apiKey:     {}", config.masked_api_key());
        }
    }
    Ok(())
}

/// Forget the saved remote configuration
pub async fn forget(store: &ArticleStore, output: &Output) -> Result<()> {
    store
        .forget_remote()
        .await
        .context("Failed to remove remote configuration")?;
    output.success("Remote configuration removed. Using local storage.");
    Ok(())
}

fn display(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
