//! VibeCMS CLI
//!
//! Command-line interface for VibeCMS - write, tag and publish articles.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vibecms_core::{ArticleStatus, ArticleStore, Config, StorageError, StoreError};

mod commands;
mod editor;
mod output;

use commands::article::ArticleArgs;
use output::{Output, OutputFormat, StderrNotifier};

#[derive(Parser)]
#[command(name = "vibecms")]
#[command(about = "VibeCMS - Write, tag and publish articles")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List articles
    #[command(alias = "ls")]
    List {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Filter by status (draft, published)
        #[arg(short, long)]
        status: Option<ArticleStatus>,
    },
    /// Show an article
    Show {
        /// Article ID (full ID or prefix)
        id: String,
    },
    /// Create a new article
    #[command(alias = "add")]
    New {
        /// Article title (prompted for if not provided)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Article content (opens editor if not provided)
        #[arg(short, long)]
        content: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
        /// Publish immediately
        #[arg(long)]
        publish: bool,
    },
    /// Edit an article
    Edit {
        /// Article ID (full ID or prefix)
        id: String,
        /// New title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
        /// Replace tags
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// Publish an article
    Publish {
        /// Article ID (full ID or prefix)
        id: String,
    },
    /// Move an article back to draft
    Unpublish {
        /// Article ID (full ID or prefix)
        id: String,
    },
    /// Delete an article
    #[command(alias = "rm")]
    Delete {
        /// Article ID (full ID or prefix)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// List all tags
    Tags,
    /// Show storage mode and article counts
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Manage the remote database connection
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    /// AI drafting helpers
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file, assistant_api_key, assistant_model)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// Connect using a Firebase web config (JSON or JS object literal)
    Connect {
        /// File containing the config (reads stdin if not provided)
        file: Option<PathBuf>,
    },
    /// Show the saved remote configuration
    Show,
    /// Forget the saved configuration and use local storage
    Forget,
}

#[derive(Subcommand)]
enum AiCommands {
    /// Suggest titles for a topic
    Ideas {
        /// Topic to write about
        topic: String,
    },
    /// Generate a full article
    Draft {
        /// Topic to write about
        topic: String,
        /// Save the result as a new draft article
        #[arg(long)]
        save: bool,
    },
    /// Rewrite an article's content
    Polish {
        /// Article ID (full ID or prefix)
        id: String,
    },
    /// Add suggested tags to an article
    Tag {
        /// Article ID (full ID or prefix)
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Commands that don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let store = ArticleStore::open(&config).with_notifier(Arc::new(StderrNotifier));

    let result = match cli.command {
        Commands::Remote { command } => handle_remote_command(command, &store, &output).await,
        command => {
            if store.restore().await {
                debug!("Using remote database");
            }
            run(command, &store, &config, &output).await
        }
    };

    if let Err(e) = &result {
        if let Some(hint) = recovery_hint(e) {
            eprintln!("Hint: {}", hint);
        }
    }
    result
}

/// Suggestion attached to a local storage failure anywhere in the chain
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        if let Some(StoreError::Storage(storage)) = cause.downcast_ref::<StoreError>() {
            return storage.recovery_suggestion();
        }
        cause
            .downcast_ref::<StorageError>()
            .and_then(StorageError::recovery_suggestion)
    })
}

async fn run(command: Commands, store: &ArticleStore, config: &Config, output: &Output) -> Result<()> {
    match command {
        Commands::List { tag, status } => commands::article::list(store, tag, status, output).await,
        Commands::Show { id } => commands::article::show(store, id, output).await,
        Commands::New {
            title,
            content,
            tag,
            publish,
        } => {
            let args = ArticleArgs {
                title,
                content,
                tags: tag,
            };
            commands::article::create(store, args, publish, output).await
        }
        Commands::Edit {
            id,
            title,
            content,
            tag,
        } => {
            let args = ArticleArgs {
                title,
                content,
                tags: tag,
            };
            commands::article::edit(store, id, args, output).await
        }
        Commands::Publish { id } => {
            commands::article::set_status(store, id, ArticleStatus::Published, output).await
        }
        Commands::Unpublish { id } => {
            commands::article::set_status(store, id, ArticleStatus::Draft, output).await
        }
        Commands::Delete { id, force } => commands::article::delete(store, id, force, output).await,
        Commands::Tags => commands::tag::list(store, output).await,
        Commands::Status => commands::status::show(store, config, output).await,
        Commands::Ai { command } => handle_ai_command(command, store, config, output).await,
        Commands::Config { .. } | Commands::Remote { .. } => Ok(()), // Handled in main
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

async fn handle_remote_command(
    command: RemoteCommands,
    store: &ArticleStore,
    output: &Output,
) -> Result<()> {
    match command {
        RemoteCommands::Connect { file } => commands::remote::connect(store, file, output).await,
        RemoteCommands::Show => commands::remote::show(store, output),
        RemoteCommands::Forget => commands::remote::forget(store, output).await,
    }
}

async fn handle_ai_command(
    command: AiCommands,
    store: &ArticleStore,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        AiCommands::Ideas { topic } => commands::ai::ideas(config, topic, output).await,
        AiCommands::Draft { topic, save } => {
            commands::ai::draft(store, config, topic, save, output).await
        }
        AiCommands::Polish { id } => commands::ai::polish(store, config, id, output).await,
        AiCommands::Tag { id } => commands::ai::tag(store, config, id, output).await,
    }
}

/// Initialize logging
///
/// With --verbose, logs go to stderr at debug level. Otherwise they are
/// appended to the log file (config.log_file or {data_dir}/vibecms.log).
/// VIBECMS_LOG overrides the level in both cases.
fn init_logging(config: &Config, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let log_level = std::env::var("VIBECMS_LOG").unwrap_or_else(|_| default_level.to_string());
    let env_filter = EnvFilter::new(format!(
        "vibecms_core={},vibecms_cli={}",
        log_level, log_level
    ));

    if verbose {
        // Ignore error if already initialized
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    }

    let log_path = config.log_path();
    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
