//! Output formatting for CLI
//!
//! Every command prints through `Output` so the three modes stay
//! consistent:
//! - human-readable text (default)
//! - pretty JSON on stdout (--json)
//! - bare ids or names, one per line (--quiet)
//!
//! Warnings and notices always go to stderr.

use chrono::DateTime;
use serde::Serialize;
use serde_json::json;

use vibecms_core::{Article, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Quiet,
}

impl OutputFormat {
    /// --quiet wins over --json
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        match (json, quiet) {
            (_, true) => OutputFormat::Quiet,
            (true, false) => OutputFormat::Json,
            (false, false) => OutputFormat::Human,
        }
    }
}

pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Route one value to the printer for the active mode
    fn emit<T: Serialize + ?Sized>(&self, value: &T, human: impl FnOnce(), quiet: impl FnOnce()) {
        match self.format {
            OutputFormat::Human => human(),
            OutputFormat::Json => print_json(value),
            OutputFormat::Quiet => quiet(),
        }
    }

    pub fn print_article(&self, article: &Article) {
        self.emit(
            article,
            || {
                println!("{}", article.title);
                println!("{}", "─".repeat(article.title.chars().count().clamp(8, 60)));
                println!("id       {}", article.id);
                println!("status   {}", article.status);
                if !article.tags.is_empty() {
                    println!("tags     {}", article.tags.join(", "));
                }
                println!("created  {}", format_millis(article.created_at));
                println!("updated  {}", format_millis(article.updated_at));
                println!();
                println!("{}", article.content);
            },
            || println!("{}", article.id),
        );
    }

    pub fn print_articles(&self, articles: &[Article]) {
        self.emit(
            articles,
            || {
                if articles.is_empty() {
                    println!("No articles yet.");
                    return;
                }
                for article in articles {
                    println!(
                        "{}  {:<9}  {}  {}",
                        short_id(&article.id),
                        article.status.as_str(),
                        format_millis(article.updated_at),
                        truncate(&article.title, 50)
                    );
                }
                println!("\n{} article(s)", articles.len());
            },
            || articles.iter().for_each(|a| println!("{}", a.id)),
        );
    }

    /// Tag names with usage counts
    pub fn print_tags(&self, tags: &[(String, i64)]) {
        let as_json: Vec<_> = tags
            .iter()
            .map(|(name, count)| json!({ "name": name, "count": count }))
            .collect();
        self.emit(
            &as_json,
            || {
                if tags.is_empty() {
                    println!("No tags yet.");
                    return;
                }
                let width = tags.iter().map(|(n, _)| n.chars().count()).max().unwrap_or(0);
                for (name, count) in tags {
                    println!("{:<width$}  {}", name, count, width = width);
                }
            },
            || tags.iter().for_each(|(name, _)| println!("{}", name)),
        );
    }

    /// A numbered list under a heading (title ideas, tags)
    pub fn print_lines(&self, heading: &str, lines: &[String]) {
        self.emit(
            lines,
            || {
                println!("{}", heading);
                for (i, line) in lines.iter().enumerate() {
                    println!("  {}. {}", i + 1, line);
                }
            },
            || lines.iter().for_each(|line| println!("{}", line)),
        );
    }

    pub fn success(&self, message: &str) {
        self.emit(
            &json!({ "status": "success", "message": message }),
            || println!("✓ {}", message),
            || {},
        );
    }

    pub fn message(&self, message: &str) {
        self.emit(&json!({ "message": message }), || println!("{}", message), || {});
    }

    /// Interactive prompts only make sense for human output
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }
}

/// Writes store notices to stderr, keeping stdout clean for --json
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!();
        message.lines().for_each(|line| eprintln!("⚠ {}", line));
        eprintln!();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// First 8 characters of an id
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}

/// Epoch milliseconds as a UTC "YYYY-MM-DD HH:MM"
pub fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
