//! Terminal interaction
//!
//! Article bodies are edited in the user's editor; short answers and
//! pasted configuration come from stdin.

use std::env;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};

/// Tried in order when neither $EDITOR nor $VISUAL is set
const FALLBACK_EDITORS: [&str; 4] = ["nano", "vim", "vi", "notepad"];

/// Edit `initial` in $EDITOR (or $VISUAL) and return the saved text
pub fn edit_text(initial: &str) -> Result<String> {
    let editor = editor_command().ok_or_else(|| {
        anyhow!("No editor found. Set $EDITOR, for example: export EDITOR=nano")
    })?;

    let mut scratch = tempfile::Builder::new()
        .prefix("vibecms-")
        .suffix(".md")
        .tempfile()
        .context("Failed to create a scratch file for editing")?;
    scratch.write_all(initial.as_bytes())?;
    scratch.flush()?;

    // The editor may be "code --wait" or similar
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(editor.as_str());
    let status = Command::new(program)
        .args(parts)
        .arg(scratch.path())
        .status()
        .with_context(|| format!("Failed to start editor '{}'", editor))?;
    if !status.success() {
        bail!("Editor '{}' exited with {}; nothing was saved", editor, status);
    }

    fs::read_to_string(scratch.path()).context("Failed to read back the edited text")
}

fn editor_command() -> Option<String> {
    ["EDITOR", "VISUAL"]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .or_else(|| {
            FALLBACK_EDITORS
                .iter()
                .find(|candidate| on_path(candidate))
                .map(|candidate| candidate.to_string())
        })
}

fn on_path(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn read_answer() -> Result<String> {
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Ask a yes/no question; anything but y/yes, or no terminal, is a no
pub fn confirm(question: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }
    print!("{} [y/N] ", question);
    let answer = read_answer()?.to_lowercase();
    Ok(matches!(answer.as_str(), "y" | "yes"))
}

/// Ask for a value showing the current one; `None` keeps it
pub fn prompt_with_default(label: &str, current: &str) -> Result<Option<String>> {
    if current.is_empty() {
        print!("{}: ", label);
    } else {
        print!("{} [{}]: ", label, current);
    }
    let answer = read_answer()?;
    Ok(Some(answer).filter(|a| !a.is_empty()))
}

/// Read all of stdin, printing `hint` first when a person is typing
pub fn read_stdin(hint: &str) -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        eprintln!("{}", hint);
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read from stdin")?;
    Ok(text)
}

/// Split a comma-separated tag list
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_path() {
        #[cfg(unix)]
        assert!(on_path("sh"));
        assert!(!on_path("vibecms_no_such_program_42"));
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("rust, cms ,,web"), vec!["rust", "cms", "web"]);
        assert!(parse_tags(" , ").is_empty());
    }
}
