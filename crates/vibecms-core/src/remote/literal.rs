//! Object-literal to JSON normalization
//!
//! Configuration snippets are usually copied from a web console, where
//! they look like:
//!
//! ```text
//! const firebaseConfig = {
//!   apiKey: "AIza...",
//!   projectId: 'demo',   // trailing comments
//! };
//! ```
//!
//! `to_json` rewrites such text into strict JSON without evaluating it.
//! Bare keys get quoted, single-quoted and backtick strings become
//! double-quoted, comments and trailing commas are dropped, and anything
//! outside the outermost braces is ignored.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("no object literal found")]
    NoObject,
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("unterminated comment starting at offset {0}")]
    UnterminatedComment(usize),
    #[error("unsupported value '{0}' (only literal values are allowed)")]
    UnsupportedValue(String),
    #[error("template interpolation is not supported")]
    Interpolation,
}

/// Rewrite an object literal into JSON text
pub fn to_json(text: &str) -> Result<String, LiteralError> {
    let start = text.find('{').ok_or(LiteralError::NoObject)?;
    let end = text.rfind('}').ok_or(LiteralError::NoObject)?;
    if end < start {
        return Err(LiteralError::NoObject);
    }

    let chars: Vec<char> = text[start..=end].chars().collect();
    let mut out = String::with_capacity(chars.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' if matches!(chars.get(i + 1), Some('/') | Some('*')) => {
                i = skip_comment(&chars, i)?;
            }
            '"' => {
                let close = find_closing(&chars, i, '"')?;
                out.extend(&chars[i..=close]);
                i = close + 1;
            }
            '\'' | '`' => {
                let close = find_closing(&chars, i, c)?;
                out.push('"');
                push_requoted(&mut out, &chars[i + 1..close], c)?;
                out.push('"');
                i = close + 1;
            }
            ',' => {
                let next = skip_insignificant(&chars, i + 1)?;
                if !matches!(chars.get(next), Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            // exponent of a number literal, e.g. 1e5
            c if is_ident_start(c) && out.ends_with(|p: char| p.is_ascii_digit() || p == '.') => {
                out.push(c);
                i += 1;
            }
            c if is_ident_start(c) => {
                let mut j = i;
                while j < chars.len() && is_ident_continue(chars[j]) {
                    j += 1;
                }
                let ident: String = chars[i..j].iter().collect();
                let next = skip_insignificant(&chars, j)?;
                if chars.get(next) == Some(&':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else if matches!(ident.as_str(), "true" | "false" | "null") {
                    out.push_str(&ident);
                } else {
                    return Err(LiteralError::UnsupportedValue(ident));
                }
                i = j;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Index of the unescaped `quote` closing the string opened at `open`
fn find_closing(chars: &[char], open: usize, quote: char) -> Result<usize, LiteralError> {
    let mut j = open + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            c if c == quote => return Ok(j),
            _ => j += 1,
        }
    }
    Err(LiteralError::UnterminatedString(open))
}

/// Copy a single-quoted or backtick string body as a JSON string body
fn push_requoted(out: &mut String, body: &[char], quote: char) -> Result<(), LiteralError> {
    let mut k = 0;
    while k < body.len() {
        match body[k] {
            '\\' if body.get(k + 1) == Some(&quote) => {
                out.push(quote);
                k += 2;
            }
            '\\' => {
                out.push('\\');
                if let Some(&next) = body.get(k + 1) {
                    out.push(next);
                }
                k += 2;
            }
            '$' if quote == '`' && body.get(k + 1) == Some(&'{') => {
                return Err(LiteralError::Interpolation);
            }
            '"' => {
                out.push_str("\\\"");
                k += 1;
            }
            '\n' => {
                out.push_str("\\n");
                k += 1;
            }
            c => {
                out.push(c);
                k += 1;
            }
        }
    }
    Ok(())
}

/// Skip a `//` or `/* */` comment starting at `i`
fn skip_comment(chars: &[char], i: usize) -> Result<usize, LiteralError> {
    if chars.get(i + 1) == Some(&'/') {
        let mut j = i + 2;
        while j < chars.len() && chars[j] != '\n' {
            j += 1;
        }
        Ok(j)
    } else {
        let mut j = i + 2;
        while j + 1 < chars.len() {
            if chars[j] == '*' && chars[j + 1] == '/' {
                return Ok(j + 2);
            }
            j += 1;
        }
        Err(LiteralError::UnterminatedComment(i))
    }
}

/// Skip whitespace and comments
fn skip_insignificant(chars: &[char], mut i: usize) -> Result<usize, LiteralError> {
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
        } else if chars[i] == '/' && matches!(chars.get(i + 1), Some('/') | Some('*')) {
            i = skip_comment(chars, i)?;
        } else {
            break;
        }
    }
    Ok(i)
}
