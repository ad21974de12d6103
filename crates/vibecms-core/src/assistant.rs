//! Drafting assistant
//!
//! Generates title ideas, whole drafts, polished rewrites and tags with a
//! hosted language model. Every operation except `draft_article` degrades
//! gracefully: a failed request yields a harmless fallback value and a
//! warning in the log, so the editor keeps working without an API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// Gemini REST base URL
pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 60;

/// Characters of content sent when suggesting tags
const TAG_SAMPLE_LEN: usize = 1000;

/// Tag returned when tag suggestion fails
pub const FALLBACK_TAG: &str = "general";

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("No assistant API key configured (set assistant_api_key or VIBECMS_ASSISTANT_API_KEY)")]
    MissingApiKey,

    #[error("Assistant request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Assistant returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Assistant returned no text")]
    Empty,

    #[error("Assistant returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type AssistantResult<T> = Result<T, AssistantError>;

/// Shape the model is asked to answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form text
    Text,
    /// A JSON array of strings
    StringList,
}

/// A text-generating model
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a response to `prompt`; an empty string means the model
    /// produced nothing
    async fn generate(&self, prompt: &str, format: ResponseFormat) -> AssistantResult<String>;
}

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> AssistantResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AssistantError::MissingApiKey);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .user_agent(concat!("vibecms/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key,
            model: model.into(),
        })
    }

    /// Build a client from the application config
    pub fn from_config(config: &Config) -> AssistantResult<Self> {
        let key = config
            .assistant_api_key
            .as_deref()
            .ok_or(AssistantError::MissingApiKey)?;
        Self::new(key, &config.assistant_model)
    }

    fn request_body(prompt: &str, format: ResponseFormat) -> Value {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if format == ResponseFormat::StringList {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": { "type": "ARRAY", "items": { "type": "STRING" } },
            });
        }
        body
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, format: ResponseFormat) -> AssistantResult<String> {
        let url = format!("{}/models/{}:generateContent", GEMINI_URL, self.model);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(prompt, format))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AssistantError::Http {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let body: GenerateResponse = response.json().await?;
        let text = body.text();
        debug!("Model {} returned {} chars", self.model, text.len());
        Ok(text)
    }
}

/// Article-writing helpers on top of a `TextGenerator`
pub struct Assistant<G> {
    generator: G,
}

impl<G: TextGenerator> Assistant<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Five title ideas for `topic`; empty on failure
    pub async fn title_ideas(&self, topic: &str) -> Vec<String> {
        let prompt = format!("Generate 5 creative blog post titles about: {}", topic);
        match self.string_list(&prompt).await {
            Ok(ideas) => ideas,
            Err(e) => {
                warn!("Title generation failed: {}", e);
                Vec::new()
            }
        }
    }

    /// A complete Markdown article about `topic`
    pub async fn draft_article(&self, topic: &str) -> AssistantResult<String> {
        let prompt = format!(
            "Write a comprehensive and engaging blog post about: \"{}\".\n\n\
             Structure requirements:\n\
             - Start with an engaging introduction.\n\
             - Use clear headings (Markdown format ## for main sections, ### for subsections).\n\
             - Include a conclusion.\n\
             - Use bullet points where appropriate.\n\n\
             Ensure the tone is professional but accessible. Write in the same language as the topic.",
            topic
        );
        let text = self.generator.generate(&prompt, ResponseFormat::Text).await?;
        if text.trim().is_empty() {
            return Err(AssistantError::Empty);
        }
        Ok(text)
    }

    /// A rewritten `content`; the original text on failure
    pub async fn polish(&self, content: &str) -> String {
        let prompt = format!(
            "Rewrite the following text to be more engaging, professional, and fix any \
             grammatical errors. Keep the HTML/Markdown formatting if present:\n\n{}",
            content
        );
        match self.generator.generate(&prompt, ResponseFormat::Text).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => content.to_string(),
            Err(e) => {
                warn!("Polishing failed: {}", e);
                content.to_string()
            }
        }
    }

    /// SEO tags for `content`; `["general"]` on failure
    pub async fn suggest_tags(&self, content: &str) -> Vec<String> {
        let sample: String = content.chars().take(TAG_SAMPLE_LEN).collect();
        let prompt = format!(
            "Analyze this content and generate 5 relevant SEO tags. \
             Return ONLY a JSON array of strings. Content: {}...",
            sample
        );
        match self.string_list(&prompt).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Tag suggestion failed: {}", e);
                vec![FALLBACK_TAG.to_string()]
            }
        }
    }

    async fn string_list(&self, prompt: &str) -> AssistantResult<Vec<String>> {
        let text = self
            .generator
            .generate(prompt, ResponseFormat::StringList)
            .await?;
        parse_string_list(&text)
    }
}

/// Parse a JSON string array, tolerating a Markdown code fence around it
fn parse_string_list(text: &str) -> AssistantResult<Vec<String>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let items: Vec<String> = serde_json::from_str(unfenced.trim())?;
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
