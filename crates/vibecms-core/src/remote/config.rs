//! Remote connection configuration
//!
//! Accepted either as strict JSON or as a loosely-quoted object literal
//! (see `literal`). Both forms parse to the same `RemoteConfig`, and
//! `to_json` always renders it the same way so the persisted copy is
//! deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::literal;

/// Errors from reading a remote configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Could not parse configuration: {0}")]
    Format(String),

    #[error("Missing apiKey")]
    MissingApiKey,
}

/// Connection bundle for the remote database
///
/// Only `api_key` is validated here; the other identifiers are consumed
/// by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    /// Any other keys (e.g. `measurementId`), kept sorted
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RemoteConfig {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Parse strict JSON, falling back to object-literal syntax
    ///
    /// Does not check for `apiKey`; see `validate`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str(text) {
            Ok(config) => Ok(config),
            Err(strict_err) => {
                let json = literal::to_json(text).map_err(|e| {
                    ConfigError::Format(format!("not JSON ({}) and not an object literal ({})", strict_err, e))
                })?;
                serde_json::from_str(&json).map_err(|e| ConfigError::Format(e.to_string()))
            }
        }
    }

    /// Parse and require a non-empty `apiKey`
    pub fn parse_validated(text: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    /// Strict JSON rendering used for persistence
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Pretty rendering for display
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// API key with all but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let count = self.api_key.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.api_key.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRICT: &str = r#"{
        "apiKey": "AIzaSyExample",
        "authDomain": "demo.firebaseapp.com",
        "projectId": "demo",
        "storageBucket": "demo.appspot.com",
        "messagingSenderId": "1234",
        "appId": "1:1234:web:abcd",
        "measurementId": "G-XYZ"
    }"#;

    const LOOSE: &str = r#"const firebaseConfig = {
        apiKey: 'AIzaSyExample',
        authDomain: "demo.firebaseapp.com",
        projectId: "demo",
        storageBucket: "demo.appspot.com",
        messagingSenderId: "1234",
        appId: "1:1234:web:abcd",
        measurementId: "G-XYZ", // analytics
    };"#;

    #[test]
    fn test_parse_strict() {
        let config = RemoteConfig::parse(STRICT).unwrap();
        assert_eq!(config.api_key, "AIzaSyExample");
        assert_eq!(config.project_id, "demo");
        assert_eq!(config.extra.get("measurementId"), Some(&Value::from("G-XYZ")));
    }

    #[test]
    fn test_loose_and_strict_render_identically() {
        let strict = RemoteConfig::parse(STRICT).unwrap();
        let loose = RemoteConfig::parse(LOOSE).unwrap();
        assert_eq!(strict, loose);
        assert_eq!(strict.to_json(), loose.to_json());
    }

    #[test]
    fn test_to_json_roundtrips() {
        let config = RemoteConfig::parse(LOOSE).unwrap();
        let reparsed = RemoteConfig::parse(&config.to_json()).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn test_missing_api_key() {
        let config = RemoteConfig::parse(r#"{"projectId": "demo"}"#).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));
        assert_eq!(
            RemoteConfig::parse_validated("{ apiKey: '' }"),
            Err(ConfigError::MissingApiKey)
        );
    }

    #[test]
    fn test_garbage_is_format_error() {
        assert!(matches!(
            RemoteConfig::parse("not a config"),
            Err(ConfigError::Format(_))
        ));
        assert!(matches!(
            RemoteConfig::parse("{ apiKey: window.key }"),
            Err(ConfigError::Format(_))
        ));
    }

    #[test]
    fn test_masked_api_key() {
        assert_eq!(RemoteConfig::new("abcdefgh", "p").masked_api_key(), "****efgh");
        assert_eq!(RemoteConfig::new("abc", "p").masked_api_key(), "***");
    }
}
