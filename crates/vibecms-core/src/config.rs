//! Application configuration
//!
//! Settings come from defaults, then the TOML config file, then
//! `VIBECMS_*` environment variables, each layer overriding the last.
//!
//! The remote database configuration is not part of this file; it is
//! pasted in by the user and kept by the `ArticleStore` in local storage.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "VIBECMS";

/// Model used for drafting when none is configured
pub const DEFAULT_ASSISTANT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local article storage and the log file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log file path; defaults to `<data_dir>/vibecms.log`
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// API key for the drafting assistant
    #[serde(default)]
    pub assistant_api_key: Option<String>,

    /// Model name for the drafting assistant
    #[serde(default = "default_assistant_model")]
    pub assistant_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_file: None,
            assistant_api_key: None,
            assistant_model: default_assistant_model(),
        }
    }
}

impl Config {
    /// Load from the default file, then apply `VIBECMS_*` overrides
    ///
    /// The file is `~/.config/vibecms/config.toml` unless `VIBECMS_CONFIG`
    /// names another one. A missing file means defaults.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Like `load`, but an explicit `--config` path wins
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load `path` (defaults if absent), apply overrides, create `data_dir`
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("Invalid config file {:?}", path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot read config file {:?}", path))
            }
        };

        config.apply_env_overrides();
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Cannot create data directory {:?}", config.data_dir))?;
        Ok(config)
    }

    /// Parse TOML text and apply overrides, touching no files
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(toml_content).context("Invalid config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_override("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        // An empty value clears the optional settings
        if let Some(file) = env_override("LOG_FILE") {
            self.log_file = Some(PathBuf::from(file)).filter(|p| !p.as_os_str().is_empty());
        }
        if let Some(key) = env_override("ASSISTANT_API_KEY") {
            self.assistant_api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(model) = env_override("ASSISTANT_MODEL").filter(|m| !m.is_empty()) {
            self.assistant_model = model;
        }
    }

    /// Write to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Write to `config_path` as TOML, creating parent directories
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create config directory {:?}", parent))?;
        }
        let text = toml::to_string_pretty(self).context("Cannot serialize config")?;
        std::fs::write(config_path, text)
            .with_context(|| format!("Cannot write config file {:?}", config_path))
    }

    /// `VIBECMS_CONFIG`, or `<config dir>/vibecms/config.toml`
    pub fn config_file_path() -> PathBuf {
        env_override("CONFIG").map(PathBuf::from).unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vibecms")
                .join("config.toml")
        })
    }

    /// Where log output goes when not logging to stderr
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("vibecms.log"))
    }
}

/// Value of `VIBECMS_<name>`, if set
fn env_override(name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vibecms")
}

fn default_assistant_model() -> String {
    DEFAULT_ASSISTANT_MODEL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            // Clear all the vars
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "VIBECMS_DATA_DIR",
        "VIBECMS_LOG_FILE",
        "VIBECMS_ASSISTANT_API_KEY",
        "VIBECMS_ASSISTANT_MODEL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data_dir.ends_with("vibecms"));
        assert!(config.log_file.is_none());
        assert!(config.assistant_api_key.is_none());
        assert_eq!(config.assistant_model, DEFAULT_ASSISTANT_MODEL);
    }

    #[test]
    fn test_log_path() {
        let mut config = Config {
            data_dir: PathBuf::from("/data/vibecms"),
            ..Config::default()
        };
        assert_eq!(config.log_path(), PathBuf::from("/data/vibecms/vibecms.log"));

        config.log_file = Some(PathBuf::from("/var/log/vibecms.log"));
        assert_eq!(config.log_path(), PathBuf::from("/var/log/vibecms.log"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("VIBECMS_DATA_DIR", "/tmp/vibecms-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/vibecms-test"));
    }

    #[test]
    fn test_env_override_assistant_key() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("VIBECMS_ASSISTANT_API_KEY", "secret");
        config.apply_env_overrides();
        assert_eq!(config.assistant_api_key, Some("secret".to_string()));

        // Empty string clears it
        env::set_var("VIBECMS_ASSISTANT_API_KEY", "");
        config.apply_env_overrides();
        assert!(config.assistant_api_key.is_none());
    }

    #[test]
    fn test_env_override_model_ignores_empty() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("VIBECMS_ASSISTANT_MODEL", "gemini-pro");
        config.apply_env_overrides();
        assert_eq!(config.assistant_model, "gemini-pro");

        env::set_var("VIBECMS_ASSISTANT_MODEL", "");
        config.apply_env_overrides();
        assert_eq!(config.assistant_model, "gemini-pro");
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            log_file = "/custom/vibecms.log"
            assistant_api_key = "k"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.log_file, Some(PathBuf::from("/custom/vibecms.log")));
        assert_eq!(config.assistant_api_key, Some("k".to_string()));
        assert_eq!(config.assistant_model, DEFAULT_ASSISTANT_MODEL);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp = TempDir::new().unwrap();
        env::set_var("VIBECMS_DATA_DIR", temp.path().join("data"));

        let config = Config::load_from_path(&temp.path().join("missing.toml")).unwrap();
        // Defaults apply, and the data dir is created
        assert!(config.assistant_api_key.is_none());
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp.path().join("data"),
            log_file: None,
            assistant_api_key: Some("k".to_string()),
            assistant_model: "gemini-pro".to_string(),
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }
}
