//! Layered configuration for Sensei.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use sensei_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The default platform API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.sensei-learn.example";

/// The default per-window chat request ceiling.
pub const DEFAULT_CHAT_RATE_LIMIT: u32 = 10;

/// The default timeout for the request phase of a network call, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resolved configuration for a Sensei client.
#[derive(Debug, Clone)]
pub struct SenseiConfig {
    pub token: String,
    pub base_url: String,
    pub chat_rate_limit: u32,
    pub request_timeout_secs: u64,
    /// Where durable client state (rate-limit records) lives.
    pub state_dir: PathBuf,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitSettings {
    pub chat_rate_limit: Option<u32>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

impl SenseiConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Config file (~/.sensei/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = load_settings_file(&config_dir.join("config.toml"));

        // Resolve bearer token: CLI > env > config file
        let token = overrides
            .token
            .or_else(|| std::env::var("SENSEI_TOKEN").ok())
            .or(settings.api.token)
            .ok_or_else(|| ConfigError::MissingKey {
                key: "token (set SENSEI_TOKEN or add to ~/.sensei/config.toml)".into(),
            })?;

        let base_url = overrides
            .base_url
            .or_else(|| std::env::var("SENSEI_BASE_URL").ok())
            .or(settings.api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let chat_rate_limit = settings
            .limits
            .chat_rate_limit
            .unwrap_or(DEFAULT_CHAT_RATE_LIMIT);
        if chat_rate_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limits.chat_rate_limit".into(),
                message: "must be greater than zero".into(),
            });
        }

        let request_timeout_secs = settings
            .api
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "api.request_timeout_secs".into(),
                message: "must be greater than zero".into(),
            });
        }

        Ok(SenseiConfig {
            token,
            base_url,
            chat_rate_limit,
            request_timeout_secs,
            state_dir: config_dir.join("state"),
            config_dir,
        })
    }
}

/// Get the Sensei config directory path (~/.sensei/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SENSEI_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sensei")
}

/// Load and parse a TOML settings file, returning defaults on any error.
fn load_settings_file(path: &std::path::Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = SettingsFile::default();
        assert!(settings.api.token.is_none());
        assert!(settings.api.base_url.is_none());
        assert!(settings.limits.chat_rate_limit.is_none());
    }

    #[test]
    fn settings_toml_parse() {
        let toml_str = r#"
[api]
base_url = "https://staging.sensei-learn.example"
request_timeout_secs = 10

[limits]
chat_rate_limit = 5
"#;
        let settings: SettingsFile = toml::from_str(toml_str).unwrap();
        assert_eq!(
            settings.api.base_url.as_deref(),
            Some("https://staging.sensei-learn.example")
        );
        assert_eq!(settings.api.request_timeout_secs, Some(10));
        assert_eq!(settings.limits.chat_rate_limit, Some(5));
    }

    #[test]
    fn settings_missing_sections_default() {
        let settings: SettingsFile = toml::from_str("[api]\ntoken = \"t\"\n").unwrap();
        assert_eq!(settings.api.token.as_deref(), Some("t"));
        assert!(settings.limits.chat_rate_limit.is_none());
    }
}
