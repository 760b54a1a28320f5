//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "SCROLLBACK_API_KEY";

/// Default streaming chat path, relative to the base URL
pub const DEFAULT_CHAT_PATH: &str = "chat-messages";

/// Configuration for scrollback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL, e.g. `https://api.dify.ai/v1`
    pub base_url: Option<String>,
    /// App API key (alternative to the environment variable)
    pub api_key: Option<String>,
    /// End-user identifier sent with every request
    pub user: Option<String>,
    /// Conversation to open
    pub conversation_id: Option<String>,
    /// Exchanges fetched per page
    pub page_limit: Option<u32>,
    /// Introduction shown above the oldest history
    pub opening_statement: Option<String>,
    /// Streaming chat path
    pub chat_path: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scrollback")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SCROLLBACK_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// API key from config, falling back to the environment
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
    }

    pub fn chat_path(&self) -> &str {
        self.chat_path.as_deref().unwrap_or(DEFAULT_CHAT_PATH)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# scrollback configuration file
# Place at ~/.config/scrollback/config.toml (Linux/Mac) or %APPDATA%\scrollback\config.toml (Windows)

# Backend base URL
base_url = "https://api.dify.ai/v1"

# App API key (optional - SCROLLBACK_API_KEY is preferred)
# api_key = "app-..."

# End-user identifier (a random one is generated when unset)
# user = "alice"

# Conversation to open (leave unset to start a new one)
# conversation_id = "..."

# Exchanges fetched per page
page_limit = 10

# Introduction shown once the oldest history is reached (optional)
# opening_statement = "Hi! How can I help?"

# Streaming chat path, relative to base_url
chat_path = "chat-messages"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(example_config()).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://api.dify.ai/v1"));
        assert_eq!(config.page_limit, Some(10));
        assert_eq!(config.chat_path(), DEFAULT_CHAT_PATH);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_missing_fields_default() {
        let config = Config::parse("user = \"alice\"").unwrap();
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert_eq!(config.base_url, None);
        assert_eq!(config.opening_statement, None);
    }

    #[test]
    fn test_configured_api_key_wins() {
        let config = Config {
            api_key: Some("app-config".into()),
            ..Config::default()
        };
        assert_eq!(config.api_key().as_deref(), Some("app-config"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config {
            base_url: Some("http://localhost/v1".into()),
            conversation_id: Some("c1".into()),
            page_limit: Some(20),
            ..Config::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }
}
