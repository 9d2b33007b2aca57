//! Configuration management for the relay.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the listen address, the embedded database location, LLM provider settings,
//! and the signing key ring for inbound request verification.

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for the relay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedded database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Inbound request signing keys.
    #[serde(default)]
    pub signing: SigningConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. "127.0.0.1:8080".
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Embedded database configuration.
///
/// With no path configured the relay runs against an in-memory database;
/// mutating statements then only live for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. `None` means in-memory.
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Creates a config for an in-memory database.
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Creates a config for a file-backed database.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns the sqlx connection URL for this database.
    pub fn connection_url(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite://{}?mode=rwc", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "openai" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini").
    #[serde(default = "default_model")]
    pub model: String,

    /// Override for the completions endpoint base URL (OpenAI-compatible).
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl LlmConfig {
    /// Resolves the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            RelayError::config(format!(
                "{} environment variable not set",
                self.api_key_env
            ))
        })
    }
}

/// Signing key configuration for inbound request verification.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SigningConfig {
    /// Key ring: signature key id -> shared secret.
    #[serde(default)]
    pub keys: HashMap<String, String>,

    /// Accept unsigned requests (development only).
    #[serde(default)]
    pub allow_unsigned: bool,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults so a bare `dbrelay` invocation
    /// works out of the box; a malformed file is a hard error.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("Cannot read config file {}: {e}", path.display()))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            RelayError::config(format!("Invalid config file {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Returns the default config file path.
    ///
    /// `~/.config/dbrelay/config.toml` on Linux, or the platform-appropriate
    /// config directory elsewhere.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("dbrelay")
            .join("config.toml")
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.llm.base_url {
            Url::parse(base_url).map_err(|e| {
                RelayError::config(format!("Invalid llm.base_url '{base_url}': {e}"))
            })?;
        }
        Ok(())
    }

    /// Applies environment variable overrides.
    ///
    /// `DBRELAY_LISTEN` and `DBRELAY_DATABASE` take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(listen) = std::env::var("DBRELAY_LISTEN") {
            self.server.listen = listen;
        }
        if let Ok(path) = std::env::var("DBRELAY_DATABASE") {
            self.database.path = Some(PathBuf::from(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.llm.provider, "openai");
        assert!(config.database.path.is_none());
        assert!(config.signing.keys.is_empty());
        assert!(!config.signing.allow_unsigned);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            listen = "0.0.0.0:9000"

            [database]
            path = "/var/lib/dbrelay/relay.db"

            [llm]
            provider = "openai"
            model = "gpt-4o"
            base_url = "https://llm.internal/v1/chat/completions"

            [signing]
            allow_unsigned = false

            [signing.keys]
            primary = "s3cret"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/var/lib/dbrelay/relay.db"))
        );
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.signing.keys.get("primary").unwrap(), "s3cret");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let toml = r#"
            [llm]
            base_url = "not a url"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_url_in_memory() {
        assert_eq!(
            DatabaseConfig::in_memory().connection_url(),
            "sqlite::memory:"
        );
    }

    #[test]
    fn test_connection_url_file() {
        let url = DatabaseConfig::file("/tmp/relay.db").connection_url();
        assert_eq!(url, "sqlite:///tmp/relay.db?mode=rwc");
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = Config::load_from_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
    }
}
