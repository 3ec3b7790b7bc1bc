//! Configuration management for classbot.
//!
//! Loads configuration from ${CLASSBOT_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token for the Telegram API.
    pub bot_token: Option<String>,
    /// Allowlist of numeric Telegram user IDs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowlist_user_ids: Vec<i64>,
}

/// Google credential storage locations. Unset fields fall back to the
/// defaults under the classbot home directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Path to the saved user credential (token.json).
    pub token_path: Option<PathBuf>,
    /// Path to the OAuth client registration (credentials.json).
    pub client_secrets_path: Option<PathBuf>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telegram bot configuration.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Google credential storage overrides.
    #[serde(default)]
    pub google: GoogleConfig,
}

impl Config {
    /// Loads the configuration from ${CLASSBOT_HOME}/config.toml.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("failed to read {}: {err}", path.display())))?;

        toml::from_str(&contents)
            .map_err(|err| Error::Config(format!("failed to parse {}: {err}", path.display())))
    }

    /// Resolves the credential storage locations, applying defaults for
    /// anything the config file leaves unset.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            token_path: self
                .google
                .token_path
                .clone()
                .unwrap_or_else(paths::token_path),
            client_secrets_path: self
                .google
                .client_secrets_path
                .clone()
                .unwrap_or_else(paths::client_secrets_path),
        }
    }
}

/// Storage locations used by the credential provider. Passed in explicitly so
/// nothing depends on the process working directory.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Saved user credential, overwritten after each successful grant.
    pub token_path: PathBuf,
    /// Externally provisioned OAuth client registration, read-only.
    pub client_secrets_path: PathBuf,
}

pub mod paths {
    //! Path resolution for classbot configuration and data.
    //!
    //! CLASSBOT_HOME resolution order:
    //! 1. CLASSBOT_HOME environment variable (if set)
    //! 2. ~/.config/classbot (default)

    use std::path::PathBuf;

    /// Returns the classbot home directory.
    pub fn classbot_home() -> PathBuf {
        if let Ok(home) = std::env::var("CLASSBOT_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("classbot"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        classbot_home().join("config.toml")
    }

    /// Saved user credential produced by a successful consent flow.
    pub fn token_path() -> PathBuf {
        classbot_home().join("token.json")
    }

    /// Externally provisioned OAuth client registration.
    pub fn client_secrets_path() -> PathBuf {
        classbot_home().join("credentials.json")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::Config;

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"
            allowlist_user_ids = [42, 7]

            [google]
            token_path = "/var/lib/classbot/token.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.allowlist_user_ids, vec![42, 7]);
        assert_eq!(
            config.google.token_path,
            Some(PathBuf::from("/var/lib/classbot/token.json"))
        );
        assert_eq!(config.google.client_secrets_path, None);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.telegram.bot_token.is_none());
        assert!(config.telegram.allowlist_user_ids.is_empty());
    }

    #[test]
    fn auth_config_prefers_explicit_paths() {
        let config = Config {
            google: super::GoogleConfig {
                token_path: Some(PathBuf::from("/tmp/t.json")),
                client_secrets_path: None,
            },
            ..Config::default()
        };

        let auth = config.auth_config();
        assert_eq!(auth.token_path, PathBuf::from("/tmp/t.json"));
        assert!(auth.client_secrets_path.ends_with("credentials.json"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.telegram.bot_token.is_none());
    }
}
