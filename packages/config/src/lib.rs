#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layered configuration.
//!
//! Values are resolved in three layers, later ones winning:
//!
//! 1. `config/default.toml`, embedded at compile time via [`include_str!`]
//! 2. an optional user TOML file (`--config` or `POSTCODE_MAP_CONFIG`),
//!    which may set any subset of keys
//! 3. environment variables:
//!
//! | Variable | Key |
//! |---|---|
//! | `BACKEND_URL` | `backend.base_url` |
//! | `BACKEND_TIMEOUT_SECS` | `backend.timeout_secs` |
//! | `HISTORY_CAPACITY` | `history.capacity` |
//! | `HISTORY_PATH` | `history.path` |
//! | `BIND_ADDR` | `server.bind_addr` |
//! | `PORT` | `server.port` |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Environment variable naming the user config file.
pub const CONFIG_PATH_VAR: &str = "POSTCODE_MAP_CONFIG";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has the wrong shape.
    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range or unparseable.
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Search history settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub path: PathBuf,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub history: HistoryConfig,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::embedded()
    }
}

impl AppConfig {
    /// The built-in defaults alone.
    ///
    /// # Panics
    ///
    /// Panics if the embedded default TOML is malformed (it is checked by
    /// the tests).
    #[must_use]
    pub fn embedded() -> Self {
        toml::de::from_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default.toml: {e}"))
    }

    /// Resolves all three layers from the real environment.
    ///
    /// `path` takes precedence over `POSTCODE_MAP_CONFIG`. Without either,
    /// no user file is read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the user file cannot be read or parsed,
    /// or any resulting value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(env_path);

        let user = match &path {
            Some(path) => {
                log::debug!("Reading config from {}", path.display());
                Some(
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        path: path.clone(),
                        source,
                    })?,
                )
            }
            None => None,
        };

        Self::resolve(user.as_deref(), |key| std::env::var(key).ok())
    }

    /// Resolves the layers from an optional user TOML string and an
    /// environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the user TOML does not parse, or any
    /// resulting value is invalid.
    pub fn resolve(
        user_toml: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut table: toml::Table = toml::de::from_str(DEFAULT_TOML)?;
        if let Some(user_toml) = user_toml {
            merge(&mut table, toml::de::from_str(user_toml)?);
        }

        let mut config: Self = toml::Value::Table(table).try_into()?;
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Backend request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = env("BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Some(secs) = env("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_var("BACKEND_TIMEOUT_SECS", &secs)?;
        }
        if let Some(capacity) = env("HISTORY_CAPACITY") {
            self.history.capacity = parse_var("HISTORY_CAPACITY", &capacity)?;
        }
        if let Some(path) = env("HISTORY_PATH") {
            self.history.path = PathBuf::from(path);
        }
        if let Some(addr) = env("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = env("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::Invalid {
            key: key.to_string(),
            message: message.to_string(),
        };

        if self.backend.base_url.trim().is_empty() {
            return Err(invalid("backend.base_url", "must not be empty"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(invalid("backend.timeout_secs", "must be at least 1"));
        }
        if self.history.capacity == 0 {
            return Err(invalid("history.capacity", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}

/// Recursively overlays `overlay` onto `base`. Tables merge; any other
/// value replaces.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge(existing, nested);
            }
            (Some(existing), value) => *existing = value,
            (None, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn embedded_defaults() {
        let config = AppConfig::embedded();
        assert_eq!(config.backend.base_url, "localhost:3000");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.history.capacity, 20);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(AppConfig::resolve(None, no_env).unwrap(), config);
    }

    #[test]
    fn user_file_overrides_only_what_it_sets() {
        let config = AppConfig::resolve(
            Some("[backend]\nbase_url = \"https://postcodes.example.org\"\n\n[server]\nport = 9000\n"),
            no_env,
        )
        .unwrap();

        assert_eq!(config.backend.base_url, "https://postcodes.example.org");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
    }

    #[test]
    fn environment_wins_over_file() {
        let config = AppConfig::resolve(
            Some("[history]\ncapacity = 5\n"),
            env(&[
                ("HISTORY_CAPACITY", "7"),
                ("HISTORY_PATH", "/tmp/h.json"),
                ("BACKEND_TIMEOUT_SECS", " 3 "),
                ("PORT", "1234"),
            ]),
        )
        .unwrap();

        assert_eq!(config.history.capacity, 7);
        assert_eq!(config.history.path, PathBuf::from("/tmp/h.json"));
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.server.port, 1234);
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("HISTORY_CAPACITY", "0"),
            ("HISTORY_CAPACITY", "lots"),
            ("BACKEND_TIMEOUT_SECS", "0"),
            ("PORT", "70000"),
            ("BACKEND_URL", "  "),
        ] {
            assert!(
                matches!(
                    AppConfig::resolve(None, env(&[(key, value)])),
                    Err(ConfigError::Invalid { .. })
                ),
                "accepted {key}={value}"
            );
        }
    }

    #[test]
    fn malformed_user_file_is_a_toml_error() {
        assert!(matches!(
            AppConfig::resolve(Some("[backend"), no_env),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            AppConfig::resolve(Some("[server]\nport = \"eighty\"\n"), no_env),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join(format!("{}.toml", uuid::Uuid::new_v4()));
        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let message = err.to_string();
        assert!(
            message.starts_with(&format!("Failed to read config file {}: ", path.display())),
            "{message}"
        );
    }

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[history]\npath = \"/var/tmp/history.json\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.history.path, PathBuf::from("/var/tmp/history.json"));
    }
}
