//! Configuration management for tubecost.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::calculator::DivisorPolicy;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "tubecost";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "production.db";

/// Default address the HTTP server binds to.
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default endpoint of the hosted database API.
const DEFAULT_HOSTED_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TUBECOST_`, nested keys split on `__`)
/// 2. TOML config file at `~/.config/tubecost/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Which tube count each cost category is spread over.
    pub costing: DivisorPolicy,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

/// Which storage engine holds the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// A local `SQLite` file.
    #[default]
    Embedded,
    /// A hosted serverless `SQLite` database reached over HTTP.
    Hosted,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded"),
            Self::Hosted => write!(f, "hosted"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage engine to use.
    pub backend: Backend,
    /// Path to the embedded database file.
    /// Defaults to `~/.local/share/tubecost/production.db`
    pub database_path: Option<PathBuf>,
    /// Hosted database settings, used when `backend = "hosted"`.
    pub hosted: HostedConfig,
}

/// Hosted database settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedConfig {
    /// Base URL of the hosted database API.
    pub base_url: String,
    /// Account that owns the database.
    #[serde(deserialize_with = "string_or_number")]
    pub account_id: String,
    /// Database identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub database_id: String,
    /// API token sent as a bearer credential.
    #[serde(skip_serializing, deserialize_with = "optional_string_or_number")]
    pub api_token: Option<String>,
}

/// Identifier that may arrive as a number.
///
/// Environment values such as `TUBECOST_STORAGE__HOSTED__ACCOUNT_ID=1234`
/// reach serde as integers, not strings.
struct StringOrNumber(String);

impl<'de> Deserialize<'de> for StringOrNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct Visitor;

        impl de::Visitor<'_> for Visitor {
            type Value = StringOrNumber;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a string or a number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_i128<E: de::Error>(self, v: i128) -> std::result::Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> std::result::Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(|v| v.0)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(|v| v.0))
}

impl std::fmt::Debug for HostedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedConfig")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("database_id", &self.database_id)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HOSTED_BASE_URL.to_string(),
            account_id: String::new(),
            database_id: String::new(),
            api_token: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `TUBECOST_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TUBECOST_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(Error::config_validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            )));
        }

        if self.storage.backend == Backend::Hosted {
            let hosted = &self.storage.hosted;
            if hosted.base_url.trim().is_empty() {
                return Err(Error::config_validation(
                    "storage.hosted.base_url is required for the hosted backend",
                ));
            }
            if hosted.account_id.trim().is_empty() {
                return Err(Error::config_validation(
                    "storage.hosted.account_id is required for the hosted backend",
                ));
            }
            if hosted.database_id.trim().is_empty() {
                return Err(Error::config_validation(
                    "storage.hosted.database_id is required for the hosted backend",
                ));
            }
            if hosted.api_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
                return Err(Error::config_validation(
                    "storage.hosted.api_token is required for the hosted backend",
                ));
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the server bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.parse().map_err(|_| {
            Error::config_validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            ))
        })
    }
}
