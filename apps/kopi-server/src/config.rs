//! # Server Configuration
//!
//! Settings for the café server, loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ServerConfig::load()                               │
//! │                                                                         │
//! │  1. Defaults (this file)                                                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  2. kopi.toml  ◄── $KOPI_CONFIG, else the platform config dir          │
//! │        │           (Linux: ~/.config/kopi-pos/kopi.toml)                │
//! │        ▼                                                                │
//! │  3. KOPI_* environment variables                                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  4. validate()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example `kopi.toml`
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/kopi/kopi.db"
//!
//! [store]
//! name = "Kopi Corner"
//!
//! [kitchen]
//! urgent_after_minutes = 15
//!
//! [security]
//! service_key = "change-me"
//! ```
//!
//! Configuration is read-only after startup and shared through `AppState`.

use std::path::PathBuf;
use std::time::Duration;

use kopi_core::status::DEFAULT_URGENT_AFTER_MINUTES;
use kopi_db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[server]`: where the HTTP listener binds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl HttpSettings {
    /// Returns the full bind address (e.g., "0.0.0.0:8080").
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// `[database]`: SQLite file and pool size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./kopi.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// `[store]`: what receipts and the menu header show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "Kopi POS".to_string()
}

fn default_currency_symbol() -> String {
    "RM".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

/// `[kitchen]`: kitchen display and tracking page behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitchenSettings {
    /// Orders waiting longer than this are highlighted.
    #[serde(default = "default_urgent_after")]
    pub urgent_after_minutes: i64,

    /// Refresh interval for screens that cannot hold a socket open.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_urgent_after() -> i64 {
    DEFAULT_URGENT_AFTER_MINUTES
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for KitchenSettings {
    fn default() -> Self {
        KitchenSettings {
            urgent_after_minutes: default_urgent_after(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// `[security]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecuritySettings {
    /// Shared secret for the staff account routes (`x-service-key`).
    /// Those routes are disabled while this is unset.
    #[serde(default)]
    pub service_key: Option<String>,
}

// =============================================================================
// Server Config
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub kitchen: KitchenSettings,

    #[serde(default)]
    pub security: SecuritySettings,
}

impl ServerConfig {
    /// Loads defaults, then the config file, then environment overrides.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading server config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be greater than 0".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.kitchen.urgent_after_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "kitchen.urgent_after_minutes must be greater than 0".into(),
            ));
        }
        if self.kitchen.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "kitchen.poll_interval_secs must be greater than 0".into(),
            ));
        }
        if let Some(key) = &self.security.service_key {
            if key.trim().len() < 8 {
                return Err(ConfigError::Invalid(
                    "security.service_key must be at least 8 characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Applies `KOPI_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("KOPI_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("KOPI_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid KOPI_PORT"),
            }
        }

        if let Some(path) = lookup("KOPI_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("KOPI_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring invalid KOPI_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(name) = lookup("KOPI_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(minutes) = lookup("KOPI_URGENT_AFTER_MINUTES") {
            match minutes.parse::<i64>() {
                Ok(m) => self.kitchen.urgent_after_minutes = m,
                Err(_) => warn!(value = %minutes, "Ignoring invalid KOPI_URGENT_AFTER_MINUTES"),
            }
        }

        if let Some(secs) = lookup("KOPI_POLL_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.kitchen.poll_interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid KOPI_POLL_INTERVAL_SECS"),
            }
        }

        if let Some(key) = lookup("KOPI_SERVICE_KEY") {
            self.security.service_key = Some(key);
        }
    }

    /// `$KOPI_CONFIG`, else `kopi.toml` in the platform config directory.
    fn default_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("KOPI_CONFIG") {
            return Some(PathBuf::from(path));
        }
        directories::ProjectDirs::from("com", "kopi", "pos").map(|dirs| dirs.config_dir().join("kopi.toml"))
    }

    /// Pool settings for [`kopi_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.kitchen.urgent_after_minutes, 15);
        assert_eq!(config.kitchen.poll_interval_secs, 30);
        assert!(config.security.service_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [kitchen]
            urgent_after_minutes = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.kitchen.urgent_after_minutes, 10);
        assert_eq!(config.kitchen.poll_interval_secs, 30);
        assert_eq!(config.store.currency_symbol, "RM");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("KOPI_PORT", "3000"),
            ("KOPI_DB_PATH", "/tmp/kopi-test.db"),
            ("KOPI_SERVICE_KEY", "s3cret-service-key"),
            ("KOPI_URGENT_AFTER_MINUTES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, PathBuf::from("/tmp/kopi-test.db"));
        assert_eq!(config.security.service_key.as_deref(), Some("s3cret-service-key"));
        // invalid values are ignored
        assert_eq!(config.kitchen.urgent_after_minutes, 15);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        config.kitchen.urgent_after_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.security.service_key = Some("short".to_string());
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }
}
