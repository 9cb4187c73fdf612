//! Server configuration module.
//!
//! Configuration is loaded from `KHATA_*` environment variables with fallback
//! to defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use khata_db::{DbConfig, EngineConfig};

/// Khata server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub database_path: String,

    /// Connection pool size
    pub max_connections: u32,

    /// Deadline for each engine operation
    pub operation_timeout: Duration,

    /// Whether deleting an invoice also removes its charge from the ledger
    pub reconcile_on_delete: bool,

    /// Store name printed on receipts
    pub store_name: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment, map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = ServerConfig {
            bind_addr: read("KHATA_BIND_ADDR", "127.0.0.1:8080")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KHATA_BIND_ADDR".to_string()))?,

            database_path: read("KHATA_DATABASE_PATH", "./khata.db"),

            max_connections: read("KHATA_MAX_CONNECTIONS", "5")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KHATA_MAX_CONNECTIONS".to_string()))?,

            operation_timeout: read("KHATA_OPERATION_TIMEOUT_MS", "5000")
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue("KHATA_OPERATION_TIMEOUT_MS".to_string()))?,

            reconcile_on_delete: read("KHATA_RECONCILE_ON_DELETE", "true")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KHATA_RECONCILE_ON_DELETE".to_string()))?,

            store_name: read("KHATA_STORE_NAME", "Khata"),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("KHATA_MAX_CONNECTIONS".to_string()));
        }
        if config.operation_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("KHATA_OPERATION_TIMEOUT_MS".to_string()));
        }
        if config.store_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired("KHATA_STORE_NAME".to_string()));
        }

        Ok(config)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .operation_timeout(self.operation_timeout)
            .reconcile_ledger_on_delete(self.reconcile_on_delete)
            .store_name(self.store_name.clone())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert!(config.reconcile_on_delete);
        assert_eq!(config.engine_config().store_name, "Khata");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("KHATA_BIND_ADDR", "0.0.0.0:9000"),
            ("KHATA_OPERATION_TIMEOUT_MS", "250"),
            ("KHATA_RECONCILE_ON_DELETE", "false"),
            ("KHATA_STORE_NAME", "Gupta General Store"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        let engine = config.engine_config();
        assert_eq!(engine.operation_timeout, Duration::from_millis(250));
        assert!(!engine.reconcile_ledger_on_delete);
        assert_eq!(engine.store_name, "Gupta General Store");
    }

    #[test]
    fn test_invalid_values() {
        let err = ServerConfig::from_lookup(lookup(&[("KHATA_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == "KHATA_MAX_CONNECTIONS"));

        assert!(ServerConfig::from_lookup(lookup(&[("KHATA_OPERATION_TIMEOUT_MS", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("KHATA_RECONCILE_ON_DELETE", "yes")])).is_err());
    }
}
