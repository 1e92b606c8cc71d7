/// Configuration management for the views service
///
/// Handles server binding and database location.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// SQLite database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the database file (default: "data")
    pub data_dir: String,
}

impl DatabaseConfig {
    /// Full path of the database file: {data_dir}/views.db
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("views.db")
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("VIEWS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("VIEWS_PORT")
                    .ok()
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                data_dir: std::env::var("VIEWS_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            },
        }
    }
}
