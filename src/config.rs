//! Application configuration.
//!
//! Runtime settings resolve with priority `config.toml` > environment
//! (`.env` is loaded first) > defaults. Domain constants used by the
//! service lifecycle live here as well.

use serde::Deserialize;
use std::path::PathBuf;

use crate::paths;

// ==================== File Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    database: Option<DatabaseConfig>,
    server: Option<ServerSection>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
}

/// Resolved runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Full address to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load settings from config.toml, the environment and defaults
pub fn load() -> Settings {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let file_config = match std::fs::read_to_string("config.toml") {
        Ok(contents) => parse_config(&contents),
        Err(_) => AppConfig::default(),
    };

    resolve(file_config, |key| std::env::var(key).ok())
}

fn parse_config(contents: &str) -> AppConfig {
    match toml::from_str::<AppConfig>(contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring malformed config.toml: {}", e);
            AppConfig::default()
        }
    }
}

fn resolve(config: AppConfig, env: impl Fn(&str) -> Option<String>) -> Settings {
    let database_path = match config.database.and_then(|db| db.path) {
        Some(path) => {
            tracing::info!("Using database from config.toml: {}", path);
            PathBuf::from(path)
        }
        None => match env("DATABASE_PATH") {
            Some(path) => {
                tracing::info!("Using database from DATABASE_PATH env: {}", path);
                PathBuf::from(path)
            }
            None => PathBuf::from(paths::db_path()),
        },
    };

    let (file_host, file_port) = match config.server {
        Some(server) => (server.host, server.port),
        None => (None, None),
    };

    let host = file_host
        .or_else(|| env("HOST"))
        .unwrap_or_else(|| SERVER_ADDR.to_string());
    let port = file_port
        .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
        .unwrap_or(SERVER_PORT);

    Settings {
        database_path,
        host,
        port,
    }
}

// ==================== Server Defaults ====================

/// Default address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Default port
pub const SERVER_PORT: u16 = 3000;

// ==================== Session Configuration ====================

/// Session lifetime in hours (1 week)
pub const SESSION_DURATION_HOURS: i64 = 24 * 7;

// ==================== Service Lifecycle ====================

/// Hour of day (UTC) every due date is pinned to.
/// Midday keeps the calendar date stable for any client offset within ±12h.
pub const DUE_HOUR_UTC: u32 = 12;

/// Total records in a monthly series (the base plus 11 future months)
pub const MONTHLY_OCCURRENCES: u32 = 12;

/// Category used for payment expenses when the service has none
pub const DEFAULT_PAYMENT_CATEGORY: &str = "Servicios";

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_config_or_env() {
        let settings = resolve(AppConfig::default(), no_env);
        assert_eq!(settings.host, SERVER_ADDR);
        assert_eq!(settings.port, SERVER_PORT);
        assert!(settings.database_path.ends_with("finanzas.db"));
        assert_eq!(settings.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_config_file_wins_over_env() {
        let config = parse_config(
            r#"
            [database]
            path = "/tmp/from-file.db"

            [server]
            port = 8080
            "#,
        );
        let settings = resolve(config, |key| match key {
            "DATABASE_PATH" => Some("/tmp/from-env.db".to_string()),
            "PORT" => Some("9090".to_string()),
            "HOST" => Some("127.0.0.1".to_string()),
            _ => None,
        });

        assert_eq!(settings.database_path, PathBuf::from("/tmp/from-file.db"));
        assert_eq!(settings.port, 8080);
        // host not in file, env applies
        assert_eq!(settings.host, "127.0.0.1");
    }

    #[test]
    fn test_env_used_when_file_silent() {
        let settings = resolve(AppConfig::default(), |key| match key {
            "DATABASE_PATH" => Some("/tmp/env.db".to_string()),
            "PORT" => Some("4000".to_string()),
            _ => None,
        });
        assert_eq!(settings.database_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(settings.port, 4000);
    }

    #[test]
    fn test_unparseable_port_falls_back() {
        let settings = resolve(AppConfig::default(), |key| match key {
            "PORT" => Some("not-a-port".to_string()),
            _ => None,
        });
        assert_eq!(settings.port, SERVER_PORT);
    }

    #[test]
    fn test_malformed_config_is_ignored() {
        let config = parse_config("this is [not toml");
        assert!(config.database.is_none());
        assert!(config.server.is_none());
    }
}
