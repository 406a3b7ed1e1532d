//! Configuration module for the Drop backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for the identity provider and analyzer (service routes stay locked without it)
    pub service_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// How long a minted session stays valid
    pub session_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let service_psk = env::var("DROP_SERVICE_PSK")
            .ok()
            .filter(|psk| !psk.is_empty());

        let db_path = env::var("DROP_DB_PATH")
            .unwrap_or_else(|_| "./data/drop.sqlite".to_string())
            .into();

        let bind_addr = env::var("DROP_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| format!("Invalid DROP_BIND_ADDR format: {}", e))?;

        let log_level = env::var("DROP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = parse_log_format(env::var("DROP_LOG_FORMAT").ok().as_deref())?;

        let session_ttl_hours: i64 = env::var("DROP_SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "720".to_string())
            .parse()
            .map_err(|e| format!("Invalid DROP_SESSION_TTL_HOURS: {}", e))?;
        if session_ttl_hours <= 0 {
            return Err("DROP_SESSION_TTL_HOURS must be positive".to_string());
        }

        Ok(Self {
            service_psk,
            db_path,
            bind_addr,
            log_level,
            log_json,
            session_ttl: Duration::hours(session_ttl_hours),
        })
    }
}

/// `DROP_LOG_FORMAT`: `text` (default) or `json`.
fn parse_log_format(value: Option<&str>) -> Result<bool, String> {
    match value {
        None | Some("text") => Ok(false),
        Some("json") => Ok(true),
        Some(other) => Err(format!("Invalid DROP_LOG_FORMAT: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("DROP_SERVICE_PSK");
        env::remove_var("DROP_DB_PATH");
        env::remove_var("DROP_BIND_ADDR");
        env::remove_var("DROP_LOG_LEVEL");
        env::remove_var("DROP_SESSION_TTL_HOURS");
        env::remove_var("DROP_LOG_FORMAT");

        let config = Config::from_env().unwrap();

        assert!(config.service_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/drop.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.session_ttl, Duration::hours(720));
    }

    #[test]
    fn test_log_format() {
        assert_eq!(parse_log_format(None), Ok(false));
        assert_eq!(parse_log_format(Some("text")), Ok(false));
        assert_eq!(parse_log_format(Some("json")), Ok(true));
        assert!(parse_log_format(Some("yaml")).is_err());
    }
}
