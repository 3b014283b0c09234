//! Configuration module for the directory backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name} value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite file backing the table store
    pub db_path: PathBuf,
    /// Root directory for uploaded blobs
    pub blob_dir: PathBuf,
    /// Prefix used to build public blob addresses
    pub public_base_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// API key for the completion service; generation is disabled without it
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Timeout applied to outbound calls
    pub upstream_timeout: Duration,
    /// Attempts per storage write on the dual-record path
    pub store_retry_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("DIRECTORY_DB_PATH")
            .unwrap_or_else(|_| "./data/directory.sqlite".to_string())
            .into();

        let blob_dir = env::var("DIRECTORY_BLOB_DIR")
            .unwrap_or_else(|_| "./data/blobs".to_string())
            .into();

        let public_base_url = env::var("DIRECTORY_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        let bind_addr = parse_var("DIRECTORY_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("DIRECTORY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("DIRECTORY_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let gemini_api_key = env::var("DIRECTORY_GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let gemini_model =
            env::var("DIRECTORY_GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        let gemini_base_url = env::var("DIRECTORY_GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());

        let timeout_secs: u64 = parse_var("DIRECTORY_UPSTREAM_TIMEOUT_SECS", "30")?;

        let store_retry_attempts: u32 = parse_var("DIRECTORY_STORE_RETRY_ATTEMPTS", "2")?;

        Ok(Self {
            db_path,
            blob_dir,
            public_base_url,
            bind_addr,
            log_level,
            log_format,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
            store_retry_attempts: store_retry_attempts.max(1),
        })
    }
}

fn parse_var<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for name in [
            "DIRECTORY_DB_PATH",
            "DIRECTORY_BLOB_DIR",
            "DIRECTORY_PUBLIC_BASE_URL",
            "DIRECTORY_BIND_ADDR",
            "DIRECTORY_LOG_LEVEL",
            "DIRECTORY_LOG_FORMAT",
            "DIRECTORY_GEMINI_API_KEY",
            "DIRECTORY_GEMINI_MODEL",
            "DIRECTORY_GEMINI_BASE_URL",
            "DIRECTORY_UPSTREAM_TIMEOUT_SECS",
            "DIRECTORY_STORE_RETRY_ATTEMPTS",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/directory.sqlite"));
        assert_eq!(config.blob_dir, PathBuf::from("./data/blobs"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert_eq!(config.store_retry_attempts, 2);
    }

    #[test]
    fn test_parse_var_reports_bad_value() {
        env::set_var("DIRECTORY_TEST_BAD_NUMBER", "soon");
        let err = parse_var::<u64>("DIRECTORY_TEST_BAD_NUMBER", "1").unwrap_err();
        env::remove_var("DIRECTORY_TEST_BAD_NUMBER");

        assert!(err.to_string().contains("DIRECTORY_TEST_BAD_NUMBER"));
        assert!(err.to_string().contains("soon"));
    }
}
