//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. The JWT signing key is
//! shared with the identity provider and is the only required secret.

use std::env;
use std::str::FromStr;

/// Default name of the system-seeded public league.
pub const DEFAULT_PERMANENT_LEAGUE_NAME: &str = "EcoTrace Global League";

/// Which store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    /// In-process store; data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Store implementation
    pub storage_backend: StorageBackend,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: String,
    /// User that hosts the permanent public league
    pub system_user_id: u64,
    /// Display name of the permanent public league
    pub permanent_league_name: String,
    /// Leaderboard entries whose period ended longer ago than this are purged
    pub leaderboard_retention_days: u32,
    /// Run the recurring-entry backfill once before serving requests
    pub run_backfill_on_startup: bool,
    /// JWT verification key shared with the identity provider (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:4200".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            system_user_id: 1,
            permanent_league_name: DEFAULT_PERMANENT_LEAGUE_NAME.to_string(),
            leaderboard_retention_days: 400,
            run_backfill_on_startup: false,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
            port: parse_or("PORT", 8080)?,
            storage_backend: env::var("STORAGE_BACKEND")
                .map(|v| v.parse())
                .unwrap_or(Ok(StorageBackend::Firestore))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            system_user_id: parse_or("SYSTEM_USER_ID", 1)?,
            permanent_league_name: env::var("PERMANENT_LEAGUE_NAME")
                .unwrap_or_else(|_| DEFAULT_PERMANENT_LEAGUE_NAME.to_string()),
            leaderboard_retention_days: parse_or("LEADERBOARD_RETENTION_DAYS", 400)?,
            run_backfill_on_startup: parse_or("RUN_BACKFILL_ON_STARTUP", true)?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .trim()
                .as_bytes()
                .to_vec(),
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("STORAGE_BACKEND", "Memory");
        env::set_var("SYSTEM_USER_ID", "42");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.system_user_id, 42);
        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(config.leaderboard_retention_days, 400);
    }

    #[test]
    fn test_storage_backend_rejects_unknown() {
        let err = "postgres".parse::<StorageBackend>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("STORAGE_BACKEND", _)));
    }
}
