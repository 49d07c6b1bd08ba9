use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Default bind port.
const DEFAULT_PORT: u16 = 5000;
/// Default SQLite database location.
const DEFAULT_DATABASE_URL: &str = "sqlite://roadmap.db";
/// Default number of days an ended session is kept before purging.
const DEFAULT_SESSION_RETENTION_DAYS: i64 = 30;
/// Default minimum password length for registration and password changes.
const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// A configuration value that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// sqlx connection string (default: `sqlite://roadmap.db`).
    pub database_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Ended sessions older than this many days are purged (default: `30`).
    pub session_retention_days: i64,
    /// Minimum accepted password length (default: `6`).
    pub min_password_length: usize,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `HOST`                   | `0.0.0.0`                |
    /// | `PORT`                   | `5000`                   |
    /// | `DATABASE_URL`           | `sqlite://roadmap.db`    |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                     |
    /// | `SESSION_RETENTION_DAYS` | `30`                     |
    /// | `MIN_PASSWORD_LENGTH`    | `6`                      |
    ///
    /// See [`JwtConfig::from_env`] for the JWT variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var("PORT", DEFAULT_PORT)?;
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", 30)?;
        let session_retention_days =
            parse_var("SESSION_RETENTION_DAYS", DEFAULT_SESSION_RETENTION_DAYS)?;
        let min_password_length = parse_var("MIN_PASSWORD_LENGTH", DEFAULT_MIN_PASSWORD_LENGTH)?;

        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            host,
            port,
            database_url,
            cors_origins,
            request_timeout_secs,
            session_retention_days,
            min_password_length,
            jwt,
        })
    }
}

/// Read `name` from the environment, falling back to `default` when unset.
pub(crate) fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
