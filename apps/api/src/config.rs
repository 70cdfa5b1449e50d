//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::Serialize;
use std::env;
use std::str::FromStr;

use stockroom_core::pricing::TaxPrecedence;

const DEV_JWT_SECRET: &str = "stockroom-dev-secret-change-in-production";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// API configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub port: u16,

    /// SQLite database file, or `:memory:`
    pub database_path: String,

    /// Connection pool size
    pub db_max_connections: u32,

    /// HMAC secret for access tokens
    #[serde(skip)]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Tie-break between active taxes covering one category
    pub tax_precedence: TaxPrecedence,

    /// Extra attempts for a stock update that loses its version check
    pub stock_update_retries: u32,

    /// Request body limit for uploads in bytes (default: 5MB)
    pub max_upload_bytes: usize,

    pub log_format: LogFormat,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if production => return Err(ConfigError::MissingRequired("JWT_SECRET".to_string())),
            _ => DEV_JWT_SECRET.to_string(),
        };

        let config = ApiConfig {
            port: parse_var("PORT", "8000")?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./stockroom.db".to_string()),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "5")?,

            jwt_secret,

            jwt_lifetime_secs: parse_var("JWT_LIFETIME_SECS", "28800")?, // 8 hours

            tax_precedence: parse_var("TAX_PRECEDENCE", "oldest")?,

            stock_update_retries: parse_var("STOCK_UPDATE_RETRIES", "3")?,

            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", "5242880")?,

            log_format: parse_var("LOG_FORMAT", "pretty")?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if config.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()));
        }

        Ok(config)
    }

    /// Configuration for tests: in-memory database, fixed secret.
    pub fn for_tests() -> Self {
        ApiConfig {
            port: 0,
            database_path: ":memory:".to_string(),
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            jwt_lifetime_secs: 3600,
            tax_precedence: TaxPrecedence::Oldest,
            stock_update_retries: 3,
            max_upload_bytes: 1024 * 1024,
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
