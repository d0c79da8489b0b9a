use std::env;

use crate::token::{ConfigError, TokenCodec};

/// Lifetime of an access token when `JWT_ACCESS_TOKEN_TTL_SECONDS` is not set.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// pulled into handlers through `FromRef`.
#[derive(Clone)]
pub struct AppConfig {
    // Database connection string (Postgres). Optional locally: without it the
    // in-memory account store is used.
    pub db_url: Option<String>,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Runtime environment marker. Selects log format and secret strictness.
    pub env: Env,
    // Symmetric secret used to sign and verify access tokens. At least 32 bytes.
    pub jwt_secret: String,
    // Lifetime of issued access tokens, in seconds.
    pub token_ttl_seconds: i64,
}

/// Env
///
/// Defines the runtime context: developer-friendly defaults locally, mandatory
/// secrets and JSON logs in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking configuration for tests. No database, local secret.
    fn default() -> Self {
        Self {
            db_url: None,
            bind_addr: "127.0.0.1:3000".to_string(),
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup, fail-fast.
    ///
    /// # Panics
    /// Panics in production when `JWT_SECRET` or `DATABASE_URL` is missing, and in
    /// any environment when `JWT_ACCESS_TOKEN_TTL_SECONDS` is not an integer. The
    /// application must not start with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let token_ttl_seconds = match env::var("JWT_ACCESS_TOKEN_TTL_SECONDS") {
            Ok(raw) => raw
                .parse::<i64>()
                .expect("FATAL: JWT_ACCESS_TOKEN_TTL_SECONDS must be an integer number of seconds."),
            Err(_) => DEFAULT_TOKEN_TTL_SECONDS,
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
            ),
            Env::Local => env::var("DATABASE_URL").ok(),
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Self {
            db_url,
            bind_addr,
            env,
            jwt_secret,
            token_ttl_seconds,
        }
    }

    /// token_codec
    ///
    /// Builds the signing codec from the configured secret and TTL. A secret shorter
    /// than 32 bytes is a configuration error, reported here before any request is
    /// served.
    pub fn token_codec(&self) -> Result<TokenCodec, ConfigError> {
        TokenCodec::new(self.jwt_secret.as_bytes(), self.token_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds_codec() {
        assert!(AppConfig::default().token_codec().is_ok());
    }

    #[test]
    fn test_short_secret_fails_codec() {
        let config = AppConfig {
            jwt_secret: "short".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.token_codec(),
            Err(ConfigError::SecretTooShort(5))
        ));
    }
}
