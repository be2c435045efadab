//! Runtime configuration from command-line flags and environment variables.

use std::time::Duration;

use clap::{ArgAction, Parser};
use thiserror::Error;

use crate::cache::MAX_TTL;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },

    #[error("{name} must be at most {max_secs} seconds")]
    DurationTooLong { name: &'static str, max_secs: u64 },

    #[error("CORS origin must not be empty")]
    EmptyCorsOrigin,
}

/// Flags fall back to the environment variable of the same name, which
/// may in turn come from a `.env` file.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "demo-api")]
#[command(about = "Demo CRUD API: users, articles, demo utilities and idempotent payments")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Config {
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Origin allowed to make cross-origin requests. `*` allows any.
    #[arg(long, env = "CORS_ORIGIN", default_value = DEFAULT_CORS_ORIGIN)]
    pub cors_origin: String,

    #[arg(long, env = "ACCESS_TOKEN_TTL_SECS", default_value_t = DEFAULT_ACCESS_TOKEN_TTL_SECS)]
    pub access_token_ttl_secs: u64,

    #[arg(long, env = "REFRESH_TOKEN_TTL_SECS", default_value_t = DEFAULT_REFRESH_TOKEN_TTL_SECS)]
    pub refresh_token_ttl_secs: u64,

    /// How long `/demo/random` results stay cached.
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    /// Create the demo admin and user accounts at startup.
    #[arg(long, env = "SEED_USERS", default_value_t = true, action = ArgAction::Set)]
    pub seed_users: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            cors_origin: DEFAULT_CORS_ORIGIN.to_owned(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            seed_users: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("access token TTL", self.access_token_ttl_secs),
            ("refresh token TTL", self.refresh_token_ttl_secs),
            ("cache TTL", self.cache_ttl_secs),
        ];
        if let Some(&(name, _)) = durations.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ZeroDuration { name });
        }
        let max_secs = MAX_TTL.as_secs();
        if let Some(&(name, _)) = durations.iter().find(|(_, secs)| *secs > max_secs) {
            return Err(ConfigError::DurationTooLong { name, max_secs });
        }
        if self.cors_origin.trim().is_empty() {
            return Err(ConfigError::EmptyCorsOrigin);
        }
        Ok(())
    }

    /// `host:port` for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
