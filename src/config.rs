//! Runtime configuration loaded from environment variables.

use std::path::PathBuf;

use crate::repository::RetryPolicy;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// SQLite database file (from CASEBOOK_DB). `None` uses the platform data dir.
    pub database_path: Option<PathBuf>,
    /// HTTP port for `serve` (from CASEBOOK_PORT).
    pub port: u16,
    /// Allowed CORS origins (from CASEBOOK_CORS_ORIGINS, comma-separated).
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    /// Optimistic-write retries (CASEBOOK_MAX_ATTEMPTS,
    /// CASEBOOK_INITIAL_BACKOFF_MS, CASEBOOK_MAX_BACKOFF_MS).
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            port: DEFAULT_PORT,
            cors_origins: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unparseable values fall back to
    /// the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let database_path = lookup("CASEBOOK_DB")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let cors_origins = lookup("CASEBOOK_CORS_ORIGINS").map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let retry = RetryPolicy::new(
            parse_or(&lookup, "CASEBOOK_MAX_ATTEMPTS", defaults.retry.max_attempts),
            parse_or(
                &lookup,
                "CASEBOOK_INITIAL_BACKOFF_MS",
                defaults.retry.initial_backoff_ms,
            ),
            parse_or(&lookup, "CASEBOOK_MAX_BACKOFF_MS", defaults.retry.max_backoff_ms),
        );

        Self {
            database_path,
            port: parse_or(&lookup, "CASEBOOK_PORT", defaults.port),
            cors_origins,
            retry,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
    }
}
