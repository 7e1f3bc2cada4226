//! Environment configuration

use std::str::FromStr;

use anyhow::{anyhow, Context};
use murajaah_core::algorithm::fsrs::DEFAULT_RETENTION;
use murajaah_core::config::{GRADUATE_REVIEW_DAYS, GRADUATION_DAYS, GRADUATION_STABILITY};
use murajaah_core::{EngineConfig, Fsrs, Weights};

/// Process configuration read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub database_max_connections: u32,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns `None` for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let retention: f64 = parse_or(&lookup, "TARGET_RETENTION", DEFAULT_RETENTION)?;
        if !(retention > 0.0 && retention < 1.0) {
            return Err(anyhow!("TARGET_RETENTION must be between 0 and 1, got {retention}"));
        }

        let engine = EngineConfig {
            fsrs: Fsrs::new(Weights::default(), retention),
            graduation_days: parse_or(&lookup, "GRADUATION_DAYS", GRADUATION_DAYS)?,
            graduation_stability: parse_or(&lookup, "GRADUATION_STABILITY", GRADUATION_STABILITY)?,
            graduate_review_days: parse_or(&lookup, "GRADUATE_REVIEW_DAYS", GRADUATE_REVIEW_DAYS)?,
        };

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            engine,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
