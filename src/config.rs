use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_SESSION_DB: &str = "sqlite://afya-session.db?mode=rwc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub session_db: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_url: try_load(&lookup, "AFYA_API_URL", DEFAULT_API_URL)?,
            session_db: try_load(&lookup, "AFYA_SESSION_DB", DEFAULT_SESSION_DB)?,
            request_timeout: Duration::from_secs(try_load(
                &lookup,
                "AFYA_HTTP_TIMEOUT_SECS",
                "30",
            )?),
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
