//! Configuration and settings management
//!
//! Loads settings from environment variables and defines runtime constants.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Seconds of inactivity after which an in-progress conversation is cleared
pub const SESSION_TIMEOUT_SECS: u64 = 600;
/// Interval between idle-conversation sweeps
pub const SWEEP_INTERVAL_SECS: u64 = 30;

/// Raw, unvalidated view of the environment
#[derive(Debug, Deserialize)]
struct RawSettings {
    bot_token: Option<String>,
    api_id: Option<String>,
    api_hash: Option<String>,
}

/// Validated application settings
///
/// All three values are required. The upstream flow this bot reproduces
/// silently fell back to placeholder credentials when `API_ID`/`API_HASH`
/// were unset, which made every login fail at runtime; here a missing or
/// malformed value is a startup error instead.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub bot_token: String,
    /// Numeric application id for the auth backends (my.telegram.org)
    pub api_id: i32,
    /// Application secret for the auth backends
    pub api_hash: String,
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or if `BOT_TOKEN`, `API_ID`
    /// or `API_HASH` is missing, empty, or (for `API_ID`) not numeric.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut raw: RawSettings = s.try_deserialize()?;

        // Fallback: check environment variables directly if config didn't
        // pick them up
        if raw.bot_token.is_none() {
            raw.bot_token = non_empty_env("BOT_TOKEN");
        }
        if raw.api_id.is_none() {
            raw.api_id = non_empty_env("API_ID");
        }
        if raw.api_hash.is_none() {
            raw.api_hash = non_empty_env("API_HASH");
        }

        let bot_token = raw
            .bot_token
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Message("BOT_TOKEN is not set".into()))?;

        let api_id = raw
            .api_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Message("API_ID is not set".into()))?
            .trim()
            .parse::<i32>()
            .map_err(|_| {
                ConfigError::Message("API_ID must be a numeric application id".into())
            })?;

        let api_hash = raw
            .api_hash
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Message("API_HASH is not set".into()))?;

        Ok(Self {
            bot_token,
            api_id,
            api_hash,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Single test so the env mutations cannot race each other
    #[test]
    fn test_env_loading_and_fail_fast() {
        env::set_var("BOT_TOKEN", "123456:dummy");
        env::set_var("API_ID", "123456");
        env::set_var("API_HASH", "deadbeef");

        let settings = Settings::new().expect("all variables set");
        assert_eq!(settings.bot_token, "123456:dummy");
        assert_eq!(settings.api_id, 123_456);
        assert_eq!(settings.api_hash, "deadbeef");

        // Non-numeric API_ID is rejected up front
        env::set_var("API_ID", "not-a-number");
        let err = Settings::new().expect_err("non-numeric API_ID");
        assert!(err.to_string().contains("API_ID"));

        // Missing API_HASH is rejected up front
        env::set_var("API_ID", "123456");
        env::remove_var("API_HASH");
        let err = Settings::new().expect_err("missing API_HASH");
        assert!(err.to_string().contains("API_HASH"));

        // Empty values count as unset
        env::set_var("API_HASH", "");
        assert!(Settings::new().is_err());

        env::remove_var("BOT_TOKEN");
        env::remove_var("API_ID");
        env::remove_var("API_HASH");
    }
}
