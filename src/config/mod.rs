//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Platform API base URL (stats, leaderboards, data and world storage)
    pub host_api_url: String,
    /// Platform API service key
    pub host_api_key: String,

    /// Directory holding the loot tier files
    pub assets_dir: PathBuf,
    /// Directory holding world template metadata
    pub world_templates_dir: PathBuf,
    /// Storage bucket for persistent demo worlds
    pub world_bucket: String,

    /// Minimum alive players required to start a match
    pub min_players: usize,
    /// Base border shrink rate (seconds)
    pub shrink_time_rate: u32,
    /// Per-alive-player border shrink rate (seconds)
    pub shrink_time_player_rate: u32,
    /// Minimum border radius
    pub min_border_radius: u32,

    /// Skip platform service writes (stat awards, leaderboard increments)
    pub local_testing: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            host_api_url: env::var("HOST_API_URL").map_err(|_| ConfigError::Missing("HOST_API_URL"))?,
            host_api_key: env::var("HOST_API_KEY").map_err(|_| ConfigError::Missing("HOST_API_KEY"))?,

            assets_dir: env::var("ASSETS_DIR")
                .unwrap_or_else(|_| "assets/configs".to_string())
                .into(),
            world_templates_dir: env::var("WORLD_TEMPLATES_DIR")
                .unwrap_or_else(|_| "assets/world-templates".to_string())
                .into(),
            world_bucket: env::var("WORLD_BUCKET").unwrap_or_else(|_| "DemoWorlds".to_string()),

            min_players: parse_var("MIN_PLAYERS", 2)?,
            shrink_time_rate: parse_var("SHRINK_TIME_RATE", 60)?,
            shrink_time_player_rate: parse_var("SHRINK_TIME_PLAYER_RATE", 24)?,
            min_border_radius: parse_var("MIN_BORDER_RADIUS", 10)?,

            local_testing: env::var("LOCAL_TEST").is_ok(),
        })
    }
}

/// Parse an optional numeric environment variable with a default
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_default_applies_when_unset() {
        assert_eq!(parse_var("SG_TEST_UNSET_VAR", 42usize).unwrap(), 42);
    }

    #[test]
    fn invalid_numeric_is_rejected() {
        env::set_var("SG_TEST_BAD_VAR", "not-a-number");
        let result: Result<u32, _> = parse_var("SG_TEST_BAD_VAR", 1);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        env::remove_var("SG_TEST_BAD_VAR");
    }
}
