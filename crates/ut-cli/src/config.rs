//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Look-back before a query window used to discover already-open
    /// sessions, in milliseconds.
    pub guard_buffer_ms: i64,

    /// Local hour after which a day is considered complete for streak
    /// evaluation.
    pub cutoff_hour: u8,

    /// Daily social-time budget for the streak, in milliseconds.
    pub social_limit_ms: i64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("guard_buffer_ms", &self.guard_buffer_ms)
            .field("cutoff_hour", &self.cutoff_hour)
            .field("social_limit_ms", &self.social_limit_ms)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let streak = ut_core::StreakConfig::default();
        Self {
            database_path: data_dir.join("ut.db"),
            guard_buffer_ms: ut_core::AggregatorConfig::default().guard_buffer_ms,
            cutoff_hour: streak.cutoff_hour,
            social_limit_ms: streak.social_limit_ms,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (UT_*)
        figment = figment.merge(Env::prefixed("UT_"));

        figment.extract()
    }

    /// The aggregator configuration derived from this config.
    #[must_use]
    pub const fn aggregator(&self) -> ut_core::AggregatorConfig {
        ut_core::AggregatorConfig {
            guard_buffer_ms: self.guard_buffer_ms,
        }
    }

    /// The streak configuration derived from this config.
    #[must_use]
    pub const fn streak(&self) -> ut_core::StreakConfig {
        ut_core::StreakConfig {
            cutoff_hour: self.cutoff_hour,
            social_limit_ms: self.social_limit_ms,
        }
    }
}

/// Returns the platform-specific config directory for ut.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ut"))
}

/// Returns the platform-specific data directory for ut.
///
/// On Linux: `~/.local/share/ut`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ut"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_returns_some() {
        assert!(dirs_data_path().is_some());
    }

    #[test]
    fn test_dirs_data_path_ends_with_ut() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "ut");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("ut.db"));
    }

    #[test]
    fn test_default_guard_buffer_is_one_hour() {
        assert_eq!(Config::default().guard_buffer_ms, 3_600_000);
    }
}
