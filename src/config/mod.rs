//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::SoundConfig;
use crate::countdown::{CountdownSettings, LateStartPolicy};
use crate::error::{ConfigError, ConfigResult};
use crate::offset::DEFAULT_TIME_URL;

/// Application configuration, stored as TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Countdown timing
    pub schedule: ScheduleConfig,

    /// Sound played at the target instant
    pub sound: SoundConfig,

    /// Clock correction against a time authority
    pub time_sync: TimeSyncConfig,
}

/// `[schedule]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Sampling cadence in milliseconds
    pub tick_interval_ms: u64,

    /// Remaining time below which the precise one-shot is armed
    pub arm_threshold_ms: u64,

    /// "refuse" or "fire" when the target has already passed
    pub late_start: LateStartPolicy,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let settings = CountdownSettings::default();
        Self {
            tick_interval_ms: settings.tick_interval.as_millis() as u64,
            arm_threshold_ms: settings.arm_threshold.as_millis() as u64,
            late_start: settings.late_start,
        }
    }
}

impl ScheduleConfig {
    /// Countdown settings described by this section
    pub fn settings(&self) -> CountdownSettings {
        CountdownSettings {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            arm_threshold: Duration::from_millis(self.arm_threshold_ms),
            late_start: self.late_start,
        }
    }
}

/// `[time_sync]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSyncConfig {
    /// Probe the time authority at startup
    pub enabled: bool,

    /// Endpoint returning JSON with a `utc_datetime` field
    pub url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: DEFAULT_TIME_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!(path = %config_path.display(), "Created default config");
            Ok(config)
        }
    }

    /// Load and validate configuration from `path`
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        Ok(config_dir.join("timed-playback").join("config.toml"))
    }

    /// Reject settings the countdown cannot honor
    pub fn validate(&self) -> ConfigResult<()> {
        let schedule = &self.schedule;

        if schedule.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "schedule.tick_interval_ms must be positive".to_string(),
            ));
        }

        // Otherwise a tick could skip the whole arming window.
        if schedule.arm_threshold_ms <= schedule.tick_interval_ms {
            return Err(ConfigError::InvalidValue(format!(
                "schedule.arm_threshold_ms ({}) must exceed tick_interval_ms ({})",
                schedule.arm_threshold_ms, schedule.tick_interval_ms
            )));
        }

        if !(0.0..=1.0).contains(&self.sound.volume) {
            return Err(ConfigError::InvalidValue(format!(
                "sound.volume {} is outside 0.0..=1.0",
                self.sound.volume
            )));
        }

        if self.time_sync.enabled && self.time_sync.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "time_sync.url is empty".to_string(),
            ));
        }

        Ok(())
    }
}
