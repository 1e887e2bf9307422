//! Error types for timed playback
//!
//! This module defines error types using thiserror. Countdown errors are
//! returned synchronously from `start()`; probe errors are folded into the
//! probe state as a displayable message.

use thiserror::Error;

use crate::clock::EpochMillis;

/// Errors returned when starting a countdown session
#[derive(Error, Debug)]
pub enum CountdownError {
    /// The target is not in the future and the policy refuses late starts
    #[error("Target {target} is not after the current time {now}")]
    PastTarget {
        /// Requested target
        target: EpochMillis,
        /// Clock reading at the refused start
        now: EpochMillis,
    },

    /// Playback fired and the countdown has not been reset
    #[error("Playback already fired, reset before starting a new countdown")]
    AlreadyFired,

    /// The ticker could not be registered
    #[error("Failed to schedule countdown timer: {0}")]
    Schedule(#[from] TimerError),
}

/// Timer registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The event loop rejected the timer source
    #[error("Failed to insert timer into event loop: {0}")]
    Insert(String),
}

/// Time offset probe errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The time authority answered with a non-200 status
    #[error("request failed (HTTP {0})")]
    RequestFailed(u16),

    /// The body lacks a parseable `utc_datetime`
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Connection, timeout or body decoding failure
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        ProbeError::Transport(e.to_string())
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error reading or writing the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Malformed TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Config could not be written as TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// No user config directory on this platform
    #[error("Config directory not found")]
    NoConfigDir,

    /// A value failed validation
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

// Convenience type aliases for common Result types

/// Result of countdown operations
pub type CountdownResult<T> = std::result::Result<T, CountdownError>;
/// Result of config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
/// Result of an offset probe
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
