//! Unified error handling for Fanpilot
//!
//! A single error type shared by the control loop, the configuration layer and
//! the daemon binary. Errors are split into two families: failures that are
//! absorbed inside a poll cycle (sensor reads, unavailable drivers) and failures
//! that must stop the controller (anything that leaves a fan in an unknown state).

use std::io;
use std::path::PathBuf;

/// Result type alias using FanpilotError
pub type Result<T> = std::result::Result<T, FanpilotError>;

/// Unified error type for all Fanpilot operations
#[derive(thiserror::Error, Debug)]
pub enum FanpilotError {
    // ============================================================================
    // File System Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    // ============================================================================
    // Sensor Errors (recoverable, absorbed by the control loop)
    // ============================================================================
    #[error("Failed to read source {path}: {reason}")]
    SourceRead {
        path: PathBuf,
        reason: String,
    },

    #[error("Source {source_label} has no value")]
    SourceUnavailable {
        source_label: String,
    },

    // ============================================================================
    // Fan Errors (fatal)
    // ============================================================================
    #[error("Failed to write PWM {value} to {path}: {reason}")]
    PwmWrite {
        path: PathBuf,
        value: u8,
        reason: String,
    },

    #[error("Failed to enable manual control via {path}: {reason}")]
    EnableWrite {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to reset fan {fan}: {source}")]
    ResetFailed {
        fan: String,
        source: Box<FanpilotError>,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },
}

impl FanpilotError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid configuration error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a source read error
    pub fn source_read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error raised while resetting a fan
    pub fn reset_failed(fan: impl Into<String>, source: FanpilotError) -> Self {
        Self::ResetFailed {
            fan: fan.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error must stop the controller.
    ///
    /// Sensor-level failures degrade a single cycle; everything that concerns
    /// commanding a fan, or a broken configuration, is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::SourceRead { .. } | Self::SourceUnavailable { .. }
        )
    }
}
