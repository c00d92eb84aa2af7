//! # Error Types
//!
//! Custom error types for Joy Teleop using `thiserror`.

use thiserror::Error;

/// Main error type for Joy Teleop
#[derive(Debug, Error)]
pub enum TeleopError {
    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Joy event too short for the configured button or axis mapping
    #[error("Joy event has {actual} {kind}, mapping needs at least {required}")]
    InputContract {
        kind: &'static str,
        required: usize,
        actual: usize,
    },

    /// Joystick device errors
    #[error("Joystick error: {0}")]
    Device(String),

    /// No joystick found during auto-detection
    #[error("No joystick found under /dev/input")]
    DeviceNotFound,

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// A command could not be delivered to its topic
    #[error("Failed to publish on {topic}: {reason}")]
    Publish { topic: String, reason: String },

    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Joy Teleop
pub type Result<T> = std::result::Result<T, TeleopError>;
