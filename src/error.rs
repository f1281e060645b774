//! Custom error types for the application.
//!
//! This module defines the primary error type, `SteerError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the error categories the control engine deals
//! with:
//!
//! - **`Config`**: Wraps errors from the `config` crate, typically related to
//!   file parsing or format issues in the configuration files.
//! - **`Configuration`**: Semantic errors in the configuration, such as values
//!   that parse but are logically invalid (e.g., a zero calibration factor or
//!   two coils assigned the same output pin). Caught during validation.
//! - **`Io`**: Wraps standard `std::io::Error` for file I/O issues.
//! - **`Replay`**: Malformed replay waveform files. Non-fatal: the replay
//!   routine degrades to a diagnostic and returns cleanly.
//! - **`Hardware`**: Errors surfaced by an analog-output backend.
//!
//! None of these categories is permitted to terminate the hosting process.
//! The engine's failure boundary is "the routine body returns", which is
//! always treated as a clean stop regardless of cause.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, SteerError>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum SteerError {
    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File or network I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Replay waveform file is missing or malformed.
    #[error("Replay file error: {0}")]
    Replay(String),

    /// Analog-output backend reported a failure.
    #[error("Hardware error: {0}")]
    Hardware(String),
}
