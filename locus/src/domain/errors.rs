//! Structured error types for locus
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Only registration and configuration surface errors; per-sample failures
//! are absorbed into the sentinel location.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Pattern #{index} is empty (it would match every file)")]
    EmptyPattern { index: usize },

    #[error("Pattern #{index} contains a NUL byte: {pattern:?}")]
    InvalidPattern { index: usize, pattern: String },

    #[error("Base path must be absolute: {}", .0.display())]
    RelativeBasePath(PathBuf),

    #[error("Sampler dispatch unavailable: {0}")]
    DispatchUnavailable(#[from] DispatchError),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("sampler refused the locator: {0}")]
    Unavailable(String),

    #[error("locator slot is closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read filter config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid filter config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] RegistrationError),
}
