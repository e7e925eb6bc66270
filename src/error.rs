//! Error handling for the garrison server

use thiserror::Error;

/// Main error type for garrison server operations
#[derive(Error, Debug)]
pub enum GarrisonError {
    /// Configuration error (missing key, bad value, out-of-range)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/connection error
    #[error("Network error: {0}")]
    Io(#[from] std::io::Error),

    /// Worker pool error
    #[error("Worker pool error: {0}")]
    Pool(String),
}
