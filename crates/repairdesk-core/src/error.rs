//! Error types for the Repair Desk core library.

use thiserror::Error;

/// Result type alias using the core `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types shared by Repair Desk crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Unreadable settings file or an invalid setting. The message names
    /// the file or the offending key.
    #[error("Configuration error: {0}")]
    Config(String),
}
