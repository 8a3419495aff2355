//! Error types for NetStatWiz

use std::io;
use thiserror::Error;

/// Result type alias for NetStatWiz operations
pub type Result<T> = std::result::Result<T, NetStatError>;

/// Main error type
#[derive(Error, Debug)]
pub enum NetStatError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection-listing command could not run or exited abnormally
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Command or request exceeded its time bound
    #[error("Timed out: {0}")]
    Timeout(String),

    /// HTTP transport failure or non-success status code
    #[error("Network error: {0}")]
    Network(String),

    /// Geolocation provider answered, but not with a usable location
    #[error("Lookup failed for {ip}: {message}")]
    Lookup { ip: String, message: String },

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report could not be rendered
    #[error("Render error: {0}")]
    Render(String),
}

impl NetStatError {
    /// IP address the error relates to, if any
    pub fn ip(&self) -> Option<&str> {
        match self {
            NetStatError::Lookup { ip, .. } => Some(ip),
            _ => None,
        }
    }
}
