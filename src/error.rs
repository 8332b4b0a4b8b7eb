//! Error types for prerollr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while building or applying a schedule
#[derive(Debug, Error)]
pub enum PrerollError {
    /// No rule document could be located
    #[error("Schedule file not found: {0}")]
    ConfigNotFound(String),

    /// Malformed category, unknown category or missing required field
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A date/time token could not be decomposed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A date value of an unsupported type
    #[error("Type error: {0}")]
    Type(String),

    /// Plex server communication error
    #[error("Plex error: {0}")]
    Plex(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for prerollr operations
pub type Result<T> = std::result::Result<T, PrerollError>;
