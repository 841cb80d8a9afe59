// src/error.rs

//! Unified error handling for harvesting, generation and persistence.

use std::fmt;

use thiserror::Error;

/// Result type alias for postmill operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Login was rejected for an operator account
    #[error("Authentication failed for {account}: {message}")]
    AuthenticationFailure { account: String, message: String },

    /// A browser wait or scroll round exceeded its bound
    #[error("Extraction timed out: {0}")]
    ExtractionTimeout(String),

    /// Every selector group for a field came up empty
    #[error("No selector group matched field '{field}'")]
    ParseMismatch { field: String },

    /// Completion gateway timeout, transport error, malformed or empty response
    #[error("Gateway failure: {0}")]
    GatewayFailure(String),

    /// Batch sink write failed
    #[error("Persistence failure for {target}: {message}")]
    PersistenceFailure { target: String, message: String },

    /// Browser driver error
    #[error("Browser error: {0}")]
    Browser(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The run-wide cancellation token fired
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The run finished but some targets failed
    #[error("Run incomplete: {count} target(s) failed ({targets})")]
    Incomplete { count: usize, targets: String },
}

impl AppError {
    /// Create an authentication error for an account.
    pub fn authentication(account: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::AuthenticationFailure {
            account: account.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::ExtractionTimeout(message.into())
    }

    /// Create a parse mismatch error for a field.
    pub fn mismatch(field: impl Into<String>) -> Self {
        Self::ParseMismatch {
            field: field.into(),
        }
    }

    /// Create a gateway error.
    pub fn gateway(message: impl fmt::Display) -> Self {
        Self::GatewayFailure(message.to_string())
    }

    /// Create a persistence error scoped to a target.
    pub fn persistence(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::PersistenceFailure {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a browser driver error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a cancellation error naming where it was observed.
    pub fn cancelled(at: impl Into<String>) -> Self {
        Self::Cancelled(at.into())
    }
}
