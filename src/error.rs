// src/error.rs

//! Unified error handling for the sync application.

use std::fmt;

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
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

    /// XML response could not be decoded
    #[error("XML decode error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// `.env` file could not be read
    #[error("Env file error: {0}")]
    Dotenv(#[from] dotenv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration value failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Account credentials were rejected or missing
    #[error("Authentication failed for account '{account}': {message}")]
    Auth { account: String, message: String },

    /// eBay returned a failure acknowledgement
    #[error("eBay API error for account '{account}': {message}")]
    EbayApi { account: String, message: String },

    /// History could not be loaded or written
    #[error("History persistence failed at {path}: {message}")]
    Persistence { path: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an account authentication error.
    pub fn auth(account: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Auth {
            account: account.into(),
            message: message.to_string(),
        }
    }

    /// Create an eBay API error.
    pub fn ebay(account: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::EbayApi {
            account: account.into(),
            message: message.to_string(),
        }
    }

    /// Create a history persistence error.
    pub fn persistence(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error stems from bad configuration rather than a failed run.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Validation(_) | Self::Toml(_) | Self::Dotenv(_)
        )
    }

    /// Whether this error is limited to a single account.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}
