//! Error types shared by the collaborator contracts

use thiserror::Error;

/// Failure while loading a portal page
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty response from {0}")]
    EmptyBody(String),

    #[error("Login rejected: {0}")]
    LoginRejected(String),
}

/// Failure reported by the remote table store
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Rate limit exceeded during {operation}: {message}")]
    RateLimited { operation: String, message: String },

    #[error("Store API error {status} during {operation}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Store transport error during {operation}: {message}")]
    Transport { operation: String, message: String },

    #[error("Unexpected store response during {operation}: {message}")]
    Decode { operation: String, message: String },

    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

impl StoreError {
    pub fn rate_limited(operation: &str, message: impl Into<String>) -> Self {
        Self::RateLimited {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn transport(operation: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(operation: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Only quota rejections are worth waiting for; everything else is fatal
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
