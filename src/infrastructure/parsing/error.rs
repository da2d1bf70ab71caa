//! Parsing error types

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Required page structure '{selector}' not found on {url}")]
    MissingStructure { selector: String, url: String },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid pattern: {pattern} - {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl ParsingError {
    pub fn missing_structure(selector: &str, url: &str) -> Self {
        Self::MissingStructure {
            selector: selector.to_string(),
            url: url.to_string(),
        }
    }

    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
