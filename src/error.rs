//! Error types for the stylec compiler
//!
//! Malformed user input never surfaces here: parse, alias, and config
//! problems degrade to a safe fallback plus a deduplicated diagnostic
//! (see `diagnostics`). This enum covers hard failures only - internal
//! invariant violations and the I/O the CLI performs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid style map: {message}")]
    InvalidInput { message: String },

    #[error("Internal invariant violated in {stage}: {message}")]
    Invariant { stage: String, message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, StyleError>;

impl StyleError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn invariant(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invariant {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}
