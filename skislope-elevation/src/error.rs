//! Error types for skislope-elevation
//!
//! Only `Validation` is visible to callers (as a `None` grid). Every other
//! variant is caught by the orchestrator and turned into the next fallback
//! tier.

use thiserror::Error;

/// Elevation acquisition error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElevationError {
    /// Bad caller input (unknown location, resolution or area out of range)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Remote unreachable, timed out, or answered with a non-success status
    #[error("Transport error{}: {message}", status_suffix(.status))]
    Transport {
        /// HTTP status code when the server answered
        status: Option<u16>,
        message: String,
    },

    /// Response was malformed or missing its payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Well-formed error response from the remote server
    #[error("Remote error: {0}")]
    Remote(String),

    /// Well-formed response carrying zero usable samples
    #[error("No elevation data: {0}")]
    EmptyData(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl ElevationError {
    /// True for every error that advances the fallback chain
    pub fn is_fallback_trigger(&self) -> bool {
        !matches!(self, ElevationError::Validation(_))
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        ElevationError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Result type for elevation operations
pub type ElevationResult<T> = Result<T, ElevationError>;
