//! Progress reports for in-flight fetches

use serde::{Deserialize, Serialize};

/// Latest progress of a remote fetch, keyed by request id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub request_id: String,
    /// Percent complete, clamped to 0-100
    pub percent: f64,
    pub message: String,
    /// Samples fetched so far
    pub current: Option<u64>,
    /// Total samples requested
    pub total: Option<u64>,
}

impl ProgressState {
    pub fn new(request_id: impl Into<String>, percent: f64, message: impl Into<String>) -> Self {
        let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
        Self {
            request_id: request_id.into(),
            percent,
            message: message.into(),
            current: None,
            total: None,
        }
    }

    pub fn with_counts(mut self, current: Option<u64>, total: Option<u64>) -> Self {
        self.current = current;
        self.total = total;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}
