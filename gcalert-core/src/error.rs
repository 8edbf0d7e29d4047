//! Error types for gcalert.

use thiserror::Error;

/// Errors that can occur while fetching, scheduling or displaying alarms.
#[derive(Error, Debug)]
pub enum GcalertError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Could not parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GcalertError {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        GcalertError::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for gcalert operations.
pub type GcalertResult<T> = Result<T, GcalertError>;
