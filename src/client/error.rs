//! Client-side error taxonomy.

use thiserror::Error;

use crate::domain::ValidationErrors;

/// Everything that can go wrong when talking to the dinner-picker API.
///
/// Each variant renders a message suitable for showing to the user.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected locally; nothing was sent.
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Network error. Please check your connection. ({0})")]
    Network(String),

    #[error("Request timeout. Please try again.")]
    Timeout,

    #[error("{message}")]
    Server { status: u16, message: String },

    /// The action is not allowed in the current state (locked session,
    /// downvote at zero, vote still in flight).
    #[error("{0}")]
    StateConflict(String),

    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl ClientError {
    /// Network failures, timeouts and 5xx responses may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Timeout => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Raised before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(self, ClientError::Validation(_) | ClientError::StateConflict(_))
    }

    /// HTTP status for server-side failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub(crate) fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_message(status).to_string());
        ClientError::Server { status, message }
    }
}

/// Fallback message when an error body carries neither `error` nor `message`.
pub fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Invalid input. Please check your data and try again.",
        403 => "This action is not allowed. The session may be locked.",
        404 => "The requested item was not found.",
        500..=599 => "Server error. Please try again later.",
        _ => "An unexpected error occurred",
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        ClientError::Validation(errors)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::from_status(status.as_u16(), None)
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
