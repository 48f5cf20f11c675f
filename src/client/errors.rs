use thiserror::Error;

/// Failure of a portal API call as seen by the registration client.
///
/// The workflow shows a fixed message per operation; the variant keeps the
/// underlying cause for callers that want to branch on it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PortalError {
    #[error("Student not found")]
    NotFound,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: request timed out")]
    Timeout,
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Verification failed: {0}")]
    Verification(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
}

impl PortalError {
    /// Map a non-success HTTP status and its (already sanitized) body.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => Self::Validation(message),
            401 | 403 => Self::Verification(message),
            404 => Self::NotFound,
            _ => Self::Http { status, message },
        }
    }
}
