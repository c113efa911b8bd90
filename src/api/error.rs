use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    /// The request was superseded or its owner was torn down before the
    /// result arrived. Not a failure: callers discard the result and
    /// surface nothing to the consumer.
    #[error("Lookup cancelled")]
    Cancelled,

    #[error("Lookup endpoint not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl LookupError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            404 => LookupError::NotFound(truncated),
            500..=599 => LookupError::ServerError(truncated),
            code => LookupError::RequestFailed {
                status: code,
                body: truncated,
            },
        }
    }

    /// Cancellation is discarded silently, never stored as consumer error.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LookupError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        let not_found = LookupError::from_status(reqwest::StatusCode::NOT_FOUND, "gone");
        assert!(matches!(not_found, LookupError::NotFound(_)));

        let server = LookupError::from_status(reqwest::StatusCode::BAD_GATEWAY, "boom");
        assert!(matches!(server, LookupError::ServerError(_)));

        let other = LookupError::from_status(reqwest::StatusCode::IM_A_TEAPOT, "short and stout");
        match other {
            LookupError::RequestFailed { status, body } => {
                assert_eq!(status, 418);
                assert_eq!(body, "short and stout");
            }
            _ => panic!("expected RequestFailed"),
        }
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(600);
        let err = LookupError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        let message = err.to_string();
        assert!(message.contains("truncated, 600 total bytes"));
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(LookupError::Cancelled.is_cancellation());
        assert!(!LookupError::NotFound("x".to_string()).is_cancellation());
    }
}
