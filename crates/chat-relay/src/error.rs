//! Error types for the relay.

use thiserror::Error;

/// Errors that can abort a relay request.
///
/// Upstream rejections (non-success HTTP statuses) are deliberately absent:
/// they are returned as an [`UpstreamResponse`](crate::transport::UpstreamResponse)
/// so the caller can mirror the upstream status code.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Required configuration is missing or invalid.
    #[error("{0}")]
    Config(String),

    /// Every attempt failed before an HTTP response arrived.
    #[error("{message}")]
    Transport {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Message of the last underlying failure.
        message: String,
    },
}

impl RelayError {
    /// HTTP status the outer layer should answer with.
    pub fn status_code(&self) -> u16 {
        500
    }
}

/// A single failed attempt at the network layer.
///
/// Connection errors, timeouts and truncated responses all land here. An
/// HTTP response with an error status is not a `TransportFailure`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportFailure {
    /// Human readable cause, surfaced to the caller after the last attempt.
    pub message: String,
    /// Whether the failure was a timeout.
    pub timed_out: bool,
}

impl TransportFailure {
    /// Creates a failure from a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Marks this failure as a timeout.
    pub fn timeout(mut self) -> Self {
        self.timed_out = true;
        self
    }

    /// Network-layer failures are always worth another attempt.
    pub fn is_retryable(&self) -> bool {
        true
    }

    pub(crate) fn into_relay_error(self, attempts: u32) -> RelayError {
        RelayError::Transport {
            attempts,
            message: self.message,
        }
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        let failure = TransportFailure::new(err.to_string());
        if err.is_timeout() {
            failure.timeout()
        } else {
            failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message_is_verbatim() {
        let err = RelayError::Config("Missing OPENROUTER_API_KEY environment variable.".into());
        assert_eq!(
            err.to_string(),
            "Missing OPENROUTER_API_KEY environment variable."
        );
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_transport_error_surfaces_cause() {
        let err = TransportFailure::new("connection refused").into_relay_error(3);
        assert_eq!(err.to_string(), "connection refused");
        match err {
            RelayError::Transport { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("Expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn test_transport_failure_is_retryable() {
        assert!(TransportFailure::new("reset").is_retryable());
        assert!(TransportFailure::new("slow").timeout().is_retryable());
    }
}
