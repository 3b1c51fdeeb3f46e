//! Bus arrival error types

use thiserror::Error;

/// Errors that can occur while talking to the bus arrival service
///
/// A non-zero `resultCode` reported by the API is not an error at this level;
/// it is captured as fetcher state (see [`crate::ApiFault`]).
#[derive(Debug, Error)]
pub enum BusError {
    /// Connection to the arrival service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP request returned a non-success status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Failed to parse the XML document returned by the service
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Request timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// A configured time window could not be parsed as `HH:MM`
    #[error("Invalid time window: {0}")]
    InvalidTimeWindow(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl BusError {
    /// Returns true if the next polling cycle may succeed where this one failed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::RequestFailed(_) | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(BusError::ConnectionFailed("refused".to_string()).is_retryable());
        assert!(BusError::RequestFailed("HTTP 502".to_string()).is_retryable());
        assert!(BusError::Timeout { timeout_secs: 10 }.is_retryable());
    }

    #[test]
    fn test_non_retryable_errors() {
        assert!(!BusError::ParseError("eof".to_string()).is_retryable());
        assert!(!BusError::InvalidTimeWindow("25:00".to_string()).is_retryable());
        assert!(!BusError::ConfigurationError("api_key".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = BusError::Timeout { timeout_secs: 10 };
        assert!(err.to_string().contains("10"));

        let err = BusError::InvalidTimeWindow("9시".to_string());
        assert!(err.to_string().contains("9시"));
    }
}
