//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when fetching status from a management API.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed or returned an unexpected status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The requested resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AdapterError {
    /// Whether retrying the same request later could plausibly succeed.
    ///
    /// Authentication, missing resources and bad configuration will not fix
    /// themselves between poll cycles.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdapterError::Http(_) | AdapterError::Connection(_) | AdapterError::Timeout
        )
    }
}

#[cfg(feature = "anzo")]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(AdapterError::Timeout.is_transient());
        assert!(AdapterError::Connection("refused".into()).is_transient());
        assert!(AdapterError::Http("502".into()).is_transient());
        assert!(!AdapterError::Auth("bad".into()).is_transient());
        assert!(!AdapterError::NotFound("gm".into()).is_transient());
        assert!(!AdapterError::Parse("eof".into()).is_transient());
    }

    #[test]
    fn display_messages() {
        assert_eq!(AdapterError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            AdapterError::Auth("Invalid credentials".into()).to_string(),
            "Authentication failed: Invalid credentials"
        );
    }
}
