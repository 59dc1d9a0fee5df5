//! Session resolution errors.

use thiserror::Error;

/// Failures while preparing a connection.
///
/// The connection manager treats every variant the same way: the attempt is
/// abandoned and the reconnect path is taken.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport-level HTTP failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code.
        status: u16,
    },
    /// The landing page set no `ttwid` cookie.
    #[error("landing page did not set a ttwid cookie")]
    MissingCookie,
    /// The room page did not contain a room id.
    #[error("no room id found on the page for live id {0}")]
    MissingRoomId(String),
    /// The signer failed or produced nothing.
    #[error("signer failed: {0}")]
    Signer(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let err = SessionError::Status {
            url: "https://live.example/123".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "https://live.example/123 returned HTTP 503");
    }

    #[test]
    fn missing_room_display() {
        let err = SessionError::MissingRoomId("261378947940".into());
        assert!(err.to_string().contains("261378947940"));
    }
}
