//! Client errors.

use livecast_core::LiveIdError;
use livecast_session::SessionError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Why a session could not be started or a connection attempt failed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `start` was given a bad live id.
    #[error(transparent)]
    InvalidLiveId(#[from] LiveIdError),
    /// Cookie, room id or signature could not be obtained.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The handshake request could not be built.
    #[error("invalid push request: {0}")]
    Request(String),
    /// The WebSocket handshake failed.
    #[error("push connection failed: {0}")]
    Transport(#[source] Box<tungstenite::Error>),
}

impl From<tungstenite::Error> for ClientError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Transport(Box::new(e))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
