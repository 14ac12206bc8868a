use std::fmt;

// Domain-level errors for arena event handling.
#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    PlayerNotFound(String),
    MalformedPayload(String),
    StoreUnavailable(String),
    DeadlineExceeded,
}

impl GameError {
    // Text sent back to the originating connection.
    pub fn client_message(&self) -> String {
        match self {
            GameError::PlayerNotFound(_) => "Player not found".to_string(),
            GameError::MalformedPayload(reason) => format!("Invalid payload: {reason}"),
            GameError::StoreUnavailable(_) => "storage unavailable".to_string(),
            GameError::DeadlineExceeded => "request timed out".to_string(),
        }
    }
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::PlayerNotFound(name) => write!(f, "player not found: {name}"),
            GameError::MalformedPayload(reason) => write!(f, "malformed payload: {reason}"),
            GameError::StoreUnavailable(reason) => write!(f, "store unavailable: {reason}"),
            GameError::DeadlineExceeded => write!(f, "event deadline exceeded"),
        }
    }
}

impl std::error::Error for GameError {}

// Delivery failures reported by the transport port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    // The remote endpoint no longer exists.
    Gone,
    Failed(String),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Gone => write!(f, "connection gone"),
            SendError::Failed(reason) => write!(f, "send failed: {reason}"),
        }
    }
}

impl std::error::Error for SendError {}
