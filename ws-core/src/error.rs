use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use thiserror::Error;

/// Transport-neutral classification of a [`WsError`].
///
/// A request layer maps these onto RPC status codes or HTTP statuses; the
/// core never does that mapping itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    Internal,
    Unknown,
}

#[derive(Error, Debug)]
pub enum WsError {
    /// Malformed spec or a definition the orchestrator rejected.
    Validation(String),
    NotFound(String),
    AlreadyExists(String),
    /// System configuration is missing something the compiler needs.
    InvalidConfiguration(String),
    /// A resource document could not be assembled or serialized.
    Assembly(String),
    Unknown(String),
    Serialization(String),
    Io(#[from] std::io::Error),
    Other(#[from] anyhow::Error),
}

impl Display for WsError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            WsError::Validation(s) => write!(f, "Validation error: {}", s),
            WsError::NotFound(s) => write!(f, "Not found: {}", s),
            WsError::AlreadyExists(s) => write!(f, "Already exists: {}", s),
            WsError::InvalidConfiguration(s) => write!(f, "Invalid configuration: {}", s),
            WsError::Assembly(s) => write!(f, "Manifest assembly failed: {}", s),
            WsError::Unknown(s) => write!(f, "{}", s),
            WsError::Serialization(s) => write!(f, "Serialization error: {}", s),
            WsError::Io(e) => write!(f, "I/O error: {}", e),
            WsError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl WsError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WsError::Validation(_) => ErrorCode::InvalidArgument,
            WsError::NotFound(_) => ErrorCode::NotFound,
            WsError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            WsError::InvalidConfiguration(_) => ErrorCode::FailedPrecondition,
            WsError::Assembly(_) | WsError::Serialization(_) | WsError::Io(_) => {
                ErrorCode::Internal
            }
            WsError::Unknown(_) | WsError::Other(_) => ErrorCode::Unknown,
        }
    }

    /// Whether the message is safe to show to the caller verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::InvalidArgument | ErrorCode::NotFound | ErrorCode::AlreadyExists
        )
    }
}

impl From<serde_yaml_ng::Error> for WsError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        WsError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for WsError {
    fn from(err: serde_json::Error) -> Self {
        WsError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WsError>;
