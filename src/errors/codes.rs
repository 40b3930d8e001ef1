use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Invalid filter or settings combination
    ConstructionError,

    /// Payload format without a decoder
    UnsupportedFormat,

    /// Connection, TLS or timeout failure
    TransportError,

    /// Non-success HTTP status from Overpass
    HttpError,

    /// Response body could not be decoded
    DecodeError,

    /// Storage listing failure
    StorageError,

    /// Zone or quadkey absent from the store
    NotFound,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstructionError => write!(f, "CONSTRUCTION_ERROR"),
            Self::UnsupportedFormat => write!(f, "UNSUPPORTED_FORMAT"),
            Self::TransportError => write!(f, "TRANSPORT_ERROR"),
            Self::HttpError => write!(f, "HTTP_ERROR"),
            Self::DecodeError => write!(f, "DECODE_ERROR"),
            Self::StorageError => write!(f, "STORAGE_ERROR"),
            Self::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

impl ErrorCode {
    /// Process exit status used by the command line front end
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConstructionError => 2,
            Self::UnsupportedFormat => 3,
            Self::TransportError => 4,
            Self::HttpError => 5,
            Self::DecodeError => 6,
            Self::StorageError => 7,
            Self::NotFound => 8,
        }
    }
}
