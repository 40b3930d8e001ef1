//! Error taxonomy shared by the query builder, the Overpass client and the
//! canvas index

pub mod codes;

pub use codes::ErrorCode;

use thiserror::Error;

/// Errors raised by skyway. None of them are retried.
#[derive(Debug, Error)]
pub enum SkywayError {
    /// Invalid filter or settings combination
    #[error("construction error: {0}")]
    Construction(String),

    /// Payload format the client cannot decode
    #[error("unsupported payload format: {0}")]
    UnsupportedFormat(String),

    /// Request never produced an HTTP response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Overpass answered with a non-success status
    #[error("Overpass API error: {status} - {body}")]
    Http { status: u16, body: String },

    /// Response body did not match the requested format
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Storage listing failed
    #[error("storage error at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not found: {0}")]
    NotFound(String),
}

impl SkywayError {
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction(message.into())
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Stable code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Construction(_) => ErrorCode::ConstructionError,
            Self::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            Self::Transport(_) => ErrorCode::TransportError,
            Self::Http { .. } => ErrorCode::HttpError,
            Self::Decode(_) => ErrorCode::DecodeError,
            Self::Storage { .. } => ErrorCode::StorageError,
            Self::NotFound(_) => ErrorCode::NotFound,
        }
    }
}

impl From<serde_json::Error> for SkywayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SkywayError>;
