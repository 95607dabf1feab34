use std::error::Error as StdError;

use thiserror::Error;

/// Linecue's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Linecue's crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// Options that can never produce a valid session (bad durations, threshold, frame counts).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The script source could not be read or parsed.
    #[error("script error: {0}")]
    Script(String),

    /// The capture collaborator failed. Fatal for a session.
    #[error("capture failed: {0}")]
    Capture(String),

    /// The transcription collaborator failed. The session driver recovers from this.
    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub(crate) fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
