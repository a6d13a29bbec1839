//! Error types for the sync engine.

use mailmirror_imap::Uid;
use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection port failed; propagated unchanged.
    #[error("IMAP error: {0}")]
    Connection(#[from] mailmirror_imap::Error),

    /// A requested body part never arrived, even after retrying.
    #[error("Server never returned part {part} of message {uid}")]
    MissingProtocolData {
        /// Message the part belongs to.
        uid: Uid,
        /// IMAP part number.
        part: String,
    },

    /// The server's answers contradict each other or the cached state.
    #[error("Inconsistent server state: {0}")]
    InconsistentServerState(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Body part could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] mailmirror_mime::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
