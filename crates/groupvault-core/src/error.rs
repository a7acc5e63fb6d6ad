//! Error types for the archival core.

use thiserror::Error;

/// Errors that can occur in archival operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw capture record violated a structural assumption during
    /// normalization. The record should be logged and skipped.
    #[error("Malformed capture: {0}")]
    MalformedCapture(String),

    /// The display name embedded in a capture's `from` field did not
    /// match its author name. Indicates an unreliable upstream
    /// association; the record should be logged and skipped.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Raw-transport reconstruction failed. Recoverable per message by
    /// falling back to the source's own rendering.
    #[error("Render error: {0}")]
    Render(#[from] groupvault_mime::Error),

    /// Rendering hit an unsupported message shape.
    #[error("Unsupported message shape: {0}")]
    UnsupportedMessage(String),

    /// The archive holds no messages, so "latest" and pagination are
    /// undefined. Fatal for export.
    #[error("Archive contains no messages")]
    EmptyArchive,

    /// Configuration error (bad redaction rule file, bad export
    /// settings). Fatal for the current run.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation failed. Never retried by the core.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is recoverable per record during a batch run
    /// (skip the record or fall back) rather than fatal to the run.
    #[must_use]
    pub const fn is_per_record(&self) -> bool {
        matches!(
            self,
            Self::MalformedCapture(_)
                | Self::DataIntegrity(_)
                | Self::Render(_)
                | Self::UnsupportedMessage(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
