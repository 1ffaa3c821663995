//! Error types for roost-session

use thiserror::Error;

/// Result type alias using roost-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the session and persistence layer.
///
/// Backend wire errors never surface here: the session finalizes the
/// draft with the error text instead of propagating.
#[derive(Error, Debug)]
pub enum Error {
    /// Store I/O failed
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store document failed to (de)serialize
    #[error("Store document error: {0}")]
    Json(#[from] serde_json::Error),

    /// Conversation id is unknown to the store
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// Submit was attempted without a model selected
    #[error("No model selected")]
    NoModelSelected,

    /// A session is already streaming into this conversation
    #[error("A generation is already in flight for this conversation")]
    SessionActive,
}

impl Error {
    /// Whether this error maps to a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
