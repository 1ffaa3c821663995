//! Error types for roost-stream

use thiserror::Error;

/// Result type alias using roost-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the inference backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (no response from the backend). Body decode
    /// failures surface here too; reqwest wraps them.
    #[error("Cannot reach backend: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a structured error payload
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Non-success status with no usable error body. The message is a
    /// human-readable hint rather than a raw status code.
    #[error("{hint}")]
    Crashed { status: u16, hint: String },
}

impl Error {
    /// Create a rejection error from the upstream status and error body
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create a crash-heuristic error for a non-success status with no
    /// parseable error body
    pub fn crashed(status: u16) -> Self {
        let hint = if status == 500 {
            "Backend returned 500 (Internal Server Error). It likely crashed \
             (e.g. a CUDA error). Restart the inference backend and try again."
                .to_string()
        } else {
            format!("Backend request failed with status {status} and no error body")
        };
        Self::Crashed { status, hint }
    }

    /// Upstream HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rejected { status, .. } | Error::Crashed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error means the backend never produced a response
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_))
    }
}
