//! Session event and status types

use roost_stream::ChatMessage;
use serde::{Deserialize, Serialize};

/// Status of one in-flight generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No request issued yet
    Idle,
    /// User submitted; outbound request not yet issued
    Sending,
    /// Request issued; no frame received yet
    Waiting,
    /// Frames arriving
    Streaming,
    /// Stream end with no error frame observed
    Completed,
    /// Explicit user cancellation
    Stopped,
    /// Transport failure or explicit error frame
    Errored,
}

impl SessionStatus {
    /// Whether the session has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Stopped | SessionStatus::Errored
        )
    }
}

/// Events emitted while a session runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Outbound request is being issued
    Sending,
    /// Request issued, waiting for the first frame
    Waiting,
    /// First frame received
    Streaming,
    /// The conversation was persisted for the first time and got an id
    ConversationCreated { id: String },
    /// Draft content changed (full combined text, not a delta)
    DraftUpdate { content: String },
    /// Stream ended normally; message finalized
    Completed { message: ChatMessage },
    /// User cancelled; partial content preserved
    Stopped { message: ChatMessage },
    /// Transport failure or backend error frame
    Errored { message: ChatMessage },
    /// The final persistence write failed even after a retry
    PersistFailed { error: String },
}

impl SessionEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::Completed { .. }
                | SessionEvent::Stopped { .. }
                | SessionEvent::Errored { .. }
        )
    }
}
