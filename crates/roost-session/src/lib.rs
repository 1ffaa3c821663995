//! roost-session: streaming transcript reconstruction engine
//!
//! Owns one in-flight generation at a time: it reads frames from the
//! backend, reassembles the reasoning and answer channels into a draft
//! message, drives the session state machine, schedules debounced
//! persistence, and extracts file artifacts from the growing answer.

pub mod artifacts;
pub mod error;
pub mod events;
pub mod registry;
pub mod session;
pub mod store;
pub mod transport;

pub use artifacts::{ArtifactExtractor, NodeKind, TreeNode, VirtualFile};
pub use error::{Error, Result};
pub use events::{SessionEvent, SessionStatus};
pub use registry::SessionRegistry;
pub use session::{SessionConfig, SessionHandle, SharedMessages, StreamSession};
pub use store::TranscriptStore;
pub use transport::ChatTransport;
