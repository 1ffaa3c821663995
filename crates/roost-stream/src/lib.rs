//! roost-stream: wire-level streaming client for a local inference backend
//!
//! This crate owns everything that touches the backend's byte stream:
//! newline-delimited frame decoding, reasoning/answer channel splitting,
//! the HTTP client, and bounded context-window assembly.

pub mod client;
pub mod error;
pub mod frame;
pub mod split;
pub mod types;
pub mod window;

pub use client::{BackendClient, FrameStream};
pub use error::{Error, Result};
pub use frame::{ChatFrame, LineFrameDecoder};
pub use split::{ChannelSplit, split_channels, wrap_reasoning};
pub use types::*;
