//! Durable conversation storage abstraction

use async_trait::async_trait;
use roost_stream::{Conversation, ConversationSummary};

use crate::error::Result;

/// Durable representation of conversations, keyed by an opaque id.
///
/// `create` and `update` are full-document replacements (last writer
/// wins); the only caller performing repeated updates during one
/// generation is the owning session, so no cross-writer race exists in
/// the intended usage. History is never rewritten except through the
/// single in-progress draft message carried inside the document.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Persist a new conversation. Assigns and returns an id when the
    /// document carries none.
    async fn create(&self, conversation: &Conversation) -> Result<String>;

    /// Fetch a conversation by id
    async fn get(&self, id: &str) -> Result<Conversation>;

    /// Replace a conversation document wholesale
    async fn update(&self, id: &str, conversation: &Conversation) -> Result<()>;

    /// Remove a conversation
    async fn delete(&self, id: &str) -> Result<()>;

    /// List all conversations as id plus derived title, newest first
    async fn list(&self) -> Result<Vec<ConversationSummary>>;
}
