//! Core types for conversations and the backend wire contract

use serde::{Deserialize, Serialize};

/// Message roles as they appear in stored conversations.
/// `system` exists only on the wire, never in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message in a conversation.
///
/// Assistant content may embed a reasoning segment using the
/// `<think>…</think>` convention; it is stored as raw combined text and
/// split only at render time, never before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: String,
    /// Model that produced this message (assistant messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Wall-clock generation time in seconds, set once a generation
    /// completed; absent if aborted before any timing baseline existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gen_seconds: Option<f64>,
    /// Marks the single in-flight draft message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
}

impl ChatMessage {
    fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Self::new_id(),
            role: ChatRole::User,
            content: content.into(),
            created_at: Self::now(),
            model: None,
            gen_seconds: None,
            partial: None,
        }
    }

    /// Create an empty in-flight assistant draft
    pub fn assistant_draft(model: impl Into<String>) -> Self {
        Self {
            id: Self::new_id(),
            role: ChatRole::Assistant,
            content: String::new(),
            created_at: Self::now(),
            model: Some(model.into()),
            gen_seconds: None,
            partial: Some(true),
        }
    }

    /// Whether this is the in-flight draft
    pub fn is_partial(&self) -> bool {
        self.partial.unwrap_or(false)
    }
}

/// A durable conversation: ordered message list plus metadata.
/// The id is assigned on first persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Maximum length of a derived conversation title
const TITLE_MAX_CHARS: usize = 60;

impl Conversation {
    /// Derive a list title from the first user message, newlines
    /// flattened and truncated to a fixed length
    pub fn title(&self) -> String {
        let first = self
            .messages
            .iter()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        if first.is_empty() {
            return "Chat".to_string();
        }
        first
            .replace('\n', " ")
            .chars()
            .take(TITLE_MAX_CHARS)
            .collect()
    }
}

/// List entry: id plus derived title only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
}

/// One message as sent to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Chat request body for the backend's streaming endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    /// Always forced to true before the request leaves this crate
    pub stream: bool,
}

/// One available model as reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Per-model metadata consumed for usage estimates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub context_length: Option<u64>,
}
