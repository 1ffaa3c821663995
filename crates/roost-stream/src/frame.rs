//! Newline-delimited chat frames and incremental line decoding

use serde::{Deserialize, Serialize};

/// One structural unit parsed from the backend's newline-delimited stream.
///
/// Mirrors the NDJSON chunks the backend emits for both its chat and
/// generate endpoints: content may arrive nested under `message` or at
/// the top level, and reasoning may arrive under any of three keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<FrameMessage>,
    /// Generate-endpoint style content fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Structured error reported by the backend mid-stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Backend-signaled completion
    #[serde(default)]
    pub done: bool,
}

/// Nested message payload inside a chat frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl ChatFrame {
    /// Incremental answer fragment. `message.content` takes precedence
    /// over the top-level `response` fallback.
    pub fn content(&self) -> &str {
        if let Some(ref msg) = self.message {
            if let Some(ref content) = msg.content {
                return content;
            }
        }
        self.response.as_deref().unwrap_or("")
    }

    /// Incremental reasoning fragment. Precedence: `message.thinking`,
    /// then top-level `thinking`, then `reasoning`.
    pub fn thinking(&self) -> &str {
        if let Some(ref msg) = self.message {
            if let Some(ref thinking) = msg.thinking {
                return thinking;
            }
        }
        self.thinking
            .as_deref()
            .or(self.reasoning.as_deref())
            .unwrap_or("")
    }

    /// Build a frame carrying only an answer fragment (test and relay fixtures)
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            message: Some(FrameMessage {
                role: Some("assistant".to_string()),
                content: Some(content.into()),
                thinking: None,
            }),
            ..Default::default()
        }
    }
}

/// Splits an arbitrary byte stream into newline-delimited frames.
///
/// Tolerates frames split across network chunks by retaining the
/// trailing partial line (as raw bytes, so multi-byte characters split
/// mid-chunk survive). A line that fails structural parsing is dropped
/// silently; the stream must not halt on one malformed line.
#[derive(Debug, Default)]
pub struct LineFrameDecoder {
    buffer: Vec<u8>,
}

impl LineFrameDecoder {
    /// Create a new decoder with an empty carry-over buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and emit all complete lines as parsed frames,
    /// in the exact order they were received.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ChatFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = parse_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Attempt to parse any remaining buffered text as one final frame
    pub fn finish(&mut self) -> Option<ChatFrame> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<ChatFrame> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<ChatFrame>(text) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::debug!("dropping malformed frame: {}", e);
            None
        }
    }
}
