//! Bounded context-window assembly and token estimation

use crate::types::{ChatMessage, ChatRole, WireMessage};

/// Build the wire message list for a chat request: the system prompt
/// (if any) prepended to the most recent `window` messages. A window of
/// 0 means unbounded.
pub fn build_wire_messages(
    system_prompt: &str,
    messages: &[ChatMessage],
    window: usize,
) -> Vec<WireMessage> {
    let recent = in_window(messages, window);

    let mut wire = Vec::with_capacity(recent.len() + 1);
    let system = system_prompt.trim();
    if !system.is_empty() {
        wire.push(WireMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    for msg in recent {
        wire.push(WireMessage {
            role: match msg.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            }
            .to_string(),
            content: msg.content.clone(),
        });
    }
    wire
}

/// Approximate token count of the in-window request: accumulated
/// character count of the system prompt plus in-window message
/// contents, divided by 4. An approximation, not exact tokenization.
pub fn estimate_tokens(system_prompt: &str, messages: &[ChatMessage], window: usize) -> u64 {
    let mut chars = system_prompt.chars().count();
    for msg in in_window(messages, window) {
        chars += msg.content.chars().count();
    }
    ((chars as f64) / 4.0).round() as u64
}

fn in_window(messages: &[ChatMessage], window: usize) -> &[ChatMessage] {
    if window > 0 && messages.len() > window {
        &messages[messages.len() - window..]
    } else {
        messages
    }
}
