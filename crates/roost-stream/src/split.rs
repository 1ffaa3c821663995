//! Reasoning/answer channel separation
//!
//! Assistant content multiplexes two logical text streams inside one
//! delimited field: an optional reasoning segment wrapped in a single
//! well-known tag pair, followed by the answer. Splitting is a pure
//! function of the full accumulated text — callers always pass the
//! whole buffer, never a delta — so reconstruction is insensitive to
//! how token boundaries fell.

use std::sync::LazyLock;

use regex::Regex;

/// Opening reasoning delimiter
pub const THINK_OPEN: &str = "<think>";
/// Closing reasoning delimiter
pub const THINK_CLOSE: &str = "</think>";

/// First complete tag pair, case-insensitive, non-greedy across lines
static THINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>(.*?)</think>").expect("valid regex"));

/// The two logical channels recovered from one combined text buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSplit {
    /// Visible answer text with the tagged span removed and trimmed
    pub answer: String,
    /// Trimmed inner text of the first delimited span, empty if absent
    pub reasoning: String,
}

/// Separate the reasoning segment from the answer segment.
///
/// Only the first complete tag pair is recognized (case-insensitive).
/// An unterminated opening tag does not match; the text stays in the
/// answer channel untouched.
pub fn split_channels(text: &str) -> ChannelSplit {
    let Some(captures) = THINK_PATTERN.captures(text) else {
        return ChannelSplit {
            answer: text.to_string(),
            reasoning: String::new(),
        };
    };
    let span = captures.get(0).map(|m| m.range()).unwrap_or(0..0);
    let reasoning = captures
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    let mut answer = String::with_capacity(text.len() - span.len());
    answer.push_str(&text[..span.start]);
    answer.push_str(&text[span.end..]);

    ChannelSplit {
        answer: answer.trim().to_string(),
        reasoning,
    }
}

/// Compose the combined draft content from the two channels.
///
/// Inverse of [`split_channels`]: empty reasoning yields the answer
/// unchanged, otherwise the reasoning is wrapped in the delimiter pair
/// and prepended.
pub fn wrap_reasoning(reasoning: &str, answer: &str) -> String {
    let trimmed = reasoning.trim();
    if trimmed.is_empty() {
        answer.to_string()
    } else {
        format!("{THINK_OPEN}{trimmed}{THINK_CLOSE}\n\n{answer}")
    }
}
