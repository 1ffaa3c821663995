//! HTTP client for the inference backend

use std::pin::Pin;
use std::sync::LazyLock;

use async_stream::stream;
use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use tokio_stream::Stream;

use crate::{
    error::{Error, Result},
    frame::{ChatFrame, LineFrameDecoder},
    types::{ChatRequest, ModelEntry, ModelInfo},
};

/// A stream of parsed chat frames
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<ChatFrame>> + Send>>;

/// Client for the local inference backend's HTTP API
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new client for the given base URL (trailing slash stripped)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Backend base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a streaming chat call and decode the response into frames.
    ///
    /// The stream flag is forced on regardless of the caller's request.
    /// The frame stream ends when the backend closes the connection;
    /// a transport failure mid-stream surfaces as one final `Err` item.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<FrameStream> {
        let mut request = request.clone();
        request.stream = true;

        let url = format!("{}/api/chat", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let mut bytes = response.bytes_stream();
        Ok(Box::pin(stream! {
            let mut decoder = LineFrameDecoder::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(bytes) => {
                        for frame in decoder.feed(&bytes) {
                            yield Ok(frame);
                        }
                    }
                    Err(e) => {
                        yield Err(Error::Http(e));
                        return;
                    }
                }
            }
            if let Some(frame) = decoder.finish() {
                yield Ok(frame);
            }
        }))
    }

    /// Open a streaming chat call and hand back the raw response for
    /// byte-level passthrough (used by the relay, which must not parse
    /// or buffer the body). The stream flag is forced on. A non-success
    /// initial response is converted to a structured error.
    pub async fn chat_passthrough(&self, mut body: serde_json::Value) -> Result<reqwest::Response> {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("stream".to_string(), serde_json::Value::Bool(true));
        }

        let url = format!("{}/api/chat", self.base_url);
        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response)
    }

    /// List the models the backend has available
    pub async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelEntry {
                name: m.name,
                modified: m.modified_at,
            })
            .collect())
    }

    /// Fetch per-model metadata and extract the context-window size
    pub async fn model_info(&self, model: &str) -> Result<ModelInfo> {
        let url = format!("{}/api/show", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: serde_json::Value = response.json().await?;
        Ok(ModelInfo {
            context_length: parse_context_length(&body),
        })
    }
}

/// Classify a non-success upstream response: a structured `{error}`
/// body is a clean rejection surfaced verbatim; anything else is
/// treated as a backend crash and gets a human-readable hint.
async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return Error::rejected(status, message);
        }
    }
    Error::crashed(status)
}

static NUM_CTX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"num_ctx\s+(\d+)").expect("valid regex"));

/// Extract the context-window size from a model-show payload.
///
/// Checked in order: a top-level `num_ctx`, a `parameters` object with
/// a numeric `num_ctx`, or a `num_ctx <n>` line inside a `parameters`
/// string (the backend reports it differently across versions).
pub fn parse_context_length(body: &serde_json::Value) -> Option<u64> {
    if let Some(n) = body.get("num_ctx").and_then(|v| v.as_u64()) {
        return Some(n);
    }
    match body.get("parameters") {
        Some(serde_json::Value::Object(params)) => {
            params.get("num_ctx").and_then(|v| v.as_u64())
        }
        Some(serde_json::Value::String(params)) => NUM_CTX_PATTERN
            .captures(params)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    modified_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = BackendClient::new("http://localhost:11434/");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    // -- num_ctx parsing variants --

    #[test]
    fn test_context_length_top_level() {
        let body = serde_json::json!({ "num_ctx": 8192 });
        assert_eq!(parse_context_length(&body), Some(8192));
    }

    #[test]
    fn test_context_length_parameters_object() {
        let body = serde_json::json!({ "parameters": { "num_ctx": 4096 } });
        assert_eq!(parse_context_length(&body), Some(4096));
    }

    #[test]
    fn test_context_length_parameters_string() {
        let body = serde_json::json!({
            "parameters": "stop \"<|end|>\"\nnum_ctx 32768\ntemperature 0.7"
        });
        assert_eq!(parse_context_length(&body), Some(32768));
    }

    #[test]
    fn test_context_length_absent() {
        let body = serde_json::json!({ "parameters": "temperature 0.7" });
        assert_eq!(parse_context_length(&body), None);
        assert_eq!(parse_context_length(&serde_json::json!({})), None);
    }

    #[test]
    fn test_top_level_wins_over_parameters() {
        let body = serde_json::json!({
            "num_ctx": 1024,
            "parameters": { "num_ctx": 4096 }
        });
        assert_eq!(parse_context_length(&body), Some(1024));
    }
}
