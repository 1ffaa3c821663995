//! Transport abstraction for opening frame streams

use async_trait::async_trait;
use roost_stream::{BackendClient, ChatRequest, FrameStream};

/// Seam between the session loop and the backend: anything that can
/// turn a chat request into a stream of frames. Lets tests drive a
/// session from a fixture stream without a network.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open a streaming chat call
    async fn stream_chat(&self, request: &ChatRequest) -> roost_stream::Result<FrameStream>;
}

#[async_trait]
impl ChatTransport for BackendClient {
    async fn stream_chat(&self, request: &ChatRequest) -> roost_stream::Result<FrameStream> {
        BackendClient::stream_chat(self, request).await
    }
}
