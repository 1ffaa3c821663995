//! Streaming chat relay: byte-level passthrough from the backend to
//! the client with no parsing or buffering on this hop

use axum::{
    Json,
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde_json::Value;

use crate::{error::ApiError, server::AppState};

/// Relay one chat request. The body is forwarded as-is with `stream`
/// forced on; the newline-delimited response bytes flow straight
/// through. When the client disconnects, axum drops the response body,
/// which drops the upstream call and cancels the generation.
pub async fn chat(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let upstream = match state.client.chat_passthrough(body).await {
        Ok(upstream) => upstream,
        Err(e) => return ApiError::from_backend(e).into_response(),
    };

    let mut bytes = upstream.bytes_stream();
    let body = Body::from_stream(async_stream::stream! {
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => yield Ok::<_, std::convert::Infallible>(chunk),
                Err(e) => {
                    // Headers are already out; end the stream and let
                    // the client finalize from what it received
                    tracing::debug!("upstream stream ended early: {}", e);
                    break;
                }
            }
        }
    });

    (
        [
            (header::CONTENT_TYPE, "application/x-ndjson"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}
