//! Router assembly and shared state

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use roost_stream::BackendClient;
use tower_http::trace::TraceLayer;

use crate::{config::Config, history, history::FsTranscriptStore, models, relay};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: BackendClient,
    pub store: Arc<FsTranscriptStore>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = FsTranscriptStore::open(config.history_dir())?;
        let client = BackendClient::new(&config.backend_url);
        Ok(Self {
            config: Arc::new(config),
            client,
            store: Arc::new(store),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/config", get(models::get_config))
        .route("/api/models", get(models::list_models))
        .route("/api/model-info", get(models::model_info))
        .route("/api/chat", post(relay::chat))
        .route("/api/history", get(history::list).post(history::create))
        .route(
            "/api/history/{id}",
            get(history::get).put(history::update).delete(history::remove),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let backend = state.config.backend_url.clone();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(
        "roost listening on http://localhost:{} (backend: {})",
        port,
        backend
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::{Request, StatusCode};
    use roost_stream::{ChatMessage, Conversation};
    use tower::util::ServiceExt;

    fn test_state(dir: &std::path::Path) -> AppState {
        let config = Config {
            data_dir: Some(dir.to_path_buf()),
            default_model: "llama3".into(),
            ..Default::default()
        };
        AppState::new(config).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_config_endpoint_reports_settings() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::get("/api/config")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["defaultModel"], "llama3");
        assert_eq!(json["maxMessagesInContext"], 0);
        assert_eq!(json["backendUrl"], "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_history_crud_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let conversation = Conversation {
            model: "llama3".into(),
            messages: vec![ChatMessage::user("hello over http")],
            ..Default::default()
        };
        let response = router(state.clone())
            .oneshot(
                Request::post("/api/history")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(
                        serde_json::to_string(&conversation).unwrap(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();

        let response = router(state.clone())
            .oneshot(
                Request::get(format!("/api/history/{id}"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert_eq!(doc["messages"][0]["content"], "hello over http");

        let response = router(state.clone())
            .oneshot(
                Request::delete(format!("/api/history/{id}"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(state)
            .oneshot(
                Request::get(format!("/api/history/{id}"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // -- chat relay against a stub backend --

    /// Bind a stub backend on an ephemeral port and return its base URL
    async fn spawn_backend(stub: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn state_with_backend(dir: &std::path::Path, backend_url: String) -> AppState {
        let config = Config {
            backend_url,
            data_dir: Some(dir.to_path_buf()),
            ..Default::default()
        };
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_chat_relay_forces_stream_and_passes_ndjson_through() {
        use axum::routing::post;

        let ndjson = "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n\
                      {\"message\":{\"content\":\"lo\"},\"done\":true}\n";
        let seen: std::sync::Arc<std::sync::Mutex<Option<serde_json::Value>>> =
            std::sync::Arc::new(std::sync::Mutex::new(None));
        let captured = std::sync::Arc::clone(&seen);
        let stub = Router::new().route(
            "/api/chat",
            post(move |axum::Json(body): axum::Json<serde_json::Value>| {
                let captured = std::sync::Arc::clone(&captured);
                async move {
                    *captured.lock().unwrap() = Some(body);
                    (
                        [(axum::http::header::CONTENT_TYPE, "application/x-ndjson")],
                        ndjson,
                    )
                }
            }),
        );
        let backend_url = spawn_backend(stub).await;

        let dir = tempfile::tempdir().unwrap();
        let app = router(state_with_backend(dir.path(), backend_url));
        let response = app
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(
                        r#"{"model":"llama3","messages":[],"stream":false}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .unwrap(),
            "application/x-ndjson"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), ndjson);

        // The forwarded body reached the backend with stream forced on
        let forwarded = seen.lock().unwrap().take().unwrap();
        assert_eq!(forwarded["stream"], serde_json::json!(true));
        assert_eq!(forwarded["model"], "llama3");
    }

    #[tokio::test]
    async fn test_chat_relay_maps_rejection_to_error_json() {
        use axum::routing::post;

        let stub = Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    axum::Json(serde_json::json!({ "error": "model 'missing' not found" })),
                )
            }),
        );
        let backend_url = spawn_backend(stub).await;

        let dir = tempfile::tempdir().unwrap();
        let app = router(state_with_backend(dir.path(), backend_url));
        let response = app
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"model":"missing","messages":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Upstream status preserved, backend message verbatim
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "model 'missing' not found");
    }

    #[tokio::test]
    async fn test_chat_relay_crash_heuristic_on_bare_500() {
        use axum::routing::post;

        let stub = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "segfault") }),
        );
        let backend_url = spawn_backend(stub).await;

        let dir = tempfile::tempdir().unwrap();
        let app = router(state_with_backend(dir.path(), backend_url));
        let response = app
            .oneshot(
                Request::post("/api/chat")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"model":"llama3","messages":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("Restart the inference backend")
        );
    }

    #[tokio::test]
    async fn test_model_info_requires_model_param() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::get("/api/model-info")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing model");
    }
}
