//! Config, model listing, and model metadata endpoints

use axum::{
    Json,
    extract::{Query, State},
};
use roost_stream::{ModelEntry, ModelInfo};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, server::AppState};

/// Client-facing configuration snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub backend_url: String,
    pub default_system_prompt: String,
    pub default_model: String,
    pub max_messages_in_context: usize,
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        backend_url: state.config.backend_url.clone(),
        default_system_prompt: state.config.default_system_prompt.clone(),
        default_model: state.config.default_model.clone(),
        max_messages_in_context: state.config.max_messages_in_context,
    })
}

pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelEntry>>, ApiError> {
    Ok(Json(state.client.list_models().await?))
}

#[derive(Debug, Deserialize)]
pub struct ModelInfoQuery {
    pub model: Option<String>,
}

pub async fn model_info(
    State(state): State<AppState>,
    Query(query): Query<ModelInfoQuery>,
) -> Result<Json<ModelInfo>, ApiError> {
    let model = query
        .model
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing model"))?;
    Ok(Json(state.client.model_info(&model).await?))
}
