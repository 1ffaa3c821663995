//! Conversation history: one JSON document per conversation on disk,
//! plus the CRUD handlers over it

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
};
use roost_session::{Error, Result, TranscriptStore};
use roost_stream::{Conversation, ConversationSummary};
use serde_json::{Value, json};

use crate::{error::ApiError, server::AppState};

/// Filesystem-backed store: `<history_dir>/<id>.json`, pretty-printed,
/// replaced wholesale on every update
#[derive(Debug)]
pub struct FsTranscriptStore {
    dir: PathBuf,
}

impl FsTranscriptStore {
    /// Open (and create if needed) the history directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, id: &str) -> Result<PathBuf> {
        // Ids are uuids we minted; anything path-like is foreign
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn write(&self, id: &str, conversation: &Conversation) -> Result<()> {
        let mut doc = conversation.clone();
        doc.id = id.to_string();
        let content = serde_json::to_string_pretty(&doc)?;
        fs::write(self.path(id)?, content)?;
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for FsTranscriptStore {
    async fn create(&self, conversation: &Conversation) -> Result<String> {
        let id = if conversation.id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            conversation.id.clone()
        };
        self.write(&id, conversation)?;
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Conversation> {
        let path = self.path(id)?;
        if !path.exists() {
            return Err(Error::NotFound(id.to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn update(&self, id: &str, conversation: &Conversation) -> Result<()> {
        if !self.path(id)?.exists() {
            return Err(Error::NotFound(id.to_string()));
        }
        self.write(id, conversation)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path(id)?;
        if !path.exists() {
            return Err(Error::NotFound(id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Most recently written conversations first. Documents that fail
    /// to parse still show up, titled with the fallback, so a corrupt
    /// file never hides the rest of the history.
    async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let mut entries: Vec<(ConversationSummary, SystemTime)> = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(id) = name.strip_suffix(".json") else {
                continue;
            };

            let title = fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<Conversation>(&content).ok())
                .map(|c| c.title())
                .unwrap_or_else(|| "Chat".to_string());
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            entries.push((
                ConversationSummary {
                    id: id.to_string(),
                    title,
                },
                modified,
            ));
        }

        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(entries.into_iter().map(|(summary, _)| summary).collect())
    }
}

// --- handlers ---

pub async fn list(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<ConversationSummary>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<Conversation>, ApiError> {
    Ok(Json(state.store.get(&id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(conversation): Json<Conversation>,
) -> std::result::Result<Json<Value>, ApiError> {
    let id = state.store.create(&conversation).await?;
    Ok(Json(json!({ "id": id })))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(conversation): Json<Conversation>,
) -> std::result::Result<Json<Value>, ApiError> {
    state.store.update(&id, &conversation).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<Value>, ApiError> {
    state.store.delete(&id).await?;
    Ok(Json(json!({ "ok": true })))
}
