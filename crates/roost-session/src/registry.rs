//! Tracking of live sessions by conversation id

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    session::SessionHandle,
};

/// Live session handles keyed by conversation id.
///
/// Enforces the single-writer rule: at most one active generation per
/// conversation. Handles for finished sessions are pruned lazily on
/// access, so callers never observe a terminal handle as "active".
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under a conversation id. Fails if another
    /// session is still active for the same conversation.
    pub fn insert(&self, chat_id: impl Into<String>, handle: SessionHandle) -> Result<()> {
        let chat_id = chat_id.into();
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(&chat_id) {
            if existing.is_active() {
                return Err(Error::SessionActive);
            }
        }
        sessions.insert(chat_id, handle);
        Ok(())
    }

    /// Re-attach to a running session, e.g. after a view switched away
    /// and back. Returns `None` when no session is active for the id.
    pub fn attach(&self, chat_id: &str) -> Option<SessionHandle> {
        let mut sessions = self.sessions.lock();
        match sessions.get(chat_id) {
            Some(handle) if handle.is_active() => Some(handle.clone()),
            Some(_) => {
                sessions.remove(chat_id);
                None
            }
            None => None,
        }
    }

    /// Cancel the active session for a conversation, if any. Returns
    /// whether a session was told to stop.
    pub fn abort(&self, chat_id: &str) -> bool {
        match self.attach(chat_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop the handle for a conversation
    pub fn remove(&self, chat_id: &str) {
        self.sessions.lock().remove(chat_id);
    }

    /// Number of registered handles, active or not
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
