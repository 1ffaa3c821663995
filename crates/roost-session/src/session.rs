//! One in-flight generation: state machine, draft reconstruction, and
//! debounced persistence

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use roost_stream::{
    ChatMessage, ChatRequest, Conversation, FrameStream, window::build_wire_messages,
    wrap_reasoning,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    artifacts::{ArtifactExtractor, TreeNode, VirtualFile},
    error::{Error, Result},
    events::{SessionEvent, SessionStatus},
    store::TranscriptStore,
    transport::ChatTransport,
};

/// Shared ownership of a conversation's message array. The session is
/// the sole writer to the draft while streaming; view layers only read.
pub type SharedMessages = Arc<Mutex<Vec<ChatMessage>>>;

/// Fixed delay for coalescing streaming persistence writes
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(900);

/// Marker appended to the draft on user cancellation
const STOP_MARKER: &str = "Stopped";

/// Configuration captured at submit time. The system prompt is a
/// snapshot; later edits do not affect an in-flight generation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub system_prompt: String,
    /// Context window in messages; 0 = unbounded
    pub max_messages_in_context: usize,
    pub debounce: Duration,
}

impl SessionConfig {
    /// Create a config for the given model with defaults
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: String::new(),
            max_messages_in_context: 0,
            debounce: DEBOUNCE_INTERVAL,
        }
    }

    /// Set the system prompt snapshot
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the message window size
    pub fn with_window(mut self, window: usize) -> Self {
        self.max_messages_in_context = window;
        self
    }
}

/// A cloneable handle for observing and cancelling a running session.
///
/// All fields are `Arc`-wrapped, so cloning is cheap. The handle
/// outlives a conversation-view switch; re-attaching a view means
/// reading `messages()` again from a handle looked up by chat id.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: CancellationToken,
    pub(crate) status: Arc<Mutex<SessionStatus>>,
    pub(crate) chat_id: Arc<Mutex<Option<String>>>,
    pub(crate) messages: SharedMessages,
    pub(crate) assistant_msg_id: String,
    pub(crate) artifacts: Arc<Mutex<ArtifactExtractor>>,
    pub(crate) event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Cancel the generation. Idempotent: repeated calls have no
    /// additional effect.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Current state-machine position
    pub fn status(&self) -> SessionStatus {
        *self.status.lock()
    }

    /// Whether the session has not yet reached a terminal state
    pub fn is_active(&self) -> bool {
        !self.status().is_terminal()
    }

    /// Conversation id, once assigned by first persistence
    pub fn chat_id(&self) -> Option<String> {
        self.chat_id.lock().clone()
    }

    /// Id of the in-flight assistant draft
    pub fn assistant_msg_id(&self) -> &str {
        &self.assistant_msg_id
    }

    /// The shared message array this session mutates
    pub fn messages(&self) -> SharedMessages {
        Arc::clone(&self.messages)
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of the virtual files extracted from the answer so far
    pub fn virtual_files(&self) -> Vec<VirtualFile> {
        self.artifacts.lock().files()
    }

    /// Current virtual directory tree, if any files were extracted
    pub fn file_tree(&self) -> Option<TreeNode> {
        self.artifacts.lock().tree()
    }
}

/// Owns one in-flight generation: reads frames, reassembles the two
/// text channels into the draft message, drives the status state
/// machine, and schedules persistence.
pub struct StreamSession {
    config: SessionConfig,
    handle: SessionHandle,
    messages: SharedMessages,
    assistant_msg_id: String,
    answer: String,
    reasoning: String,
    started_at: Option<std::time::Instant>,
}

impl StreamSession {
    /// Validate and stage a user submission: pushes the user message
    /// and an empty assistant draft into the shared array.
    ///
    /// Fails if no model is selected or if the array already carries a
    /// draft (at most one partial message per conversation).
    pub fn submit(
        chat_id: Option<String>,
        messages: SharedMessages,
        user_text: impl Into<String>,
        config: SessionConfig,
    ) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(Error::NoModelSelected);
        }

        let draft = {
            let mut guard = messages.lock();
            if guard.iter().any(|m| m.is_partial()) {
                return Err(Error::SessionActive);
            }
            guard.push(ChatMessage::user(user_text));
            let draft = ChatMessage::assistant_draft(&config.model);
            guard.push(draft.clone());
            draft
        };

        let (event_tx, _) = broadcast::channel(256);
        let handle = SessionHandle {
            cancel: CancellationToken::new(),
            status: Arc::new(Mutex::new(SessionStatus::Idle)),
            chat_id: Arc::new(Mutex::new(chat_id)),
            messages: Arc::clone(&messages),
            assistant_msg_id: draft.id.clone(),
            artifacts: Arc::new(Mutex::new(ArtifactExtractor::new())),
            event_tx,
        };

        Ok(Self {
            config,
            handle,
            messages,
            assistant_msg_id: draft.id,
            answer: String::new(),
            reasoning: String::new(),
            started_at: None,
        })
    }

    /// Get a cloneable handle for this session
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Run the generation to a terminal state and return the finalized
    /// assistant message. Network and backend errors finalize the draft
    /// rather than propagate; there is no automatic retry of the
    /// generation itself.
    pub async fn run(
        mut self,
        transport: &dyn ChatTransport,
        store: &dyn TranscriptStore,
    ) -> ChatMessage {
        self.set_status(SessionStatus::Sending);
        self.emit(SessionEvent::Sending);

        // First persistence assigns the conversation id. Failure here is
        // non-fatal; the in-memory draft stays authoritative.
        if self.chat_id().is_none() {
            match store.create(&self.snapshot()).await {
                Ok(id) => {
                    *self.handle.chat_id.lock() = Some(id.clone());
                    self.emit(SessionEvent::ConversationCreated { id });
                }
                Err(e) => {
                    tracing::warn!("initial persistence failed: {}", e);
                }
            }
        }

        let request = self.build_request();
        self.started_at = Some(std::time::Instant::now());
        let cancel = self.handle.cancel.clone();

        let stream = tokio::select! {
            _ = cancel.cancelled() => {
                return self.finalize_stopped(store).await;
            }
            result = transport.stream_chat(&request) => match result {
                Ok(stream) => stream,
                Err(e) => {
                    return self.finalize_errored(e.to_string(), store).await;
                }
            }
        };

        self.set_status(SessionStatus::Waiting);
        self.emit(SessionEvent::Waiting);

        self.drive(stream, store).await
    }

    /// Cooperative loop over the frame stream, the debounce deadline,
    /// and the cancellation token. Frames are applied to the draft
    /// strictly in arrival order; the debounce coalesces to a single
    /// pending deadline so writes for one conversation never reorder.
    async fn drive(mut self, mut stream: FrameStream, store: &dyn TranscriptStore) -> ChatMessage {
        let mut save_deadline: Option<tokio::time::Instant> = None;
        let cancel = self.handle.cancel.clone();

        loop {
            let save_timer = async move {
                match save_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    return self.finalize_stopped(store).await;
                }
                _ = save_timer => {
                    save_deadline = None;
                    self.save_draft(store).await;
                }
                frame = stream.next() => match frame {
                    Some(Ok(frame)) => {
                        if self.status() == SessionStatus::Waiting {
                            self.set_status(SessionStatus::Streaming);
                            self.emit(SessionEvent::Streaming);
                        }
                        if let Some(error) = frame.error.as_deref() {
                            let content = format!("Error from model: {error}");
                            return self.finalize_errored(content, store).await;
                        }

                        self.reasoning.push_str(frame.thinking());
                        self.answer.push_str(frame.content());

                        let combined = self.joined();
                        if !combined.is_empty() {
                            self.handle.artifacts.lock().update(&self.answer);
                            self.with_draft(|draft| {
                                draft.content = combined.clone();
                                draft.partial = Some(true);
                            });
                            if save_deadline.is_none() {
                                save_deadline =
                                    Some(tokio::time::Instant::now() + self.config.debounce);
                            }
                            self.emit(SessionEvent::DraftUpdate { content: combined });
                        }
                    }
                    Some(Err(e)) => {
                        if self.handle.cancel.is_cancelled() {
                            return self.finalize_stopped(store).await;
                        }
                        return self.finalize_errored(e.to_string(), store).await;
                    }
                    None => {
                        return self.finalize_completed(store).await;
                    }
                }
            }
        }
    }

    // --- terminal transitions ---

    async fn finalize_completed(&mut self, store: &dyn TranscriptStore) -> ChatMessage {
        let content = self.joined();
        self.finalize(content, SessionStatus::Completed, store).await
    }

    async fn finalize_stopped(&mut self, store: &dyn TranscriptStore) -> ChatMessage {
        let combined = self.joined();
        let content = if combined.is_empty() {
            format!("_{STOP_MARKER}_")
        } else {
            format!("{combined}\n\n_{STOP_MARKER}_")
        };
        self.finalize(content, SessionStatus::Stopped, store).await
    }

    async fn finalize_errored(
        &mut self,
        content: String,
        store: &dyn TranscriptStore,
    ) -> ChatMessage {
        self.finalize(content, SessionStatus::Errored, store).await
    }

    async fn finalize(
        &mut self,
        content: String,
        status: SessionStatus,
        store: &dyn TranscriptStore,
    ) -> ChatMessage {
        let gen_seconds = self.started_at.map(|t| t.elapsed().as_secs_f64());
        let message = self.with_draft(|draft| {
            draft.content = content;
            draft.partial = Some(false);
            draft.gen_seconds = gen_seconds;
        });

        self.set_status(status);
        let event = match status {
            SessionStatus::Stopped => SessionEvent::Stopped {
                message: message.clone(),
            },
            SessionStatus::Errored => SessionEvent::Errored {
                message: message.clone(),
            },
            _ => SessionEvent::Completed {
                message: message.clone(),
            },
        };
        self.emit(event);

        self.save_final(store).await;
        message
    }

    // --- persistence ---

    /// Debounced streaming write; failure is non-fatal
    async fn save_draft(&self, store: &dyn TranscriptStore) {
        let Some(id) = self.chat_id() else { return };
        if let Err(e) = store.update(&id, &self.snapshot()).await {
            tracing::warn!("streaming persistence failed (non-fatal): {}", e);
        }
    }

    /// Forced write after finalization, retried once and surfaced to
    /// the user if it still fails
    async fn save_final(&self, store: &dyn TranscriptStore) {
        let Some(id) = self.chat_id() else { return };
        let snapshot = self.snapshot();

        if let Err(first) = store.update(&id, &snapshot).await {
            tracing::warn!("final persistence failed, retrying once: {}", first);
            if let Err(e) = store.update(&id, &snapshot).await {
                tracing::error!("final persistence failed after retry: {}", e);
                self.emit(SessionEvent::PersistFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    // --- helpers ---

    fn build_request(&self) -> ChatRequest {
        let history: Vec<ChatMessage> = {
            let guard = self.messages.lock();
            guard.iter().filter(|m| !m.is_partial()).cloned().collect()
        };
        ChatRequest {
            model: self.config.model.clone(),
            messages: build_wire_messages(
                &self.config.system_prompt,
                &history,
                self.config.max_messages_in_context,
            ),
            stream: true,
        }
    }

    fn snapshot(&self) -> Conversation {
        Conversation {
            id: self.chat_id().unwrap_or_default(),
            model: self.config.model.clone(),
            system_prompt: self.config.system_prompt.clone(),
            messages: self.messages.lock().clone(),
        }
    }

    /// Mutate the draft in the shared array and return its new value.
    /// View layers only mutate detached conversations, so the draft is
    /// restored if it somehow vanished.
    fn with_draft(&self, f: impl FnOnce(&mut ChatMessage)) -> ChatMessage {
        let mut guard = self.messages.lock();
        let idx = match guard.iter().position(|m| m.id == self.assistant_msg_id) {
            Some(idx) => idx,
            None => {
                tracing::warn!("draft message missing from shared array; restoring");
                let mut draft = ChatMessage::assistant_draft(&self.config.model);
                draft.id = self.assistant_msg_id.clone();
                guard.push(draft);
                guard.len() - 1
            }
        };
        f(&mut guard[idx]);
        guard[idx].clone()
    }

    fn joined(&self) -> String {
        wrap_reasoning(&self.reasoning, &self.answer)
    }

    fn chat_id(&self) -> Option<String> {
        self.handle.chat_id.lock().clone()
    }

    fn status(&self) -> SessionStatus {
        *self.handle.status.lock()
    }

    fn set_status(&self, status: SessionStatus) {
        *self.handle.status.lock() = status;
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.handle.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roost_stream::{ChatFrame, ChatRole};
    use std::collections::HashMap;

    struct FixtureTransport {
        frames: Mutex<Option<Vec<roost_stream::Result<ChatFrame>>>>,
    }

    impl FixtureTransport {
        fn new(frames: Vec<roost_stream::Result<ChatFrame>>) -> Self {
            Self {
                frames: Mutex::new(Some(frames)),
            }
        }

        fn from_contents(parts: &[&str]) -> Self {
            Self::new(parts.iter().map(|p| Ok(ChatFrame::from_content(*p))).collect())
        }
    }

    #[async_trait]
    impl ChatTransport for FixtureTransport {
        async fn stream_chat(
            &self,
            _request: &ChatRequest,
        ) -> roost_stream::Result<FrameStream> {
            let frames = self.frames.lock().take().unwrap_or_default();
            Ok(Box::pin(tokio_stream::iter(frames)))
        }
    }

    /// Transport whose stream never ends, for cancellation tests
    struct StallingTransport {
        parts: Vec<&'static str>,
    }

    #[async_trait]
    impl ChatTransport for StallingTransport {
        async fn stream_chat(
            &self,
            _request: &ChatRequest,
        ) -> roost_stream::Result<FrameStream> {
            let parts = self.parts.clone();
            Ok(Box::pin(async_stream::stream! {
                for part in parts {
                    yield Ok(ChatFrame::from_content(part));
                }
                std::future::pending::<()>().await;
            }))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        docs: Mutex<HashMap<String, Conversation>>,
    }

    #[async_trait]
    impl TranscriptStore for MemoryStore {
        async fn create(&self, conversation: &Conversation) -> crate::Result<String> {
            let id = if conversation.id.is_empty() {
                uuid::Uuid::new_v4().to_string()
            } else {
                conversation.id.clone()
            };
            let mut doc = conversation.clone();
            doc.id = id.clone();
            self.docs.lock().insert(id.clone(), doc);
            Ok(id)
        }

        async fn get(&self, id: &str) -> crate::Result<Conversation> {
            self.docs
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| Error::NotFound(id.to_string()))
        }

        async fn update(&self, id: &str, conversation: &Conversation) -> crate::Result<()> {
            let mut doc = conversation.clone();
            doc.id = id.to_string();
            self.docs.lock().insert(id.to_string(), doc);
            Ok(())
        }

        async fn delete(&self, id: &str) -> crate::Result<()> {
            self.docs
                .lock()
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| Error::NotFound(id.to_string()))
        }

        async fn list(&self) -> crate::Result<Vec<roost_stream::ConversationSummary>> {
            Ok(self
                .docs
                .lock()
                .values()
                .map(|c| roost_stream::ConversationSummary {
                    id: c.id.clone(),
                    title: c.title(),
                })
                .collect())
        }
    }

    fn shared() -> SharedMessages {
        Arc::new(Mutex::new(Vec::new()))
    }

    // -- submit validation --

    #[test]
    fn test_submit_requires_model() {
        let result = StreamSession::submit(None, shared(), "hi", SessionConfig::new(""));
        assert!(matches!(result, Err(Error::NoModelSelected)));
    }

    #[test]
    fn test_submit_rejects_second_draft() {
        let messages = shared();
        let _session = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "first",
            SessionConfig::new("llama3"),
        )
        .unwrap();
        let second = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "second",
            SessionConfig::new("llama3"),
        );
        assert!(matches!(second, Err(Error::SessionActive)));
    }

    #[test]
    fn test_submit_stages_user_and_draft() {
        let messages = shared();
        let session = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "question",
            SessionConfig::new("llama3"),
        )
        .unwrap();

        let guard = messages.lock();
        assert_eq!(guard.len(), 2);
        assert_eq!(guard[0].role, ChatRole::User);
        assert_eq!(guard[0].content, "question");
        assert!(guard[1].is_partial());
        assert_eq!(guard[1].id, session.handle().assistant_msg_id());
    }

    // -- terminal transitions --

    #[tokio::test]
    async fn test_completed_reassembles_answer() {
        let messages = shared();
        let session = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "hi",
            SessionConfig::new("llama3"),
        )
        .unwrap();
        let handle = session.handle();

        let transport = FixtureTransport::from_contents(&["Hel", "lo wor", "ld"]);
        let store = MemoryStore::default();
        let message = session.run(&transport, &store).await;

        assert_eq!(message.content, "Hello world");
        assert_eq!(message.partial, Some(false));
        assert!(message.gen_seconds.is_some());
        assert_eq!(handle.status(), SessionStatus::Completed);

        // No partial message remains anywhere
        assert_eq!(messages.lock().iter().filter(|m| m.is_partial()).count(), 0);
    }

    #[tokio::test]
    async fn test_reasoning_channel_wrapped_into_content() {
        let messages = shared();
        let session = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "hi",
            SessionConfig::new("llama3"),
        )
        .unwrap();

        let frames = vec![
            Ok(serde_json::from_str::<ChatFrame>(
                r#"{"message":{"thinking":"let me "}}"#,
            )
            .unwrap()),
            Ok(serde_json::from_str::<ChatFrame>(r#"{"message":{"thinking":"see"}}"#).unwrap()),
            Ok(ChatFrame::from_content("four")),
        ];
        let transport = FixtureTransport::new(frames);
        let store = MemoryStore::default();
        let message = session.run(&transport, &store).await;

        assert_eq!(message.content, "<think>let me see</think>\n\nfour");
    }

    #[tokio::test]
    async fn test_error_frame_replaces_draft_content() {
        let messages = shared();
        let session = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "hi",
            SessionConfig::new("llama3"),
        )
        .unwrap();
        let handle = session.handle();

        let frames = vec![
            Ok(ChatFrame::from_content("partial text")),
            Ok(serde_json::from_str::<ChatFrame>(r#"{"error":"boom"}"#).unwrap()),
        ];
        let transport = FixtureTransport::new(frames);
        let store = MemoryStore::default();
        let message = session.run(&transport, &store).await;

        assert_eq!(message.content, "Error from model: boom");
        assert_eq!(message.partial, Some(false));
        assert_eq!(handle.status(), SessionStatus::Errored);
    }

    #[tokio::test]
    async fn test_cancellation_preserves_content_and_appends_marker() {
        let messages = shared();
        let session = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "hi",
            SessionConfig::new("llama3"),
        )
        .unwrap();
        let handle = session.handle();
        let mut events = handle.subscribe();

        let transport = StallingTransport {
            parts: vec!["Hel", "lo wor", "ld"],
        };
        let store = MemoryStore::default();
        let task = tokio::spawn(async move { session.run(&transport, &store).await });

        // Wait for the full text to be applied, then cancel
        loop {
            match events.recv().await.unwrap() {
                SessionEvent::DraftUpdate { content } if content == "Hello world" => break,
                _ => {}
            }
        }
        // Exactly one partial draft while streaming
        assert_eq!(messages.lock().iter().filter(|m| m.is_partial()).count(), 1);

        handle.abort();
        handle.abort(); // idempotent

        let message = task.await.unwrap();
        assert_eq!(message.content, "Hello world\n\n_Stopped_");
        assert_eq!(message.partial, Some(false));
        assert_eq!(handle.status(), SessionStatus::Stopped);
    }

    #[tokio::test]
    async fn test_first_persistence_assigns_conversation_id() {
        let messages = shared();
        let session = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "hello there",
            SessionConfig::new("llama3"),
        )
        .unwrap();
        let handle = session.handle();

        let transport = FixtureTransport::from_contents(&["hi"]);
        let store = MemoryStore::default();
        session.run(&transport, &store).await;

        let id = handle.chat_id().expect("id assigned");
        let persisted = store.get(&id).await.unwrap();
        assert_eq!(persisted.messages.len(), 2);
        assert_eq!(persisted.messages[1].content, "hi");
        assert_eq!(persisted.messages[1].partial, Some(false));
    }

    #[tokio::test]
    async fn test_existing_conversation_id_reused() {
        let store = MemoryStore::default();
        let seeded = store
            .create(&Conversation {
                model: "llama3".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let messages = shared();
        let session = StreamSession::submit(
            Some(seeded.clone()),
            Arc::clone(&messages),
            "hi",
            SessionConfig::new("llama3"),
        )
        .unwrap();
        let handle = session.handle();

        let transport = FixtureTransport::from_contents(&["ok"]);
        session.run(&transport, &store).await;

        assert_eq!(handle.chat_id().as_deref(), Some(seeded.as_str()));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_before_stream_finalizes_errored() {
        struct FailingTransport;

        #[async_trait]
        impl ChatTransport for FailingTransport {
            async fn stream_chat(
                &self,
                _request: &ChatRequest,
            ) -> roost_stream::Result<FrameStream> {
                Err(roost_stream::Error::crashed(500))
            }
        }

        let messages = shared();
        let session = StreamSession::submit(
            None,
            Arc::clone(&messages),
            "hi",
            SessionConfig::new("llama3"),
        )
        .unwrap();
        let handle = session.handle();

        let store = MemoryStore::default();
        let message = session.run(&FailingTransport, &store).await;

        assert!(message.content.contains("500"));
        assert_eq!(handle.status(), SessionStatus::Errored);
    }

    #[tokio::test]
    async fn test_request_excludes_draft_and_applies_window() {
        struct CapturingTransport {
            seen: Mutex<Option<ChatRequest>>,
        }

        #[async_trait]
        impl ChatTransport for CapturingTransport {
            async fn stream_chat(
                &self,
                request: &ChatRequest,
            ) -> roost_stream::Result<FrameStream> {
                *self.seen.lock() = Some(request.clone());
                Ok(Box::pin(tokio_stream::iter(vec![Ok(
                    ChatFrame::from_content("ok"),
                )])))
            }
        }

        let messages = shared();
        {
            let mut guard = messages.lock();
            guard.push(ChatMessage::user("old one"));
            guard.push(ChatMessage::user("old two"));
        }
        let config = SessionConfig::new("llama3")
            .with_system_prompt("be brief")
            .with_window(2);
        let session =
            StreamSession::submit(None, Arc::clone(&messages), "newest", config).unwrap();

        let transport = CapturingTransport {
            seen: Mutex::new(None),
        };
        let store = MemoryStore::default();
        session.run(&transport, &store).await;

        let request = transport.seen.lock().clone().unwrap();
        assert!(request.stream);
        // system + last two non-draft messages
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].content, "old two");
        assert_eq!(request.messages[2].content, "newest");
    }
}
