//! The assistant panel's conversation: an append-only message log, the busy
//! state, the recording indicator and the citations of the latest grounded
//! answer.
//!
//! Only one gateway call runs per session at a time. Starting a second one
//! while busy fails with [`NovaError::SessionBusy`]. In-flight calls can be
//! aborted with [`ConversationSession::cancel_in_flight`]; an aborted call
//! returns [`NovaError::Canceled`] and leaves the log untouched.
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    AiGateway, ChatMessage, Citation, NovaError, Operation, QuickAction, Result, Role,
    SessionStatus,
};

pub const ACTION_ERROR_MESSAGE: &str = "I encountered an error processing that request.";
pub const ASK_ERROR_MESSAGE: &str = "Sorry, I couldn't process your question.";
pub const MISSING_QUERY_MESSAGE: &str = "Please provide a query in the chat box to search the web.";
pub const NO_ACTION_ITEMS_MESSAGE: &str = "No clear action items found in this note.";

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<ChatMessage>,
    status: SessionStatus,
    recording: bool,
    citations: Vec<Citation>,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct ConversationSession {
    state: Mutex<SessionState>,
}

/// Holds the session busy until dropped
struct BusyGuard<'a> {
    session: &'a ConversationSession,
    token: CancellationToken,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.session.state().status = SessionStatus::Idle;
    }
}

/// Runs `fut` unless `token` fires first
pub async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(NovaError::Canceled),
        result = fut => result,
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    // No code panics while holding the lock, so a poisoned state is still consistent
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, operation: Operation) -> Result<BusyGuard<'_>> {
        let mut state = self.state();
        if let SessionStatus::Busy(current) = state.status {
            debug!("Rejecting {} while {} is running", operation, current);
            return Err(NovaError::SessionBusy { operation: current });
        }
        state.status = SessionStatus::Busy(operation);
        let token = state.cancel.clone();
        drop(state);

        Ok(BusyGuard {
            session: self,
            token,
        })
    }

    /// Appends a message stamped with a fresh ID and the current time
    pub fn append(&self, role: Role, text: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::new(role, text);
        self.state().messages.push(message.clone());
        message
    }

    fn replace_citations(&self, citations: Vec<Citation>) {
        self.state().citations = citations;
    }

    /// Asks a question, optionally grounded on the open note's content.
    ///
    /// The question and the answer are both logged. A failed call logs a fixed
    /// apology instead of the answer. Blank questions are ignored.
    pub async fn ask(
        &self,
        gateway: &AiGateway,
        query: &str,
        context: Option<&str>,
    ) -> Result<Option<ChatMessage>> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        let guard = self.begin(Operation::Ask)?;
        self.append(Role::User, query);

        let prompt = match context {
            Some(content) => format!(
                "Context about this note: {}\n\nUser Question: {}",
                content, query
            ),
            None => query.to_string(),
        };

        let text = match cancellable(&guard.token, gateway.grounded_search(&prompt)).await {
            Ok(answer) => {
                self.replace_citations(answer.citations);
                answer.text
            }
            Err(NovaError::Canceled) => {
                info!("Question canceled");
                return Err(NovaError::Canceled);
            }
            Err(e) => {
                warn!("Question failed: {}", e);
                ASK_ERROR_MESSAGE.to_string()
            }
        };

        Ok(Some(self.append(Role::Assistant, text)))
    }

    /// Runs one of the panel's quick actions against the open note.
    ///
    /// Returns `None` without calling the service when there is no open note,
    /// or when the note is blank and the action needs its content. Deep search
    /// uses `input` as the query and replaces the citations.
    pub async fn dispatch(
        &self,
        gateway: &AiGateway,
        action: QuickAction,
        note_content: Option<&str>,
        input: &str,
    ) -> Result<Option<ChatMessage>> {
        let Some(content) = note_content else {
            debug!("Skipping {:?}: no open note", action);
            return Ok(None);
        };
        if action != QuickAction::DeepSearch && content.trim().is_empty() {
            debug!("Skipping {:?}: note is empty", action);
            return Ok(None);
        }

        let guard = self.begin(action.into())?;
        let token = &guard.token;

        let outcome = match action {
            QuickAction::Summarize => cancellable(token, gateway.summarize(content))
                .await
                .map(|summary| format!("**Note Summary:**\n\n{}", summary)),
            QuickAction::ActionItems => cancellable(token, gateway.extract_action_items(content))
                .await
                .map(|items| format_action_items(&items)),
            QuickAction::DeepSearch => {
                if input.trim().is_empty() {
                    return Ok(Some(self.append(Role::Assistant, MISSING_QUERY_MESSAGE)));
                }
                cancellable(token, gateway.grounded_search(input))
                    .await
                    .map(|answer| {
                        self.replace_citations(answer.citations);
                        answer.text
                    })
            }
        };

        let text = match outcome {
            Ok(text) => text,
            Err(NovaError::Canceled) => {
                info!("{:?} canceled", action);
                return Err(NovaError::Canceled);
            }
            Err(e) => {
                warn!("{:?} failed: {}", action, e);
                ACTION_ERROR_MESSAGE.to_string()
            }
        };

        Ok(Some(self.append(Role::Assistant, text)))
    }

    /// Aborts the gateway call in flight, if any
    pub fn cancel_in_flight(&self) {
        let mut state = self.state();
        if state.status.is_busy() {
            info!("Canceling in-flight {:?}", state.status);
        }
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
    }

    /// Cancels any call in flight and forgets the conversation
    pub fn reset(&self) {
        self.cancel_in_flight();
        let mut state = self.state();
        state.messages.clear();
        state.citations.clear();
        state.recording = false;
    }

    pub fn toggle_recording(&self) -> bool {
        let mut state = self.state();
        state.recording = !state.recording;
        state.recording
    }

    pub fn is_recording(&self) -> bool {
        self.state().recording
    }

    pub fn status(&self) -> SessionStatus {
        self.state().status
    }

    pub fn is_busy(&self) -> bool {
        self.status().is_busy()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn citations(&self) -> Vec<Citation> {
        self.state().citations.clone()
    }
}

/// Renders items as a markdown checklist under a heading
pub fn format_action_items(items: &[String]) -> String {
    if items.is_empty() {
        return NO_ACTION_ITEMS_MESSAGE.to_string();
    }
    let list = items
        .iter()
        .map(|item| format!("- [ ] {}", item))
        .collect::<Vec<_>>()
        .join("\n");
    format!("**Extracted Action Items:**\n\n{}", list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{GenerateContentRequest, GenerateContentResponse};
    use crate::{GenerativeModel, ModelRoster};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Replies with `reply` once `gate` is notified, if a gate is set
    struct StubModel {
        reply: Option<GenerateContentResponse>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl GenerativeModel for StubModel {
        async fn generate_content(
            &self,
            _model: &str,
            _request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.reply.clone().ok_or(NovaError::Upstream {
                status: 500,
                message: "boom".into(),
            })
        }
    }

    fn gateway_replying(text: &str) -> AiGateway {
        let model = StubModel {
            reply: Some(GenerateContentResponse::from_text(text)),
            gate: None,
        };
        AiGateway::new(Arc::new(model), ModelRoster::default())
    }

    fn failing_gateway() -> AiGateway {
        let model = StubModel {
            reply: None,
            gate: None,
        };
        AiGateway::new(Arc::new(model), ModelRoster::default())
    }

    fn gated_gateway(text: &str) -> (AiGateway, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let model = StubModel {
            reply: Some(GenerateContentResponse::from_text(text)),
            gate: Some(gate.clone()),
        };
        (AiGateway::new(Arc::new(model), ModelRoster::default()), gate)
    }

    async fn wait_until_busy(session: &ConversationSession) {
        while !session.is_busy() {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn append_preserves_insertion_order() {
        let session = ConversationSession::new();
        session.append(Role::User, "one");
        session.append(Role::Assistant, "two");
        session.append(Role::User, "three");

        let texts: Vec<_> = session.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        let messages = session.messages();
        assert_ne!(messages[0].id, messages[1].id);
        assert!(messages[0].timestamp <= messages[2].timestamp);
    }

    #[test]
    fn checklist_formatting() {
        assert_eq!(
            format_action_items(&["Buy milk".into(), "Call Bob".into()]),
            "**Extracted Action Items:**\n\n- [ ] Buy milk\n- [ ] Call Bob"
        );
        assert_eq!(format_action_items(&[]), NO_ACTION_ITEMS_MESSAGE);
    }

    #[tokio::test]
    async fn summarize_appends_formatted_summary() {
        let session = ConversationSession::new();
        let msg = session
            .dispatch(&gateway_replying("- a"), QuickAction::Summarize, Some("note"), "")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text, "**Note Summary:**\n\n- a");
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn actions_are_suppressed_without_content() {
        let session = ConversationSession::new();
        let gateway = gateway_replying("unused");

        for action in [QuickAction::Summarize, QuickAction::ActionItems] {
            assert!(session.dispatch(&gateway, action, Some("   "), "").await.unwrap().is_none());
            assert!(session.dispatch(&gateway, action, None, "").await.unwrap().is_none());
        }
        assert!(session
            .dispatch(&gateway, QuickAction::DeepSearch, None, "query")
            .await
            .unwrap()
            .is_none());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn deep_search_on_blank_note_needs_input() {
        let session = ConversationSession::new();
        let gateway = gateway_replying("answer");

        let msg = session
            .dispatch(&gateway, QuickAction::DeepSearch, Some(""), "  ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.text, MISSING_QUERY_MESSAGE);

        let msg = session
            .dispatch(&gateway, QuickAction::DeepSearch, Some(""), "rust")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.text, "answer");
    }

    #[tokio::test]
    async fn upstream_failures_become_messages() {
        let session = ConversationSession::new();
        let gateway = failing_gateway();

        let msg = session
            .dispatch(&gateway, QuickAction::ActionItems, Some("todo"), "")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.text, ACTION_ERROR_MESSAGE);

        let msg = session.ask(&gateway, "why?", None).await.unwrap().unwrap();
        assert_eq!(msg.text, ASK_ERROR_MESSAGE);

        let roles: Vec<_> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn ask_logs_question_and_answer_and_replaces_citations() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "It is 42." }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.example", "title": "A" } }
                ]}
            }]
        }))
        .unwrap();
        let model = StubModel {
            reply: Some(response),
            gate: None,
        };
        let gateway = AiGateway::new(Arc::new(model), ModelRoster::default());

        let session = ConversationSession::new();
        session.replace_citations(vec![Citation {
            title: "old".into(),
            uri: "https://old.example".into(),
        }]);
        session.ask(&gateway, "What is it?", Some("notes")).await.unwrap();

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].text, "What is it?");
        assert_eq!(messages[1].text, "It is 42.");
        assert_eq!(session.citations().len(), 1);
        assert_eq!(session.citations()[0].title, "A");
    }

    #[tokio::test]
    async fn blank_question_is_ignored() {
        let session = ConversationSession::new();
        assert!(session.ask(&gateway_replying("x"), " ", None).await.unwrap().is_none());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn second_operation_while_busy_is_rejected() {
        let session = Arc::new(ConversationSession::new());
        let (gateway, gate) = gated_gateway("- summary");

        let first = tokio::spawn({
            let session = session.clone();
            let gateway = gateway.clone();
            async move {
                session
                    .dispatch(&gateway, QuickAction::Summarize, Some("note"), "")
                    .await
            }
        });
        wait_until_busy(&session).await;
        assert_eq!(session.status(), SessionStatus::Busy(Operation::Summarize));

        let second = session
            .dispatch(&gateway, QuickAction::ActionItems, Some("note"), "")
            .await;
        assert!(matches!(
            second,
            Err(NovaError::SessionBusy { operation: Operation::Summarize })
        ));
        assert!(matches!(
            session.ask(&gateway, "hi", None).await,
            Err(NovaError::SessionBusy { .. })
        ));

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn cancel_aborts_without_logging() {
        let session = Arc::new(ConversationSession::new());
        let (gateway, _gate) = gated_gateway("never");

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.ask(&gateway, "slow?", None).await }
        });
        wait_until_busy(&session).await;
        session.cancel_in_flight();

        assert!(matches!(task.await.unwrap(), Err(NovaError::Canceled)));
        // the question was logged before the call started, the answer never arrives
        let texts: Vec<_> = session.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["slow?"]);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn session_is_usable_after_cancel() {
        let session = ConversationSession::new();
        session.cancel_in_flight();
        let msg = session
            .dispatch(&gateway_replying("ok"), QuickAction::Summarize, Some("n"), "")
            .await
            .unwrap();
        assert!(msg.is_some());
    }

    #[test]
    fn reset_clears_everything() {
        let session = ConversationSession::new();
        session.append(Role::User, "hello");
        assert!(session.toggle_recording());
        session.reset();
        assert!(session.messages().is_empty());
        assert!(session.citations().is_empty());
        assert!(!session.is_recording());
    }
}
