use std::ops::Deref;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use log::{debug, info};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    cancellable, AiGateway, ChatMessage, ConversationSession, Note, NotePatch, NoteStore,
    NovaError, QuickAction, Result,
};

/// Application controller tying the note store, the AI gateway and the
/// assistant conversation together.
///
/// `Workspace` is the owner. Dropping it aborts every assistant call still in
/// flight, including calls running on spawned tasks through a
/// [`WorkspaceHandle`].
pub struct Workspace {
    handle: WorkspaceHandle,
}

impl Workspace {
    pub fn new(store: NoteStore, gateway: AiGateway) -> Self {
        Self {
            handle: WorkspaceHandle {
                store: Arc::new(Mutex::new(store)),
                gateway,
                session: Arc::new(ConversationSession::new()),
                editor_cancel: Arc::new(StdMutex::new(CancellationToken::new())),
            },
        }
    }

    /// A shared handle for running calls on other tasks
    pub fn handle(&self) -> WorkspaceHandle {
        self.handle.clone()
    }
}

impl Deref for Workspace {
    type Target = WorkspaceHandle;

    fn deref(&self) -> &WorkspaceHandle {
        &self.handle
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        debug!("Workspace discarded, canceling in-flight calls");
        self.handle.cancel_all();
    }
}

/// Shared access to a [`Workspace`].
///
/// The store lock is never held while waiting on the model service, so
/// editing stays possible during slow calls.
#[derive(Clone)]
pub struct WorkspaceHandle {
    store: Arc<Mutex<NoteStore>>,
    gateway: AiGateway,
    session: Arc<ConversationSession>,
    /// Fires when the open note changes, aborting title and cover generation
    editor_cancel: Arc<StdMutex<CancellationToken>>,
}

impl WorkspaceHandle {
    pub fn store(&self) -> Arc<Mutex<NoteStore>> {
        Arc::clone(&self.store)
    }

    pub fn session(&self) -> Arc<ConversationSession> {
        Arc::clone(&self.session)
    }

    pub fn gateway(&self) -> &AiGateway {
        &self.gateway
    }

    fn editor_token(&self) -> CancellationToken {
        self.editor_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cancel_editor_calls(&self) {
        let mut token = self
            .editor_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }

    /// Creates an empty note and opens it
    pub async fn create_note(&self) -> Note {
        let note = self.store.lock().await.create();
        self.cancel_editor_calls();
        note
    }

    pub async fn update_note(&self, id: &str, patch: NotePatch) -> Result<Note> {
        self.store.lock().await.update(id, patch).cloned()
    }

    pub async fn delete_note(&self, id: &str) -> Result<Note> {
        let mut store = self.store.lock().await;
        let was_active = store.active_id() == Some(id);
        let removed = store.delete(id)?;
        drop(store);

        if was_active {
            self.cancel_editor_calls();
        }
        Ok(removed)
    }

    /// Opens a note, or closes the open one with `None`.
    ///
    /// Switching to a different note aborts title and cover generation still
    /// running for the previous one. The conversation is kept.
    pub async fn open_note(&self, id: Option<&str>) -> Result<()> {
        let mut store = self.store.lock().await;
        let changed = store.active_id() != id;
        store.set_active(id)?;
        drop(store);

        if changed {
            debug!("Active note changed to {:?}", id);
            self.cancel_editor_calls();
        }
        Ok(())
    }

    pub async fn active_note(&self) -> Option<Note> {
        self.store.lock().await.active_note().cloned()
    }

    pub async fn search(&self, query: &str) -> Vec<Note> {
        self.store
            .lock()
            .await
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }

    async fn note(&self, id: &str) -> Result<Note> {
        self.store
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| NovaError::NoteNotFound { id: id.to_string() })
    }

    /// Replaces the note's title with a generated one.
    ///
    /// Blank notes are left alone and yield `None`.
    pub async fn generate_title(&self, id: &str) -> Result<Option<String>> {
        // taken before the first await so a switch during the lookup still cancels
        let token = self.editor_token();
        let note = self.note(id).await?;
        if note.content.trim().is_empty() {
            debug!("Not generating a title for blank note {}", id);
            return Ok(None);
        }

        let title = cancellable(&token, self.gateway.generate_title(&note.content)).await?;
        self.update_note(id, NotePatch::title(title.clone())).await?;
        info!("Generated title for note {}: {}", id, title);
        Ok(Some(title))
    }

    /// Generates a cover image from the note's title and stores it.
    ///
    /// The existing cover is kept when the service returns no image.
    pub async fn generate_cover(&self, id: &str) -> Result<Option<String>> {
        let token = self.editor_token();
        let note = self.note(id).await?;

        let image = cancellable(&token, self.gateway.generate_cover_image(&note.title)).await?;
        if let Some(image) = &image {
            self.update_note(id, NotePatch::cover_image(Some(image.clone())))
                .await?;
            info!("Stored generated cover for note {}", id);
        }
        Ok(image)
    }

    /// Asks the assistant, using the open note as context when there is one
    pub async fn ask(&self, query: &str) -> Result<Option<ChatMessage>> {
        let context = self.active_note().await.map(|n| n.content);
        self.session
            .ask(&self.gateway, query, context.as_deref())
            .await
    }

    /// Runs a quick action against the open note
    pub async fn quick_action(&self, action: QuickAction, input: &str) -> Result<Option<ChatMessage>> {
        let content = self.active_note().await.map(|n| n.content);
        self.session
            .dispatch(&self.gateway, action, content.as_deref(), input)
            .await
    }

    /// Aborts every assistant call in flight
    pub fn cancel_all(&self) {
        self.session.cancel_in_flight();
        self.cancel_editor_calls();
    }
}
