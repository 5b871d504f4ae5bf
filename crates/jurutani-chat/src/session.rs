//! The chat session: observable state, conversation lifecycle, message
//! flows.
//!
//! A [`ChatSession`] is what the UI layer holds.  State lives in
//! [`StateCell`]s (conversation list, open timeline, sync status, loading
//! flags); operations are async methods.  The session owns the realtime
//! sync engine and is responsible for tearing its subscription down on
//! every conversation switch and on drop.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use jurutani_backend::{
    Backend, BackendError, ConversationRecords, MessageRecords, NewMessage, ProfileRecords,
};
use jurutani_media::{MediaPipeline, UploadFile};
use jurutani_shared::constants::{HISTORY_PAGE_SIZE, SEARCH_MIN_CHARS, SEARCH_RESULT_LIMIT};
use jurutani_shared::{Conversation, ConversationId, Message, MessageId, Profile, UserId};

use crate::cell::StateCell;
use crate::directory::ConversationDirectory;
use crate::error::{ChatError, Result};
use crate::read_state;
use crate::sync::{SyncEngine, SyncStatus};
use crate::timeline::Timeline;

pub struct ChatSession {
    backend: Backend,
    directory: ConversationDirectory,
    media: MediaPipeline,
    sync: SyncEngine,

    conversations: StateCell<Vec<Conversation>>,
    timeline: StateCell<Timeline>,
    current: StateCell<Option<Conversation>>,
    status: StateCell<SyncStatus>,
    loading: StateCell<bool>,
    uploading: StateCell<bool>,
    last_error: StateCell<Option<String>>,
}

impl ChatSession {
    pub fn new(backend: Backend) -> Self {
        let timeline = StateCell::new(Timeline::new());
        let status = StateCell::new(SyncStatus::Idle);

        Self {
            directory: ConversationDirectory::new(backend.clone()),
            media: MediaPipeline::new(Arc::clone(&backend.storage)),
            sync: SyncEngine::new(backend.clone(), timeline.clone(), status.clone()),
            backend,
            conversations: StateCell::new(Vec::new()),
            timeline,
            current: StateCell::new(None),
            status,
            loading: StateCell::new(false),
            uploading: StateCell::new(false),
            last_error: StateCell::new(None),
        }
    }

    // ------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------

    /// The caller's conversation list, most recent first.
    pub fn conversations(&self) -> &StateCell<Vec<Conversation>> {
        &self.conversations
    }

    /// The open conversation's message timeline.
    pub fn timeline(&self) -> &StateCell<Timeline> {
        &self.timeline
    }

    /// The open conversation, if any.
    pub fn current(&self) -> &StateCell<Option<Conversation>> {
        &self.current
    }

    /// Realtime subscription state.
    pub fn status(&self) -> &StateCell<SyncStatus> {
        &self.status
    }

    pub fn loading(&self) -> &StateCell<bool> {
        &self.loading
    }

    pub fn uploading(&self) -> &StateCell<bool> {
        &self.uploading
    }

    /// Human-readable message of the most recent failed operation.
    pub fn last_error(&self) -> &StateCell<Option<String>> {
        &self.last_error
    }

    /// Unread messages in the open conversation for the caller.
    pub fn unread_count(&self) -> usize {
        match self.backend.current_user() {
            Some(me) => self
                .timeline
                .with(|t| read_state::unread_count(t.messages(), me)),
            None => 0,
        }
    }

    // ------------------------------------------------------------------
    // Conversation lifecycle
    // ------------------------------------------------------------------

    /// Refresh the conversation list from the backend.
    pub async fn refresh_conversations(&self) -> Result<Vec<Conversation>> {
        self.loading.set(true);
        let result = self.directory.list().await;
        self.loading.set(false);

        let list = self.track(result)?;
        self.conversations.set(list.clone());
        Ok(list)
    }

    /// Open (creating on first contact) the conversation with `other`.
    pub async fn open_with(&self, other: UserId) -> Result<Conversation> {
        let conversation = {
            let result = self.directory.get_or_create(other).await;
            self.track(result)?
        };
        self.open(conversation).await
    }

    /// Open `conversation`: tear down the previous subscription, load the
    /// initial history page, then subscribe for live updates.
    pub async fn open(&self, conversation: Conversation) -> Result<Conversation> {
        self.close();
        self.current.set(Some(conversation.clone()));

        self.loading.set(true);
        let history = self
            .backend
            .messages
            .fetch_page(conversation.id, None, HISTORY_PAGE_SIZE)
            .await;
        self.loading.set(false);

        let rows = self.track(history.map_err(ChatError::from))?;
        self.timeline.update(|t| *t = Timeline::from_history(rows));

        let subscribed = self.sync.open(conversation.id).await;
        self.track(subscribed)?;
        Ok(conversation)
    }

    /// Close the open conversation.
    ///
    /// The subscription is cancelled synchronously: no event may touch the
    /// timeline after this returns, even one already in flight.
    pub fn close(&self) {
        self.sync.close();
        self.current.set(None);
        self.timeline.update(|t| *t = Timeline::new());
    }

    /// Fetch an older history page before the earliest loaded message.
    /// Returns how many rows were merged.
    pub async fn load_older(&self, limit: u32) -> Result<usize> {
        let Some(conversation) = self.current.get() else {
            return Ok(0);
        };
        let before = self.timeline.with(|t| t.messages().first().map(|m| m.created_at));

        let result = self
            .backend
            .messages
            .fetch_page(conversation.id, before, limit)
            .await
            .map_err(ChatError::from);
        let rows = self.track(result)?;

        let merged = rows.len();
        self.timeline.update(|t| t.merge_history(rows));
        Ok(merged)
    }

    // ------------------------------------------------------------------
    // Message flows
    // ------------------------------------------------------------------

    /// Send a message, optionally with an image attachment.
    ///
    /// Validation happens before any network call; the attachment is
    /// uploaded before the row is written so a message can never reference
    /// an object that does not exist; and the open timeline sees the send
    /// as a two-phase optimistic commit -- a pending entry immediately,
    /// promoted or rolled back when the write settles.
    pub async fn send(
        &self,
        conversation: ConversationId,
        text: &str,
        attachment: Option<UploadFile>,
    ) -> Result<Message> {
        let result = self.send_inner(conversation, text, attachment).await;
        self.track(result)
    }

    async fn send_inner(
        &self,
        conversation: ConversationId,
        text: &str,
        attachment: Option<UploadFile>,
    ) -> Result<Message> {
        let me = self.require_user()?;

        let trimmed = text.trim();
        if trimmed.is_empty() && attachment.is_none() {
            return Err(ChatError::EmptyMessage);
        }

        let attachment = match attachment {
            Some(file) => {
                self.uploading.set(true);
                let uploaded = self.media.upload(me, &file).await;
                self.uploading.set(false);
                Some(uploaded?)
            }
            None => None,
        };

        let id = MessageId::new();
        let open = self.is_open(conversation);
        if open {
            self.timeline.update(|t| {
                t.apply_insert(Message {
                    id,
                    conversation_id: conversation,
                    sender_id: me,
                    content: trimmed.to_string(),
                    attachment: attachment.clone(),
                    created_at: Utc::now(),
                    read: false,
                    sender: None,
                    pending: true,
                });
            });
        }

        let write = self
            .backend
            .messages
            .insert(NewMessage {
                id,
                conversation_id: conversation,
                sender_id: me,
                content: trimmed.to_string(),
                attachment,
            })
            .await;

        match write {
            Ok(row) => {
                if open {
                    // Promotes the pending entry; a no-op when the realtime
                    // echo beat us to it.
                    self.timeline.update(|t| {
                        t.apply_insert(row.clone());
                    });
                }

                // Best-effort preview update; its failure never fails the send.
                if let Err(e) = self
                    .backend
                    .conversations
                    .touch(conversation, Some(row.preview_text()), row.created_at)
                    .await
                {
                    warn!(conversation = %conversation, error = %e, "failed to update preview");
                }

                Ok(row)
            }
            Err(e) => {
                // Never leave a pending placeholder behind.
                if open {
                    self.timeline.update(|t| {
                        t.remove(id);
                    });
                }
                Err(ChatError::SendFailed(e))
            }
        }
    }

    /// Delete one of the caller's own messages, cleaning up its attachment
    /// first (best effort).
    pub async fn delete_message(&self, id: MessageId) -> Result<()> {
        let result = self.delete_message_inner(id).await;
        self.track(result)
    }

    async fn delete_message_inner(&self, id: MessageId) -> Result<()> {
        let me = self.require_user()?;

        let row = self.backend.messages.fetch(id).await?;
        if row.sender_id != me {
            return Err(ChatError::Unauthorized);
        }

        if let Some(attachment) = &row.attachment {
            self.media.remove(&attachment.path).await;
        }

        // The store re-checks the sender; we are not its only caller.
        self.backend.messages.delete(id, me).await?;
        self.timeline.update(|t| {
            t.remove(id);
        });
        Ok(())
    }

    /// Delete a whole conversation: attachments (best effort, concurrent),
    /// then message rows, then the conversation row.
    pub async fn delete_conversation(&self, conversation: ConversationId) -> Result<()> {
        let result = self.delete_conversation_inner(conversation).await;
        self.track(result)
    }

    async fn delete_conversation_inner(&self, conversation: ConversationId) -> Result<()> {
        let me = self.authorize_participant(conversation).await?;

        self.cleanup_attachments(conversation).await?;
        self.backend.messages.delete_all(conversation).await?;
        self.backend.conversations.delete(conversation, me).await?;

        self.conversations
            .update(|list| list.retain(|c| c.id != conversation));
        if self.is_open(conversation) {
            self.close();
        }
        Ok(())
    }

    /// Delete every message in a conversation but keep the conversation.
    pub async fn clear_messages(&self, conversation: ConversationId) -> Result<()> {
        let result = self.clear_messages_inner(conversation).await;
        self.track(result)
    }

    async fn clear_messages_inner(&self, conversation: ConversationId) -> Result<()> {
        self.authorize_participant(conversation).await?;

        self.cleanup_attachments(conversation).await?;
        self.backend.messages.delete_all(conversation).await?;
        if let Err(e) = self.backend.conversations.clear_preview(conversation).await {
            warn!(conversation = %conversation, error = %e, "failed to clear preview");
        }

        if self.is_open(conversation) {
            self.timeline.update(|t| *t = Timeline::new());
        }
        Ok(())
    }

    /// Mark every message from the partner as read.  Idempotent.
    pub async fn mark_read(&self, conversation: ConversationId) -> Result<()> {
        let result = self.mark_read_inner(conversation).await;
        self.track(result)
    }

    async fn mark_read_inner(&self, conversation: ConversationId) -> Result<()> {
        let me = self.require_user()?;
        self.backend.messages.mark_read(conversation, me).await?;
        if self.is_open(conversation) {
            self.timeline.update(|t| t.mark_read_from(me));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Partner search
    // ------------------------------------------------------------------

    /// Search profiles by display name to start a new conversation.
    ///
    /// Short queries return nothing, the caller is excluded, and backend
    /// failures degrade to an empty list rather than an error.
    pub async fn search_partners(&self, query: &str) -> Vec<Profile> {
        if query.trim().chars().count() < SEARCH_MIN_CHARS {
            return Vec::new();
        }
        match self
            .backend
            .profiles
            .search_by_name(query, self.backend.current_user(), SEARCH_RESULT_LIMIT)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "partner search failed");
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn require_user(&self) -> Result<UserId> {
        self.backend.current_user().ok_or(ChatError::NotAuthenticated)
    }

    fn is_open(&self, conversation: ConversationId) -> bool {
        self.current.with(|c| c.as_ref().map(|c| c.id) == Some(conversation))
    }

    /// Verify the caller participates in `conversation` before any
    /// destructive work starts.
    async fn authorize_participant(&self, conversation: ConversationId) -> Result<UserId> {
        let me = self.require_user()?;
        let row = self
            .backend
            .conversations
            .fetch(conversation)
            .await?
            .ok_or(ChatError::Backend(BackendError::NotFound))?;
        if !row.involves(me) {
            return Err(ChatError::Unauthorized);
        }
        Ok(me)
    }

    /// Best-effort attachment cleanup, issued concurrently.  Individual
    /// failures are logged inside the pipeline and never bubble up.
    async fn cleanup_attachments(&self, conversation: ConversationId) -> Result<()> {
        let paths = self.backend.messages.attachment_paths(conversation).await?;
        futures::future::join_all(paths.iter().map(|p| self.media.remove(p))).await;
        Ok(())
    }

    /// Record a failure in the `last_error` cell on its way out.
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.last_error.set(Some(e.to_string()));
        }
        result
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        // View teardown cancels the subscription it owns.
        self.sync.close();
    }
}
