//! Table-like record stores for conversations, messages and profiles.
//!
//! Implementations are expected to enforce row-level authorization
//! themselves (sender-only message deletes, participant-only conversation
//! deletes) even though the engine checks first: the store is not the only
//! line of defense, and neither is the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use jurutani_shared::{AttachmentRef, Conversation, ConversationId, Message, MessageId, Profile, UserId};

use crate::error::Result;

/// Insert payload for a conversation row.  The pair must already be in
/// canonical order; implementations reject duplicates with
/// [`BackendError::Conflict`](crate::BackendError::Conflict).
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub participant_a: UserId,
    pub participant_b: UserId,
}

/// Insert payload for a message row.
///
/// The id is chosen by the client so that the optimistic local entry and the
/// realtime echo of the persisted row share one key.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub attachment: Option<AttachmentRef>,
}

#[async_trait]
pub trait ConversationRecords: Send + Sync {
    /// Fetch a single conversation row.
    async fn fetch(&self, id: ConversationId) -> Result<Option<Conversation>>;

    /// Look up the conversation for a canonical participant pair.
    async fn find_by_pair(&self, a: UserId, b: UserId) -> Result<Option<Conversation>>;

    /// Insert a new conversation.  Fails with `Conflict` if a row for the
    /// pair already exists.
    async fn insert(&self, new: NewConversation) -> Result<Conversation>;

    /// Conversations where `user` is either participant, most recently
    /// updated first.
    async fn list_for(&self, user: UserId) -> Result<Vec<Conversation>>;

    /// Update the last-message preview and bump `updated_at`.
    async fn touch(&self, id: ConversationId, preview: Option<String>, at: DateTime<Utc>)
        -> Result<()>;

    /// Reset the preview after a conversation is cleared.
    async fn clear_preview(&self, id: ConversationId) -> Result<()>;

    /// Delete the conversation row.  `caller` must be a participant.
    async fn delete(&self, id: ConversationId, caller: UserId) -> Result<()>;
}

#[async_trait]
pub trait MessageRecords: Send + Sync {
    /// Messages in one conversation, ascending by `(created_at, id)`.
    /// `before` pages backwards through history.
    async fn fetch_page(
        &self,
        conversation: ConversationId,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Message>>;

    /// Fetch a single message row.
    async fn fetch(&self, id: MessageId) -> Result<Message>;

    /// Persist a message and publish the insert event on the conversation's
    /// feed.  Returns the authoritative row with the sender profile embedded.
    async fn insert(&self, new: NewMessage) -> Result<Message>;

    /// Delete one message.  `caller` must be the sender.
    async fn delete(&self, id: MessageId, caller: UserId) -> Result<()>;

    /// Delete every message in the conversation.
    async fn delete_all(&self, conversation: ConversationId) -> Result<()>;

    /// Storage paths of all attachments in the conversation, for cleanup
    /// before a bulk delete.
    async fn attachment_paths(&self, conversation: ConversationId) -> Result<Vec<String>>;

    /// Flip `read` to true on every unread message not sent by `reader`.
    /// Idempotent; never reverses a read flag.
    async fn mark_read(&self, conversation: ConversationId, reader: UserId) -> Result<()>;
}

#[async_trait]
pub trait ProfileRecords: Send + Sync {
    async fn fetch(&self, id: UserId) -> Result<Option<Profile>>;

    /// Case-insensitive substring search on display names.
    async fn search_by_name(
        &self,
        query: &str,
        exclude: Option<UserId>,
        limit: u32,
    ) -> Result<Vec<Profile>>;
}
