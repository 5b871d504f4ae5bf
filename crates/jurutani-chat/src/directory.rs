//! Conversation lookup and creation.

use tracing::debug;

use jurutani_backend::{Backend, BackendError, ConversationRecords, NewConversation};
use jurutani_shared::{canonical_pair, Conversation, UserId};

use crate::error::{ChatError, Result};

pub struct ConversationDirectory {
    backend: Backend,
}

impl ConversationDirectory {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Resolve the conversation between the caller and `other`, creating it
    /// on first contact.
    ///
    /// Race-safe: when a concurrent caller creates the row between our
    /// lookup and our insert, the unique-pair conflict is answered with a
    /// re-fetch, so both callers converge on the same conversation.
    pub async fn get_or_create(&self, other: UserId) -> Result<Conversation> {
        let me = self
            .backend
            .current_user()
            .ok_or(ChatError::NotAuthenticated)?;
        let (a, b) = canonical_pair(me, other);

        if let Some(existing) = self.backend.conversations.find_by_pair(a, b).await? {
            return Ok(existing);
        }

        match self
            .backend
            .conversations
            .insert(NewConversation {
                participant_a: a,
                participant_b: b,
            })
            .await
        {
            Ok(created) => Ok(created),
            Err(BackendError::Conflict(_)) => {
                debug!(%a, %b, "lost conversation-create race, re-fetching");
                self.backend
                    .conversations
                    .find_by_pair(a, b)
                    .await?
                    .ok_or(ChatError::Backend(BackendError::NotFound))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Conversations involving the caller, most recently updated first.
    pub async fn list(&self) -> Result<Vec<Conversation>> {
        let me = self
            .backend
            .current_user()
            .ok_or(ChatError::NotAuthenticated)?;
        Ok(self.backend.conversations.list_for(me).await?)
    }
}
