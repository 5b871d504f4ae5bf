//! In-memory record tables for conversations, messages and profiles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use jurutani_shared::{
    canonical_pair, Conversation, ConversationId, Message, MessageId, Profile, UserId,
};

use crate::error::{BackendError, Result};
use crate::realtime::MessageEvent;
use crate::records::{
    ConversationRecords, MessageRecords, NewConversation, NewMessage, ProfileRecords,
};

use super::pubsub::EventHub;

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

pub struct MemoryProfiles {
    rows: Mutex<HashMap<UserId, Profile>>,
}

impl MemoryProfiles {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    /// Seed or replace a profile row.
    pub fn upsert(&self, profile: Profile) {
        self.rows
            .lock()
            .expect("profiles lock poisoned")
            .insert(profile.id, profile);
    }

    fn get(&self, id: UserId) -> Option<Profile> {
        self.rows
            .lock()
            .expect("profiles lock poisoned")
            .get(&id)
            .cloned()
    }
}

impl Default for MemoryProfiles {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileRecords for MemoryProfiles {
    async fn fetch(&self, id: UserId) -> Result<Option<Profile>> {
        Ok(self.get(id))
    }

    async fn search_by_name(
        &self,
        query: &str,
        exclude: Option<UserId>,
        limit: u32,
    ) -> Result<Vec<Profile>> {
        let needle = query.trim().to_lowercase();
        let rows = self.rows.lock().expect("profiles lock poisoned");

        let mut hits: Vec<Profile> = rows
            .values()
            .filter(|p| Some(p.id) != exclude)
            .filter(|p| p.full_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        hits.truncate(limit as usize);
        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

pub struct MemoryConversations {
    rows: Mutex<HashMap<ConversationId, Conversation>>,
    profiles: Arc<MemoryProfiles>,
}

impl MemoryConversations {
    pub fn new(profiles: Arc<MemoryProfiles>) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            profiles,
        }
    }

    /// Attach participant display fields, the way a hosted read would join
    /// them in.
    fn decorate(&self, mut conv: Conversation) -> Conversation {
        conv.profile_a = self.profiles.get(conv.participant_a);
        conv.profile_b = self.profiles.get(conv.participant_b);
        conv
    }
}

#[async_trait]
impl ConversationRecords for MemoryConversations {
    async fn fetch(&self, id: ConversationId) -> Result<Option<Conversation>> {
        let found = {
            let rows = self.rows.lock().expect("conversations lock poisoned");
            rows.get(&id).cloned()
        };
        Ok(found.map(|c| self.decorate(c)))
    }

    async fn find_by_pair(&self, a: UserId, b: UserId) -> Result<Option<Conversation>> {
        let (a, b) = canonical_pair(a, b);
        let found = {
            let rows = self.rows.lock().expect("conversations lock poisoned");
            rows.values()
                .find(|c| c.participant_a == a && c.participant_b == b)
                .cloned()
        };
        Ok(found.map(|c| self.decorate(c)))
    }

    async fn insert(&self, new: NewConversation) -> Result<Conversation> {
        let (a, b) = canonical_pair(new.participant_a, new.participant_b);
        let now = Utc::now();
        let row = {
            let mut rows = self.rows.lock().expect("conversations lock poisoned");
            if rows
                .values()
                .any(|c| c.participant_a == a && c.participant_b == b)
            {
                return Err(BackendError::Conflict(format!(
                    "conversation for pair ({a}, {b}) already exists"
                )));
            }

            let row = Conversation {
                id: ConversationId::new(),
                participant_a: a,
                participant_b: b,
                profile_a: None,
                profile_b: None,
                last_message: None,
                last_message_at: None,
                created_at: now,
                updated_at: now,
            };
            rows.insert(row.id, row.clone());
            row
        };
        Ok(self.decorate(row))
    }

    async fn list_for(&self, user: UserId) -> Result<Vec<Conversation>> {
        let mut list: Vec<Conversation> = {
            let rows = self.rows.lock().expect("conversations lock poisoned");
            rows.values().filter(|c| c.involves(user)).cloned().collect()
        };
        list.sort_by(|x, y| y.updated_at.cmp(&x.updated_at));
        Ok(list.into_iter().map(|c| self.decorate(c)).collect())
    }

    async fn touch(
        &self,
        id: ConversationId,
        preview: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().expect("conversations lock poisoned");
        let row = rows.get_mut(&id).ok_or(BackendError::NotFound)?;
        row.last_message = preview;
        row.last_message_at = Some(at);
        row.updated_at = at;
        Ok(())
    }

    async fn clear_preview(&self, id: ConversationId) -> Result<()> {
        let mut rows = self.rows.lock().expect("conversations lock poisoned");
        let row = rows.get_mut(&id).ok_or(BackendError::NotFound)?;
        row.last_message = None;
        row.last_message_at = None;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: ConversationId, caller: UserId) -> Result<()> {
        let mut rows = self.rows.lock().expect("conversations lock poisoned");
        let row = rows.get(&id).ok_or(BackendError::NotFound)?;
        if !row.involves(caller) {
            return Err(BackendError::Unauthorized);
        }
        rows.remove(&id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub struct MemoryMessages {
    rows: Mutex<HashMap<MessageId, Message>>,
    profiles: Arc<MemoryProfiles>,
    hub: Arc<EventHub>,
}

impl MemoryMessages {
    pub fn new(profiles: Arc<MemoryProfiles>, hub: Arc<EventHub>) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            profiles,
            hub,
        }
    }
}

#[async_trait]
impl MessageRecords for MemoryMessages {
    async fn fetch_page(
        &self,
        conversation: ConversationId,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let mut page: Vec<Message> = {
            let rows = self.rows.lock().expect("messages lock poisoned");
            rows.values()
                .filter(|m| m.conversation_id == conversation)
                .filter(|m| before.map_or(true, |cursor| m.created_at < cursor))
                .cloned()
                .collect()
        };
        page.sort_by(|x, y| x.created_at.cmp(&y.created_at).then(x.id.cmp(&y.id)));

        // Most recent `limit` rows, still in ascending order.
        let skip = page.len().saturating_sub(limit as usize);
        Ok(page.split_off(skip))
    }

    async fn fetch(&self, id: MessageId) -> Result<Message> {
        let rows = self.rows.lock().expect("messages lock poisoned");
        rows.get(&id).cloned().ok_or(BackendError::NotFound)
    }

    async fn insert(&self, new: NewMessage) -> Result<Message> {
        let row = Message {
            id: new.id,
            conversation_id: new.conversation_id,
            sender_id: new.sender_id,
            content: new.content,
            attachment: new.attachment,
            created_at: Utc::now(),
            read: false,
            sender: self.profiles.get(new.sender_id),
            pending: false,
        };

        {
            let mut rows = self.rows.lock().expect("messages lock poisoned");
            if rows.contains_key(&row.id) {
                return Err(BackendError::Conflict(format!(
                    "message {} already exists",
                    row.id
                )));
            }
            rows.insert(row.id, row.clone());
        }

        self.hub
            .publish(row.conversation_id, MessageEvent::Inserted(row.clone()));
        Ok(row)
    }

    async fn delete(&self, id: MessageId, caller: UserId) -> Result<()> {
        let conversation = {
            let mut rows = self.rows.lock().expect("messages lock poisoned");
            let row = rows.get(&id).ok_or(BackendError::NotFound)?;
            if row.sender_id != caller {
                return Err(BackendError::Unauthorized);
            }
            let conversation = row.conversation_id;
            rows.remove(&id);
            conversation
        };
        self.hub.publish(conversation, MessageEvent::Deleted(id));
        Ok(())
    }

    async fn delete_all(&self, conversation: ConversationId) -> Result<()> {
        let removed: Vec<MessageId> = {
            let mut rows = self.rows.lock().expect("messages lock poisoned");
            let ids: Vec<MessageId> = rows
                .values()
                .filter(|m| m.conversation_id == conversation)
                .map(|m| m.id)
                .collect();
            for id in &ids {
                rows.remove(id);
            }
            ids
        };
        for id in removed {
            self.hub.publish(conversation, MessageEvent::Deleted(id));
        }
        Ok(())
    }

    async fn attachment_paths(&self, conversation: ConversationId) -> Result<Vec<String>> {
        let rows = self.rows.lock().expect("messages lock poisoned");
        Ok(rows
            .values()
            .filter(|m| m.conversation_id == conversation)
            .filter_map(|m| m.attachment.as_ref().map(|a| a.path.clone()))
            .collect())
    }

    async fn mark_read(&self, conversation: ConversationId, reader: UserId) -> Result<()> {
        let mut rows = self.rows.lock().expect("messages lock poisoned");
        for row in rows.values_mut() {
            if row.conversation_id == conversation && row.sender_id != reader && !row.read {
                row.read = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> (Arc<MemoryProfiles>, MemoryConversations, MemoryMessages) {
        let profiles = Arc::new(MemoryProfiles::new());
        let hub = Arc::new(EventHub::new());
        let conversations = MemoryConversations::new(Arc::clone(&profiles));
        let messages = MemoryMessages::new(Arc::clone(&profiles), hub);
        (profiles, conversations, messages)
    }

    fn new_message(conversation: ConversationId, sender: UserId, content: &str) -> NewMessage {
        NewMessage {
            id: MessageId::new(),
            conversation_id: conversation,
            sender_id: sender,
            content: content.to_string(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn pair_is_unique_regardless_of_order() {
        let (_, conversations, _) = tables();
        let a = UserId::new();
        let b = UserId::new();

        conversations
            .insert(NewConversation {
                participant_a: a,
                participant_b: b,
            })
            .await
            .unwrap();

        // The reversed pair hits the same unique key.
        let err = conversations
            .insert(NewConversation {
                participant_a: b,
                participant_b: a,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict(_)));

        let found = conversations.find_by_pair(b, a).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn list_orders_by_recency() {
        let (_, conversations, _) = tables();
        let me = UserId::new();

        let old = conversations
            .insert(NewConversation {
                participant_a: me,
                participant_b: UserId::new(),
            })
            .await
            .unwrap();
        let recent = conversations
            .insert(NewConversation {
                participant_a: me,
                participant_b: UserId::new(),
            })
            .await
            .unwrap();

        conversations
            .touch(recent.id, Some("Halo".to_string()), Utc::now())
            .await
            .unwrap();
        // Push the older one even further back.
        conversations
            .touch(old.id, None, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();

        let list = conversations.list_for(me).await.unwrap();
        assert_eq!(list[0].id, recent.id);
        assert_eq!(list[1].id, old.id);
    }

    #[tokio::test]
    async fn only_the_sender_may_delete() {
        let (_, _, messages) = tables();
        let sender = UserId::new();
        let other = UserId::new();
        let conversation = ConversationId::new();

        let row = messages
            .insert(new_message(conversation, sender, "Halo"))
            .await
            .unwrap();

        let err = messages.delete(row.id, other).await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized));
        assert!(messages.fetch(row.id).await.is_ok());

        messages.delete(row.id, sender).await.unwrap();
        assert!(matches!(
            messages.fetch(row.id).await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_skips_own_messages() {
        let (_, _, messages) = tables();
        let me = UserId::new();
        let partner = UserId::new();
        let conversation = ConversationId::new();

        let theirs = messages
            .insert(new_message(conversation, partner, "Halo"))
            .await
            .unwrap();
        let mine = messages
            .insert(new_message(conversation, me, "Halo juga"))
            .await
            .unwrap();

        messages.mark_read(conversation, me).await.unwrap();
        messages.mark_read(conversation, me).await.unwrap();

        assert!(messages.fetch(theirs.id).await.unwrap().read);
        // My own message is still unread from the partner's side.
        assert!(!messages.fetch(mine.id).await.unwrap().read);
    }

    #[tokio::test]
    async fn fetch_page_is_ascending_with_cursor() {
        let (_, _, messages) = tables();
        let sender = UserId::new();
        let conversation = ConversationId::new();

        let mut ids = Vec::new();
        for i in 0..5 {
            let row = messages
                .insert(new_message(conversation, sender, &format!("pesan {i}")))
                .await
                .unwrap();
            ids.push(row.id);
            // Distinct timestamps so the page boundaries are deterministic.
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let page = messages.fetch_page(conversation, None, 3).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].id, ids[2]);
        assert_eq!(page[2].id, ids[4]);
        assert!(page.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let older = messages
            .fetch_page(conversation, Some(page[0].created_at), 10)
            .await
            .unwrap();
        assert_eq!(older.iter().map(|m| m.id).collect::<Vec<_>>(), &ids[..2]);
    }

    #[tokio::test]
    async fn reads_embed_sender_profiles() {
        let (profiles, _, messages) = tables();
        let sender = UserId::new();
        profiles.upsert(Profile {
            id: sender,
            full_name: "Pak Tani".to_string(),
            avatar_url: None,
            role: Some("petani".to_string()),
        });

        let row = messages
            .insert(new_message(ConversationId::new(), sender, "Halo"))
            .await
            .unwrap();
        assert_eq!(row.sender.unwrap().full_name, "Pak Tani");
    }
}
