//! The local ordered message list for the open conversation.
//!
//! Two writers race to insert the same logical message: the sending view's
//! optimistic path and the sync worker applying the realtime echo.  Both go
//! through [`Timeline::apply_insert`], which dedupes by id, so whichever
//! arrives second is a no-op (or a promotion of the pending placeholder).

use std::cmp::Ordering;

use jurutani_shared::{Message, MessageId, UserId};

/// Total order within a conversation: creation time, ties broken by id.
fn message_order(a: &Message, b: &Message) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    messages: Vec<Message>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a timeline from a history page, deduped and sorted.
    pub fn from_history(rows: Vec<Message>) -> Self {
        let mut timeline = Self::new();
        for row in rows {
            timeline.apply_insert(row);
        }
        timeline
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Insert `msg` unless a message with the same id is already present.
    ///
    /// An existing pending entry is promoted in place by the authoritative
    /// row (same id, `pending` cleared); a duplicate of a settled entry is
    /// ignored.  Returns whether the list changed.
    pub fn apply_insert(&mut self, msg: Message) -> bool {
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == msg.id) {
            if existing.pending && !msg.pending {
                *existing = msg;
                self.messages.sort_by(message_order);
                return true;
            }
            return false;
        }

        let at = self
            .messages
            .partition_point(|m| message_order(m, &msg) == Ordering::Less);
        self.messages.insert(at, msg);
        true
    }

    /// Remove the message with `id`.  Removing an absent id is a no-op.
    pub fn remove(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    /// Merge an older history page into the list.
    pub fn merge_history(&mut self, rows: Vec<Message>) {
        for row in rows {
            self.apply_insert(row);
        }
    }

    /// Flip every message not sent by `reader` to read.
    pub fn mark_read_from(&mut self, reader: UserId) {
        for m in &mut self.messages {
            if m.sender_id != reader {
                m.read = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jurutani_shared::ConversationId;

    fn message(at_offset_secs: i64, pending: bool) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: ConversationId::new(),
            sender_id: UserId::new(),
            content: "Halo".to_string(),
            attachment: None,
            created_at: Utc::now() + Duration::seconds(at_offset_secs),
            read: false,
            sender: None,
            pending,
        }
    }

    #[test]
    fn inserts_keep_creation_order() {
        let mut timeline = Timeline::new();
        let late = message(10, false);
        let early = message(0, false);

        timeline.apply_insert(late.clone());
        timeline.apply_insert(early.clone());

        let ids: Vec<MessageId> = timeline.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut timeline = Timeline::new();
        let msg = message(0, false);

        assert!(timeline.apply_insert(msg.clone()));
        assert!(!timeline.apply_insert(msg.clone()));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn echo_promotes_the_pending_entry() {
        let mut timeline = Timeline::new();
        let mut optimistic = message(0, true);
        timeline.apply_insert(optimistic.clone());

        // The authoritative row shares the id but carries the backend's
        // timestamp and read flag.
        optimistic.pending = false;
        optimistic.created_at = optimistic.created_at + Duration::seconds(1);
        assert!(timeline.apply_insert(optimistic.clone()));

        assert_eq!(timeline.len(), 1);
        let settled = timeline.get(optimistic.id).unwrap();
        assert!(!settled.pending);
        assert_eq!(settled.created_at, optimistic.created_at);
    }

    #[test]
    fn a_settled_entry_is_never_demoted_by_a_late_echo() {
        let mut timeline = Timeline::new();
        let msg = message(0, false);
        timeline.apply_insert(msg.clone());

        let mut echo = msg.clone();
        echo.pending = true;
        assert!(!timeline.apply_insert(echo));
        assert!(!timeline.get(msg.id).unwrap().pending);
    }

    #[test]
    fn removing_an_absent_id_is_a_no_op() {
        let mut timeline = Timeline::new();
        let msg = message(0, false);
        timeline.apply_insert(msg.clone());

        assert!(!timeline.remove(MessageId::new()));
        assert_eq!(timeline.len(), 1);
        assert!(timeline.remove(msg.id));
        assert!(timeline.is_empty());
    }

    #[test]
    fn ties_on_creation_time_break_by_id() {
        let now = Utc::now();
        let mut a = message(0, false);
        let mut b = message(0, false);
        a.created_at = now;
        b.created_at = now;

        let mut timeline = Timeline::new();
        timeline.apply_insert(a.clone());
        timeline.apply_insert(b.clone());

        let expected = if a.id <= b.id { [a.id, b.id] } else { [b.id, a.id] };
        let ids: Vec<MessageId> = timeline.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn mark_read_skips_the_readers_own_messages() {
        let reader = UserId::new();
        let mut mine = message(0, false);
        mine.sender_id = reader;
        let theirs = message(1, false);

        let mut timeline = Timeline::new();
        timeline.apply_insert(mine.clone());
        timeline.apply_insert(theirs.clone());
        timeline.mark_read_from(reader);

        assert!(!timeline.get(mine.id).unwrap().read);
        assert!(timeline.get(theirs.id).unwrap().read);
    }
}
