//! Unread counting.  The persistent read-flag transition lives behind
//! [`MessageRecords::mark_read`](jurutani_backend::MessageRecords::mark_read)
//! and is driven from the session.

use std::collections::HashMap;

use jurutani_shared::{ConversationId, Message, UserId};

/// Messages `viewer` has not read yet (their own never count).
pub fn unread_count(messages: &[Message], viewer: UserId) -> usize {
    messages
        .iter()
        .filter(|m| !m.read && m.sender_id != viewer)
        .count()
}

/// Unread counts per conversation over a mixed message set.
pub fn unread_by_conversation(
    messages: &[Message],
    viewer: UserId,
) -> HashMap<ConversationId, usize> {
    let mut counts = HashMap::new();
    for m in messages {
        if !m.read && m.sender_id != viewer {
            *counts.entry(m.conversation_id).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jurutani_shared::MessageId;

    fn message(conversation: ConversationId, sender: UserId, read: bool) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: conversation,
            sender_id: sender,
            content: "Halo".to_string(),
            attachment: None,
            created_at: Utc::now(),
            read,
            sender: None,
            pending: false,
        }
    }

    #[test]
    fn own_and_read_messages_do_not_count() {
        let me = UserId::new();
        let partner = UserId::new();
        let conversation = ConversationId::new();

        let messages = vec![
            message(conversation, partner, false),
            message(conversation, partner, true),
            message(conversation, me, false),
        ];

        assert_eq!(unread_count(&messages, me), 1);
        assert_eq!(unread_count(&messages, partner), 1);
    }

    #[test]
    fn counts_split_by_conversation() {
        let me = UserId::new();
        let partner = UserId::new();
        let first = ConversationId::new();
        let second = ConversationId::new();

        let messages = vec![
            message(first, partner, false),
            message(first, partner, false),
            message(second, partner, false),
        ];

        let counts = unread_by_conversation(&messages, me);
        assert_eq!(counts[&first], 2);
        assert_eq!(counts[&second], 1);
    }
}
