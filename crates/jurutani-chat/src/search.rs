//! Pure, synchronous filtering over already-loaded data.
//!
//! No I/O and no mutation: callers keep their collections, these functions
//! return filtered views.

use jurutani_shared::{Conversation, Message, UserId};

/// Conversations whose partner name or last-message preview contains
/// `query` (case-insensitive).  An empty or whitespace query matches all.
pub fn filter_conversations<'a>(
    conversations: &'a [Conversation],
    query: &str,
    viewer: UserId,
) -> Vec<&'a Conversation> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return conversations.iter().collect();
    }

    conversations
        .iter()
        .filter(|c| {
            let partner = c
                .partner_profile(viewer)
                .map(|p| p.full_name.to_lowercase())
                .unwrap_or_default();
            let preview = c
                .last_message
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or_default();
            partner.contains(&needle) || preview.contains(&needle)
        })
        .collect()
}

/// Messages whose content contains `query` (case-insensitive).
pub fn filter_messages<'a>(messages: &'a [Message], query: &str) -> Vec<&'a Message> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return messages.iter().collect();
    }

    messages
        .iter()
        .filter(|m| m.content.to_lowercase().contains(&needle))
        .collect()
}
