//! Domain model structs for conversations and messages.
//!
//! `Conversation` and `Message` mirror the backend rows; `Profile` carries
//! the denormalized sender/participant display fields embedded in reads so
//! the UI can render without a join.  Embedded profiles are not
//! authoritative and may be stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::IMAGE_PREVIEW;
use crate::types::{ConversationId, MessageId, UserId};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Display fields for a participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub role: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// The unique thread between two participants.
///
/// The participant pair is stored canonically (`participant_a` below
/// `participant_b` in UUID order) so that the unordered-pair invariant is a
/// plain unique key: A↔B and B↔A always resolve to the same row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participant_a: UserId,
    pub participant_b: UserId,
    /// Denormalized display fields for `participant_a`, if the read embedded them.
    #[serde(default)]
    pub profile_a: Option<Profile>,
    /// Denormalized display fields for `participant_b`, if the read embedded them.
    #[serde(default)]
    pub profile_b: Option<Profile>,
    /// Text preview of the most recent message.
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Whether `user` is one of the two participants.
    pub fn involves(&self, user: UserId) -> bool {
        self.participant_a == user || self.participant_b == user
    }

    /// The other participant's id, from `viewer`'s side.
    pub fn partner_id(&self, viewer: UserId) -> UserId {
        if self.participant_a == viewer {
            self.participant_b
        } else {
            self.participant_a
        }
    }

    /// The other participant's profile, if embedded.
    pub fn partner_profile(&self, viewer: UserId) -> Option<&Profile> {
        if self.participant_a == viewer {
            self.profile_b.as_ref()
        } else {
            self.profile_a.as_ref()
        }
    }
}

/// Order a pair of participants into canonical (a, b) form.
pub fn canonical_pair(x: UserId, y: UserId) -> (UserId, UserId) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
///
/// A message always has non-empty trimmed content or an attachment, never
/// neither.  Within a conversation messages are totally ordered by
/// `(created_at, id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(default)]
    pub attachment: Option<AttachmentRef>,
    pub created_at: DateTime<Utc>,
    /// Set by the receiving participant, monotonic unread→read.
    pub read: bool,
    /// Denormalized sender display fields, if the read embedded them.
    #[serde(default)]
    pub sender: Option<Profile>,
    /// Client-only marker for an optimistic entry not yet confirmed by the
    /// backend.  Never persisted.
    #[serde(skip)]
    pub pending: bool,
}

impl Message {
    pub fn is_own(&self, viewer: UserId) -> bool {
        self.sender_id == viewer
    }

    /// Text used for the parent conversation's preview.
    pub fn preview_text(&self) -> String {
        let trimmed = self.content.trim();
        if trimmed.is_empty() && self.attachment.is_some() {
            IMAGE_PREVIEW.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Attachment reference
// ---------------------------------------------------------------------------

/// Pointer into object storage for a message attachment.
///
/// Owned by its message: removed (best effort) when the message is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Storage path, unique per (sender, upload time) by construction.
    pub path: String,
    /// Publicly resolvable URL for display.
    pub url: String,
}
