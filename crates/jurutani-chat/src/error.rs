use thiserror::Error;

use jurutani_backend::BackendError;
use jurutani_media::MediaError;

/// Errors surfaced by chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    /// No caller identity is available.
    #[error("No authenticated user")]
    NotAuthenticated,

    /// The message has neither content nor an attachment.
    #[error("Message has no content or attachment")]
    EmptyMessage,

    /// The caller does not own the conversation or message.
    #[error("Not permitted for this caller")]
    Unauthorized,

    /// Attachment validation or upload failure; the send was aborted.
    #[error("Attachment error: {0}")]
    Media(#[from] MediaError),

    /// The message row could not be persisted; the optimistic entry was
    /// rolled back.
    #[error("Failed to send message: {0}")]
    SendFailed(#[source] BackendError),

    /// Generic persistence / network failure.
    #[error("Backend error: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for ChatError {
    fn from(e: BackendError) -> Self {
        match e {
            // The persistence layer runs its own authorization checks as a
            // second line of defense; keep the refusal recognizable.
            BackendError::Unauthorized => ChatError::Unauthorized,
            other => ChatError::Backend(other),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatError>;
