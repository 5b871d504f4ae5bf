/// MIME types accepted for message attachments.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Maximum attachment size in bytes (10 MiB), checked before compression.
pub const MAX_ATTACHMENT_SIZE: usize = 10 * 1024 * 1024;

/// Maximum width of an uploaded image after recompression.
pub const MAX_IMAGE_WIDTH: u32 = 800;

/// Maximum height of an uploaded image after recompression.
pub const MAX_IMAGE_HEIGHT: u32 = 600;

/// JPEG quality factor used when re-encoding attachments.
pub const JPEG_QUALITY: u8 = 80;

/// Object-storage prefix (bucket) for chat attachments.
pub const STORAGE_PREFIX: &str = "chat-images";

/// Conversation preview text for a message that carries only an image.
pub const IMAGE_PREVIEW: &str = "\u{1F4F7} Image";

/// Default number of messages fetched per history page.
pub const HISTORY_PAGE_SIZE: u32 = 50;

/// Advisory upper bound on message length, enforced by the UI.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Minimum significant characters before a partner search hits the backend.
pub const SEARCH_MIN_CHARS: usize = 2;

/// Maximum rows returned by a partner search.
pub const SEARCH_RESULT_LIMIT: u32 = 10;
