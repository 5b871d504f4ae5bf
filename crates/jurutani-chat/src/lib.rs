//! # jurutani-chat
//!
//! The JuruTani direct-messaging engine: conversation directory, message
//! timeline, realtime sync, read-state tracking, and local search over the
//! synchronized data.
//!
//! The UI layer consumes a [`ChatSession`]: observable state cells for the
//! conversation list and the open conversation's messages, plus imperative
//! operations for send/delete/mark-read.  All backend access goes through
//! the [`Backend`](jurutani_backend::Backend) handle the session is
//! constructed with.

pub mod cell;
pub mod directory;
pub mod format;
pub mod read_state;
pub mod search;
pub mod session;
pub mod sync;
pub mod timeline;

mod error;

pub use cell::StateCell;
pub use directory::ConversationDirectory;
pub use error::{ChatError, Result};
pub use session::ChatSession;
pub use sync::SyncStatus;
pub use timeline::Timeline;
