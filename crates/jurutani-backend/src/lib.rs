//! # jurutani-backend
//!
//! The boundary to the hosted persistence/auth backend.  The engine never
//! talks to a concrete service directly: every external collaborator --
//! conversation and message tables, the realtime pub/sub channel, object
//! storage, caller identity -- is a trait here, and a [`Backend`] aggregate
//! is constructed once at session start and passed into each component.
//!
//! [`memory::MemoryBackend`] implements the whole surface in-process and is
//! the substrate for tests.

pub mod backend;
pub mod identity;
pub mod memory;
pub mod realtime;
pub mod records;
pub mod storage;

mod error;

pub use backend::Backend;
pub use error::{BackendError, Result};
pub use identity::{IdentityProvider, StaticIdentity};
pub use realtime::{MessageEvent, Realtime, Subscription};
pub use records::{
    ConversationRecords, MessageRecords, NewConversation, NewMessage, ProfileRecords,
};
pub use storage::ObjectStorage;
