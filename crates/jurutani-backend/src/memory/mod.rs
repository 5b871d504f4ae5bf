//! Complete in-process implementation of the backend surface.
//!
//! Used as the test substrate and as the reference for the semantics every
//! hosted implementation must honor: the unique conversation-pair index,
//! sender-checked deletes, monotonic read flags, and event publication on
//! every message insert/delete.

pub mod pubsub;
pub mod storage;
pub mod tables;

use std::sync::Arc;

use jurutani_shared::UserId;

use crate::backend::Backend;
use crate::identity::StaticIdentity;

pub use pubsub::{EventHub, MemoryRealtime};
pub use storage::MemoryStorage;
pub use tables::{MemoryConversations, MemoryMessages, MemoryProfiles};

/// All in-memory collaborators wired together over one event hub.
pub struct MemoryBackend {
    pub conversations: Arc<MemoryConversations>,
    pub messages: Arc<MemoryMessages>,
    pub profiles: Arc<MemoryProfiles>,
    pub realtime: Arc<MemoryRealtime>,
    pub storage: Arc<MemoryStorage>,
    pub hub: Arc<EventHub>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let hub = Arc::new(EventHub::new());
        let profiles = Arc::new(MemoryProfiles::new());

        Self {
            conversations: Arc::new(MemoryConversations::new(Arc::clone(&profiles))),
            messages: Arc::new(MemoryMessages::new(Arc::clone(&profiles), Arc::clone(&hub))),
            profiles,
            realtime: Arc::new(MemoryRealtime::new(Arc::clone(&hub))),
            storage: Arc::new(MemoryStorage::new()),
            hub,
        }
    }

    /// A [`Backend`] handle bound to `user` as the caller.
    ///
    /// Several handles over one `MemoryBackend` simulate concurrent tabs or
    /// devices sharing a hosted backend.
    pub fn backend_as(&self, user: UserId) -> Backend {
        self.backend_with(Arc::new(StaticIdentity::logged_in(user)))
    }

    /// A handle with no caller identity, for exercising `NotAuthenticated`.
    pub fn backend_anonymous(&self) -> Backend {
        self.backend_with(Arc::new(StaticIdentity::anonymous()))
    }

    fn backend_with(&self, identity: Arc<StaticIdentity>) -> Backend {
        Backend {
            conversations: Arc::clone(&self.conversations) as _,
            messages: Arc::clone(&self.messages) as _,
            profiles: Arc::clone(&self.profiles) as _,
            realtime: Arc::clone(&self.realtime) as _,
            storage: Arc::clone(&self.storage) as _,
            identity,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}
