use std::sync::Arc;

use jurutani_shared::UserId;

use crate::identity::IdentityProvider;
use crate::realtime::Realtime;
use crate::records::{ConversationRecords, MessageRecords, ProfileRecords};
use crate::storage::ObjectStorage;

/// Aggregate handle over every external collaborator.
///
/// Constructed once at session start and passed into each component's
/// constructor -- there is no module-scoped singleton, and tests swap any
/// collaborator for a mock by building their own `Backend`.
#[derive(Clone)]
pub struct Backend {
    pub conversations: Arc<dyn ConversationRecords>,
    pub messages: Arc<dyn MessageRecords>,
    pub profiles: Arc<dyn ProfileRecords>,
    pub realtime: Arc<dyn Realtime>,
    pub storage: Arc<dyn ObjectStorage>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Backend {
    /// The authenticated caller, if any.
    pub fn current_user(&self) -> Option<UserId> {
        self.identity.current_user()
    }
}
