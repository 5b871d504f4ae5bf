use jurutani_shared::UserId;

/// Ambient caller identity, resolved before any operation that needs it.
///
/// Absence of an identity is a first-class condition the engine maps to
/// `NotAuthenticated`, never a panic.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Fixed identity, for tests and single-user embeddings.
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn logged_in(user: UserId) -> Self {
        Self(Some(user))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0
    }
}
