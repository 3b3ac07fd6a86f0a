//! Active-user identity for the synchronization layer.
//!
//! The identity is supplied from outside (an authentication session owned by
//! the embedding application); this layer only observes it. Channels read
//! the current value at call time and the engine watches for sign-in
//! transitions.

use tokio::sync::watch;

/// Opaque user identifier assigned by the authentication backend.
pub type UserId = String;

/// Source of the active-user identity.
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in user, if any.
    fn current(&self) -> Option<UserId>;

    /// Subscribe to identity changes. The receiver observes every
    /// sign-in/sign-out edge after the point of subscription.
    fn subscribe(&self) -> watch::Receiver<Option<UserId>>;
}

/// Watch-backed identity provider driven by the embedding application's
/// session lifecycle.
pub struct SessionIdentity {
    tx: watch::Sender<Option<UserId>>,
}

impl SessionIdentity {
    /// Create a provider with an initial session state.
    pub fn new(initial: Option<UserId>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Create a provider with no signed-in user.
    pub fn signed_out() -> Self {
        Self::new(None)
    }

    /// Mark a user as signed in.
    pub fn sign_in(&self, user_id: impl Into<UserId>) {
        self.tx.send_replace(Some(user_id.into()));
    }

    /// Clear the active session.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

impl IdentityProvider for SessionIdentity {
    fn current(&self) -> Option<UserId> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.tx.subscribe()
    }
}
