// Identity source: the signed-in user as seen by the tenant context

pub mod token;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::Identity;

pub use token::{identity_from_access_token, IdentityError};

/// Publishes identity changes. `None` means signed out.
///
/// Every call to `sign_in` / `sign_out` is an emission, even when the
/// identity did not change.
pub struct IdentitySource {
    sender: watch::Sender<Option<Identity>>,
}

impl IdentitySource {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn signed_in(identity: Identity) -> Self {
        let (sender, _) = watch::channel(Some(identity));
        Self { sender }
    }

    pub fn sign_in(&self, identity: Identity) {
        tracing::info!("Identity changed to user {}", identity.id);
        self.sender.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        tracing::info!("Identity cleared");
        self.sender.send_replace(None);
    }

    pub fn current(&self) -> Option<Identity> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.sender.subscribe()
    }
}

impl Default for IdentitySource {
    fn default() -> Self {
        Self::new()
    }
}

/// Running subscription of a context to an identity source; stops on drop
pub struct IdentitySubscription {
    handle: JoinHandle<()>,
}

impl IdentitySubscription {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for IdentitySubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
