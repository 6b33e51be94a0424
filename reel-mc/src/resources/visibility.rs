//! Visibility subscriptions
//!
//! `register` hands the presentation layer a `VisibilitySubscription` in
//! place of an observer callback. The subscription forwards visibility
//! transitions until it is disposed, dropped, or replaced by a re-register
//! of the same key; after that every notification is ignored.

use super::handle::ResourceKey;
use super::{ResourceManager, Shared};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Explicit handle for one registered descriptor
#[derive(Debug)]
pub struct VisibilitySubscription {
    key: ResourceKey,
    manager: Weak<Shared>,
    connected: Arc<AtomicBool>,
}

impl VisibilitySubscription {
    pub(crate) fn new(key: ResourceKey, manager: Weak<Shared>, connected: Arc<AtomicBool>) -> Self {
        Self {
            key,
            manager,
            connected,
        }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.manager.strong_count() > 0
    }

    /// Report a visibility transition
    ///
    /// Returns `true` when the descriptor is playing afterwards. Ignored once
    /// disconnected.
    pub async fn notify(&self, visible: bool) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        let Some(shared) = self.manager.upgrade() else {
            return false;
        };
        ResourceManager::from_shared(shared)
            .on_visibility_change(&self.key, visible)
            .await
    }

    /// Stop forwarding notifications; the descriptor itself stays registered
    pub fn dispose(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for VisibilitySubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}
