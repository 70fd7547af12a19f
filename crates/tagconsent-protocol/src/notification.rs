//! `consent-updated` notification channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use tagconsent_core::{ConsentEventKey, ConsentEventMode, ConsentNotification, ConsentRecord};

/// Callback invoked for every dispatched notification.
pub type Listener = Arc<dyn Fn(&ConsentNotification) + Send + Sync>;

/// Handle returned by [`NotificationBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static GLOBAL_BUS: Lazy<Arc<NotificationBus>> = Lazy::new(|| Arc::new(NotificationBus::new()));

/// Synchronous in-process publish/subscribe channel.
///
/// Delivery is fire-and-forget, in `notify` call order, to the listeners
/// registered at the time of the call.
pub struct NotificationBus {
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The process-wide channel.
    pub fn global() -> Arc<NotificationBus> {
        GLOBAL_BUS.clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ConsentNotification) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Detach a listener. Returns `false` if it was not attached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Build a timestamped notification and dispatch it.
    pub fn notify(
        &self,
        key: impl Into<ConsentEventKey>,
        mode: impl Into<ConsentEventMode>,
        state: ConsentRecord,
    ) -> ConsentNotification {
        let notification = ConsentNotification::new(key, mode, state);
        self.dispatch(&notification);
        notification
    }

    pub fn dispatch(&self, notification: &ConsentNotification) {
        // Snapshot so listeners may (un)subscribe from inside the callback.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        debug!(
            "consent-updated {:?}={:?} -> {} listeners",
            notification.key,
            notification.mode,
            listeners.len()
        );
        for listener in listeners {
            listener(notification);
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}
