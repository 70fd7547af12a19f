//! Consent protocol: the consent state manager and its notifications.
//!
//! `ConsentManager` owns the live consent record: it loads or seeds the
//! persisted cookie, bootstraps the vendor tag with the resulting default,
//! applies updates, forwards them to `gtag`, and publishes a
//! `consent-updated` notification for each committed change.

pub mod consent;
pub mod notification;

pub use consent::ConsentManager;
pub use notification::{Listener, NotificationBus, SubscriptionId};
