//! Consent state manager: owns the live consent record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::notification::NotificationBus;
use tagconsent_core::{
    ConsentCategory, ConsentConfig, ConsentEventKey, ConsentEventMode, ConsentMode, ConsentRecord,
    Error, FailurePolicy, PartialConsent, Result,
};
use tagconsent_store::{ConsentCookie, CookieStore};
use tagconsent_tag::{Document, GtagCommand, GtagDispatcher, TagBootstrapper, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Ready { is_new_user: bool },
}

/// A mutation queued for the bulk path: the resulting record, the delta
/// forwarded to gtag, and the notifications to publish.
struct BulkChange {
    op: &'static str,
    next: ConsentRecord,
    delta: PartialConsent,
    events: Vec<(ConsentEventKey, ConsentEventMode)>,
    page_view: bool,
    notify_first: bool,
}

/// Manages the consent record for one vendor integration.
///
/// Build with [`ConsentManager::create`] (ready on return) or
/// [`ConsentManager::new`] followed by [`ConsentManager::initialize`].
/// Every mutation is safe to call as soon as `create` returns.
pub struct ConsentManager {
    config: ConsentConfig,
    persistence: ConsentCookie,
    tag: TagBootstrapper,
    document: Arc<dyn Document>,
    window: Arc<dyn Window>,
    bus: Arc<NotificationBus>,
    state: RwLock<ConsentRecord>,
    phase: RwLock<Phase>,
    init_lock: tokio::sync::Mutex<()>,
    /// Held from reading the live record until the mutation is published.
    op_lock: tokio::sync::Mutex<()>,
    /// Set once this manager has seeded the cookie, kept across failed
    /// initialization attempts.
    seeded: AtomicBool,
}

impl ConsentManager {
    /// Create an uninitialized manager publishing on the global bus.
    pub fn new(
        config: ConsentConfig,
        store: Arc<dyn CookieStore>,
        document: Arc<dyn Document>,
        window: Arc<dyn Window>,
    ) -> Self {
        let persistence = ConsentCookie::from_config(store, &config);
        let tag = TagBootstrapper::new(&config);
        Self {
            config,
            persistence,
            tag,
            document,
            window,
            bus: NotificationBus::global(),
            state: RwLock::new(ConsentRecord::denied()),
            phase: RwLock::new(Phase::Uninitialized),
            init_lock: tokio::sync::Mutex::new(()),
            op_lock: tokio::sync::Mutex::new(()),
            seeded: AtomicBool::new(false),
        }
    }

    /// Publish on `bus` instead of the global channel.
    pub fn with_bus(mut self, bus: Arc<NotificationBus>) -> Self {
        self.bus = bus;
        self
    }

    /// Create and fully initialize a manager.
    pub async fn create(
        config: ConsentConfig,
        store: Arc<dyn CookieStore>,
        document: Arc<dyn Document>,
        window: Arc<dyn Window>,
    ) -> Result<Self> {
        let manager = Self::new(config, store, document, window);
        manager.initialize().await?;
        Ok(manager)
    }

    /// Load or seed the persisted record, then bootstrap the vendor tag.
    ///
    /// Runs once; later calls return immediately.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;
        if self.is_ready() {
            return Ok(());
        }
        self.config.validate()?;

        let record = match self.persistence.load().await {
            Some(record) => record,
            None => {
                let record = ConsentRecord::denied();
                self.persistence.save(&record, self.config.ttl_days).await?;
                self.seeded.store(true, Ordering::SeqCst);
                record
            }
        };
        // A retry after a failed bootstrap finds our own seed cookie.
        let is_new_user = self.seeded.load(Ordering::SeqCst);

        self.tag.bootstrap(self.document.as_ref(), &record)?;

        *self.state.write() = record;
        *self.phase.write() = Phase::Ready { is_new_user };
        info!(
            "ConsentManager ready: id={}, new_user={}",
            self.config.measurement_id, is_new_user
        );
        Ok(())
    }

    // ---------------------------------------------------------------
    // Read side
    // ---------------------------------------------------------------

    pub fn is_ready(&self) -> bool {
        matches!(*self.phase.read(), Phase::Ready { .. })
    }

    /// Whether no prior record was found at startup. `None` until ready.
    pub fn is_new_user(&self) -> Option<bool> {
        match *self.phase.read() {
            Phase::Ready { is_new_user } => Some(is_new_user),
            Phase::Uninitialized => None,
        }
    }

    /// Copy of the live record.
    pub fn state(&self) -> ConsentRecord {
        *self.state.read()
    }

    pub fn mode(&self, category: ConsentCategory) -> ConsentMode {
        self.state.read().get(category)
    }

    pub fn is_all_consented(&self) -> bool {
        self.state.read().is_uniform(ConsentMode::Granted)
    }

    pub fn is_all_denied(&self) -> bool {
        self.state.read().is_uniform(ConsentMode::Denied)
    }

    pub fn config(&self) -> &ConsentConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    pub fn bootstrapper(&self) -> &TagBootstrapper {
        &self.tag
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Set one category.
    ///
    /// Fails without changing anything if the manager is not ready, gtag is
    /// missing, or the record cannot be persisted.
    pub async fn update(&self, category: ConsentCategory, mode: ConsentMode) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        self.apply_update(category, mode).await
    }

    /// Flip one category.
    pub async fn toggle(&self, category: ConsentCategory) -> Result<ConsentMode> {
        let _guard = self.op_lock.lock().await;
        let mode = self.mode(category).toggled();
        self.apply_update(category, mode).await?;
        Ok(mode)
    }

    async fn apply_update(&self, category: ConsentCategory, mode: ConsentMode) -> Result<()> {
        let gtag = self.dispatcher()?;
        let next = self.state().with(category, mode);

        self.persistence.save(&next, self.config.ttl_days).await?;
        *self.state.write() = next;

        gtag.dispatch(GtagCommand::consent_update(
            PartialConsent::new().with(category, mode),
        ))?;
        self.page_view(gtag.as_ref(), &next)?;
        self.bus.notify(category, mode, next);
        debug!("Consent updated: {}={}", category, mode);
        Ok(())
    }

    /// Merge a subset of categories; one notification per supplied key.
    pub async fn update_multiple(&self, partial: PartialConsent) -> Result<()> {
        if partial.is_empty() {
            debug!("update_multiple called with no categories");
            return Ok(());
        }
        let _guard = self.op_lock.lock().await;
        let next = self.state().merged(&partial);
        let events = partial
            .iter()
            .map(|(category, mode)| (ConsentEventKey::from(category), ConsentEventMode::from(mode)))
            .collect();
        self.apply_bulk(BulkChange {
            op: "update_multiple",
            next,
            delta: partial,
            events,
            page_view: true,
            notify_first: true,
        })
        .await
    }

    /// Grant every category.
    pub async fn accept_all(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        let next = ConsentRecord::all(ConsentMode::Granted);
        self.apply_bulk(BulkChange {
            op: "accept_all",
            next,
            delta: next.to_partial(),
            events: vec![(ConsentEventKey::ALL, ConsentEventMode::AcceptAll)],
            page_view: true,
            notify_first: false,
        })
        .await
    }

    /// Deny every category.
    pub async fn reject_all(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        let next = ConsentRecord::denied();
        self.apply_bulk(BulkChange {
            op: "reject_all",
            next,
            delta: next.to_partial(),
            events: vec![(ConsentEventKey::ALL, ConsentEventMode::RejectAll)],
            page_view: false,
            notify_first: false,
        })
        .await
    }

    /// Callers hold `op_lock`.
    async fn apply_bulk(&self, change: BulkChange) -> Result<()> {
        match self.config.failure_policy {
            FailurePolicy::Strict => {
                let gtag = self.dispatcher()?;
                self.persistence.save(&change.next, self.config.ttl_days).await?;
                *self.state.write() = change.next;
                self.propagate(gtag.as_ref(), &change)
            }
            FailurePolicy::Lenient => {
                if !self.is_ready() {
                    error!("Error in {}: {}", change.op, Error::NotInitialized);
                    return Ok(());
                }
                // Committed up front; later failures leave it in place.
                *self.state.write() = change.next;

                let result = async {
                    self.persistence.save(&change.next, self.config.ttl_days).await?;
                    let gtag = self.dispatcher()?;
                    self.propagate(gtag.as_ref(), &change)
                }
                .await;
                if let Err(e) = result {
                    error!("Error in {}: {}", change.op, e);
                }
                Ok(())
            }
        }
    }

    fn propagate(&self, gtag: &dyn GtagDispatcher, change: &BulkChange) -> Result<()> {
        gtag.dispatch(GtagCommand::consent_update(change.delta))?;
        if change.notify_first {
            self.publish(change);
            if change.page_view {
                self.page_view(gtag, &change.next)?;
            }
        } else {
            if change.page_view {
                self.page_view(gtag, &change.next)?;
            }
            self.publish(change);
        }
        info!("Consent {} applied", change.op);
        Ok(())
    }

    fn publish(&self, change: &BulkChange) {
        for (key, mode) in &change.events {
            self.bus.notify(*key, *mode, change.next);
        }
    }

    /// The vendor dispatcher, if the manager is ready and gtag is installed.
    fn dispatcher(&self) -> Result<Arc<dyn GtagDispatcher>> {
        if !self.is_ready() {
            return Err(Error::NotInitialized);
        }
        self.window.gtag().ok_or(Error::VendorNotReady)
    }

    /// Send a page view iff analytics storage is granted in `record`.
    fn page_view(&self, gtag: &dyn GtagDispatcher, record: &ConsentRecord) -> Result<()> {
        if record.analytics_storage == ConsentMode::Granted {
            gtag.dispatch(GtagCommand::page_view(
                &self.window.location_path(),
                &self.window.document_title(),
            ))?;
        }
        Ok(())
    }
}
