//! Cross-crate lifecycle tests: a file-backed cookie jar shared by two
//! successive page loads, mirroring a returning visitor.

use std::sync::Arc;

use parking_lot::Mutex;
use tagconsent_core::{
    ConsentCategory, ConsentConfig, ConsentEventKey, ConsentMode, ConsentNotification,
    ConsentRecord, PartialConsent,
};
use tagconsent_protocol::{ConsentManager, NotificationBus};
use tagconsent_store::{ConsentCookie, CookieStore, FileCookieStore};
use tagconsent_tag::{GtagCommand, MemoryPage};

async fn visit(dir: &std::path::Path, page: Arc<MemoryPage>) -> ConsentManager {
    let store = Arc::new(FileCookieStore::open(dir).unwrap());
    ready(ConsentManager::new(ConsentConfig::new("G-LIFECYCLE"), store, page.clone(), page)).await
}

async fn ready(manager: ConsentManager) -> ConsentManager {
    let manager = manager.with_bus(Arc::new(NotificationBus::new()));
    manager.initialize().await.unwrap();
    manager
}

#[tokio::test]
async fn test_returning_visitor_sees_saved_choices() {
    let dir = tempfile::tempdir().unwrap();

    let first_page = Arc::new(MemoryPage::new("/", "Home"));
    let first = visit(dir.path(), first_page.clone()).await;
    assert_eq!(first.is_new_user(), Some(true));
    first
        .update_multiple(
            PartialConsent::new()
                .with(ConsentCategory::AnalyticsStorage, ConsentMode::Granted)
                .with(ConsentCategory::FunctionalityStorage, ConsentMode::Granted),
        )
        .await
        .unwrap();
    let saved = first.state();
    drop(first);

    let second_page = Arc::new(MemoryPage::new("/blog", "Blog"));
    let second = visit(dir.path(), second_page.clone()).await;
    assert_eq!(second.is_new_user(), Some(false));
    assert_eq!(second.state(), saved);

    // The returning visitor's default declaration carries the saved record.
    assert_eq!(second_page.commands()[0], GtagCommand::consent_default(&saved));
}

#[tokio::test]
async fn test_persisted_cookie_round_trips_every_category() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CookieStore> = Arc::new(FileCookieStore::open(dir.path()).unwrap());
    let config = ConsentConfig::new("G-LIFECYCLE");
    let cookie = ConsentCookie::from_config(store.clone(), &config);

    for category in ConsentCategory::all() {
        let record = ConsentRecord::denied().with(*category, ConsentMode::Granted);
        cookie.save(&record, config.ttl_days).await.unwrap();
        assert_eq!(cookie.load().await, Some(record));
    }

    let raw = store.get("consentConfig").await.unwrap().unwrap();
    assert!(raw.to_set_cookie().ends_with("; path=/; SameSite=Lax; Secure"));
}

#[tokio::test]
async fn test_global_bus_receives_manager_notifications() {
    let store = Arc::new(tagconsent_store::MemoryCookieStore::new());
    let page = Arc::new(MemoryPage::new("/", "Home"));
    let manager = ConsentManager::create(ConsentConfig::new("G-GLOBAL"), store, page.clone(), page)
        .await
        .unwrap();

    let seen: Arc<Mutex<Vec<ConsentNotification>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let id = NotificationBus::global().subscribe(move |n| sink.lock().push(n.clone()));

    manager.reject_all().await.unwrap();
    NotificationBus::global().unsubscribe(id);

    // Other tests may publish on the global bus concurrently.
    assert!(seen
        .lock()
        .iter()
        .any(|n| n.key == ConsentEventKey::ALL && n.state == ConsentRecord::denied()));
}

#[tokio::test]
async fn test_finalize_runs_after_loader_without_blocking_mutations() {
    let store = Arc::new(tagconsent_store::MemoryCookieStore::new());
    let page = Arc::new(MemoryPage::new("/", "Home"));
    let manager = ready(ConsentManager::new(
        ConsentConfig::new("G-ORDER"),
        store,
        page.clone(),
        page.clone(),
    ))
    .await;

    // Loader still pending: mutations go through the queue already.
    manager.accept_all().await.unwrap();
    assert_eq!(page.pending_loads().len(), 1);

    let src = manager.bootstrapper().script_src().to_string();
    assert!(page.finish_loading(&src).unwrap());

    let commands = page.commands();
    let config_at = commands
        .iter()
        .position(|c| matches!(c, GtagCommand::Config { .. }))
        .unwrap();
    let view_at = commands.iter().position(|c| c.is_page_view()).unwrap();
    assert!(view_at < config_at);
}
