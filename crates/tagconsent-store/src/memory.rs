//! In-process cookie jar.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::cookie::Cookie;
use crate::store::CookieStore;
use tagconsent_core::{Error, Result};

/// Cookie jar held in memory. Writes can be made to fail for testing the
/// write-error path.
#[derive(Default)]
pub struct MemoryCookieStore {
    cookies: RwLock<HashMap<String, Cookie>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` reject (or stop rejecting).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Insert a raw cookie, bypassing the failure switch and the counter.
    pub fn insert_raw(&self, cookie: Cookie) {
        self.cookies.write().insert(cookie.name.clone(), cookie);
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn get(&self, name: &str) -> Result<Option<Cookie>> {
        Ok(self
            .cookies
            .read()
            .get(name)
            .filter(|c| !c.is_expired())
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Cookie>> {
        let mut all: Vec<Cookie> = self
            .cookies
            .read()
            .values()
            .filter(|c| !c.is_expired())
            .cloned()
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn set(&self, cookie: Cookie) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!(
                "cookie write rejected: {}",
                cookie.name
            )));
        }
        self.cookies.write().insert(cookie.name.clone(), cookie);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.cookies.write().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryCookieStore::new();
        store.set(Cookie::new("a", "1")).await.unwrap();
        store.set(Cookie::new("a", "2")).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().unwrap().value, "2");
        assert_eq!(store.write_count(), 2);

        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        store.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_cookies_hidden() {
        let store = MemoryCookieStore::new();
        let past = chrono::Utc::now() - chrono::Duration::days(1);
        store.insert_raw(Cookie::new("old", "x").with_expires(past));
        store.insert_raw(Cookie::new("fresh", "y").with_ttl_days(1));

        assert!(store.get("old").await.unwrap().is_none());
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "fresh");
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let store = MemoryCookieStore::new();
        store.fail_writes(true);
        assert!(store.set(Cookie::new("a", "1")).await.is_err());
        assert_eq!(store.write_count(), 0);

        store.fail_writes(false);
        assert!(store.set(Cookie::new("a", "1")).await.is_ok());
    }
}
