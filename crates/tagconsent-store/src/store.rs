//! Asynchronous cookie store trait.

use async_trait::async_trait;

use crate::cookie::Cookie;
use tagconsent_core::Result;

/// Trait for cookie storage backends.
///
/// Mirrors the shape of the browser `cookieStore` API: every call may
/// suspend, and expired cookies are never returned.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Get a live cookie by name.
    async fn get(&self, name: &str) -> Result<Option<Cookie>>;

    /// All live cookies.
    async fn get_all(&self) -> Result<Vec<Cookie>>;

    /// Insert or replace a cookie by name.
    async fn set(&self, cookie: Cookie) -> Result<()>;

    /// Remove a cookie. Removing a missing cookie is not an error.
    async fn delete(&self, name: &str) -> Result<()>;
}
