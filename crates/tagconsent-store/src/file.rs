//! Cookie jar persisted to a JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cookie::Cookie;
use crate::store::CookieStore;
use tagconsent_core::{Error, Result};

/// Cookie jar backed by a single JSON file (`<dir>/cookies.json`).
///
/// The file is re-read on every call and rewritten atomically on every
/// write, so several processes sharing the directory see each other's
/// changes.
pub struct FileCookieStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCookieStore {
    /// Open a jar in `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join("cookies.json"),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_jar(&self) -> Result<Vec<Cookie>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(cookies) => Ok(cookies),
                Err(e) => {
                    warn!("Cookie jar {} is corrupt, treating as empty: {}", self.path.display(), e);
                    Ok(Vec::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write_jar(&self, cookies: &[Cookie]) -> Result<()> {
        let data = serde_json::to_string_pretty(cookies)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| Error::Storage(format!("failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("failed to replace {}: {}", self.path.display(), e)))?;
        debug!("Cookie jar saved: {} cookies", cookies.len());
        Ok(())
    }
}

#[async_trait]
impl CookieStore for FileCookieStore {
    async fn get(&self, name: &str) -> Result<Option<Cookie>> {
        Ok(self
            .read_jar()
            .await?
            .into_iter()
            .find(|c| c.name == name && !c.is_expired()))
    }

    async fn get_all(&self) -> Result<Vec<Cookie>> {
        Ok(self
            .read_jar()
            .await?
            .into_iter()
            .filter(|c| !c.is_expired())
            .collect())
    }

    async fn set(&self, cookie: Cookie) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut cookies = self.read_jar().await?;
        // Drop expired entries while we are rewriting anyway.
        cookies.retain(|c| c.name != cookie.name && !c.is_expired());
        cookies.push(cookie);
        self.write_jar(&cookies).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut cookies = self.read_jar().await?;
        let before = cookies.len();
        cookies.retain(|c| c.name != name);
        if cookies.len() != before {
            self.write_jar(&cookies).await?;
        }
        Ok(())
    }
}
