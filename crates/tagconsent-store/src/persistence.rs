//! Consent record persistence: the encoded `consentConfig` cookie.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::cookie::{decode_component, encode_component, Cookie};
use crate::store::CookieStore;
use tagconsent_core::{ConsentConfig, ConsentRecord, CookieAttributes, Error, Result};

/// Reads and writes the consent record as a percent-encoded JSON cookie.
///
/// Owns no state of its own beyond the cookie name and attributes.
#[derive(Clone)]
pub struct ConsentCookie {
    store: Arc<dyn CookieStore>,
    name: String,
    attributes: CookieAttributes,
}

impl ConsentCookie {
    pub fn new(store: Arc<dyn CookieStore>, name: impl Into<String>, attributes: CookieAttributes) -> Self {
        Self {
            store,
            name: name.into(),
            attributes,
        }
    }

    pub fn from_config(store: Arc<dyn CookieStore>, config: &ConsentConfig) -> Self {
        Self::new(store, config.cookie_name.clone(), config.cookie.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load the persisted record.
    ///
    /// Any failure (store error, bad encoding, malformed JSON, missing or
    /// unknown keys) is logged and reported as "no prior consent".
    pub async fn load(&self) -> Option<ConsentRecord> {
        match self.try_load().await {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to read consent cookie '{}': {}", self.name, e);
                None
            }
        }
    }

    async fn try_load(&self) -> Result<Option<ConsentRecord>> {
        let cookie = match self.store.get(&self.name).await {
            Ok(Some(cookie)) => cookie,
            Ok(None) => {
                debug!("No consent cookie '{}' found", self.name);
                return Ok(None);
            }
            Err(e) => return Err(Error::PersistenceRead(e.to_string())),
        };
        let record = decode_record(&cookie.value)?;
        Ok(Some(record))
    }

    /// Serialize, encode and write the record with a `ttl_days` expiration.
    ///
    /// Write failures are wrapped with the cookie name and propagated.
    pub async fn save(&self, record: &ConsentRecord, ttl_days: u32) -> Result<()> {
        let value = encode_record(record).map_err(|e| Error::persistence_write(&self.name, e))?;
        let cookie = Cookie::new(&self.name, value)
            .with_ttl_days(ttl_days)
            .with_path(&self.attributes.path)
            .with_same_site(self.attributes.same_site)
            .with_secure(self.attributes.secure);

        self.store.set(cookie).await.map_err(|e| {
            warn!("Consent cookie write rejected: {}", e);
            Error::persistence_write(&self.name, e)
        })
    }
}

/// JSON-serialize and percent-encode a record.
pub fn encode_record(record: &ConsentRecord) -> Result<String> {
    let json = serde_json::to_string(record)?;
    Ok(encode_component(&json))
}

/// Reverse of [`encode_record`].
pub fn decode_record(value: &str) -> Result<ConsentRecord> {
    let json = decode_component(value)?;
    serde_json::from_str(&json).map_err(|e| Error::PersistenceRead(format!("malformed consent JSON: {}", e)))
}
