//! Error types for TagConsent.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Vendor not ready: the gtag command queue is not installed")]
    VendorNotReady,

    #[error("Consent manager is not initialized")]
    NotInitialized,

    #[error("Persistence read error: {0}")]
    PersistenceRead(String),

    #[error("Failed to persist cookie '{name}': {source}")]
    PersistenceWrite {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap a storage failure with the name of the cookie being written.
    pub fn persistence_write(name: impl Into<String>, source: Error) -> Self {
        Self::PersistenceWrite {
            name: name.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
