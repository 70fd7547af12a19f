//! TagConsent Core: consent record types and configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConsentConfig, CookieAttributes, FailurePolicy, SameSite};
pub use error::{Error, Result};
pub use types::{
    ConsentCategory, ConsentEventKey, ConsentEventMode, ConsentMode, ConsentNotification,
    ConsentRecord, PartialConsent, CONSENT_UPDATED_EVENT,
};
