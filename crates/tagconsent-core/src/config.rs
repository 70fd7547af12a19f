//! Consent integration configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default name of the persisted consent cookie.
pub const DEFAULT_COOKIE_NAME: &str = "consentConfig";
/// Default lifetime of the persisted consent cookie.
pub const DEFAULT_TTL_DAYS: u32 = 180;
/// Longest accepted cookie lifetime; browsers clamp longer ones to this.
pub const MAX_TTL_DAYS: u32 = 400;
/// Default vendor loader URL; the measurement id is appended as `?id=`.
pub const DEFAULT_SCRIPT_URL: &str = "https://www.googletagmanager.com/gtag/js";

/// Cookie `SameSite` restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// How bulk mutations react to internal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// `update` propagates; bulk operations log and return normally.
    #[default]
    Lenient,
    /// Every mutation propagates and leaves state unchanged on failure.
    Strict,
}

impl FailurePolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "lenient" => Some(Self::Lenient),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Attributes applied to every consent cookie write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAttributes {
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_same_site")]
    pub same_site: SameSite,
    #[serde(default = "default_true")]
    pub secure: bool,
}

fn default_path() -> String {
    "/".into()
}
fn default_same_site() -> SameSite {
    SameSite::Lax
}
fn default_true() -> bool {
    true
}
fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.into()
}
fn default_ttl_days() -> u32 {
    DEFAULT_TTL_DAYS
}
fn default_script_url() -> String {
    DEFAULT_SCRIPT_URL.into()
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: default_path(),
            same_site: default_same_site(),
            secure: true,
        }
    }
}

/// Top-level consent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Vendor measurement / tracking id, e.g. `G-XXXXXXXXXX`.
    pub measurement_id: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Expiration horizon applied to every write.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,
    #[serde(default = "default_script_url")]
    pub vendor_script_url: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub cookie: CookieAttributes,
}

impl ConsentConfig {
    pub fn new(measurement_id: impl Into<String>) -> Self {
        Self {
            measurement_id: measurement_id.into(),
            cookie_name: default_cookie_name(),
            ttl_days: DEFAULT_TTL_DAYS,
            vendor_script_url: default_script_url(),
            failure_policy: FailurePolicy::default(),
            cookie: CookieAttributes::default(),
        }
    }

    /// Create configuration from environment and defaults.
    pub fn from_env(measurement_id: impl Into<String>) -> Result<Self> {
        let mut config = Self::new(measurement_id);

        if let Ok(name) = std::env::var("TAGCONSENT_COOKIE_NAME") {
            config.cookie_name = name;
        }
        if let Ok(ttl) = std::env::var("TAGCONSENT_TTL_DAYS") {
            config.ttl_days = ttl
                .parse()
                .map_err(|_| Error::Config(format!("invalid TAGCONSENT_TTL_DAYS: {}", ttl)))?;
        }
        if let Ok(url) = std::env::var("TAGCONSENT_SCRIPT_URL") {
            config.vendor_script_url = url;
        }
        if let Ok(policy) = std::env::var("TAGCONSENT_FAILURE_POLICY") {
            config.failure_policy = FailurePolicy::from_name(&policy).ok_or_else(|| {
                Error::Config(format!("invalid TAGCONSENT_FAILURE_POLICY: {}", policy))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_ttl_days(mut self, ttl_days: u32) -> Self {
        self.ttl_days = ttl_days;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Reject values that would produce a broken cookie or snippet.
    pub fn validate(&self) -> Result<()> {
        if self.measurement_id.is_empty() {
            return Err(Error::Config("measurement id is empty".into()));
        }
        if self
            .measurement_id
            .chars()
            .any(|c| matches!(c, '\'' | '"' | '\\' | '<' | '>') || c.is_whitespace())
        {
            return Err(Error::Config(format!(
                "measurement id contains forbidden characters: {}",
                self.measurement_id
            )));
        }
        if self.cookie_name.is_empty()
            || self
                .cookie_name
                .chars()
                .any(|c| matches!(c, '=' | ';' | ',') || c.is_whitespace())
        {
            return Err(Error::Config(format!(
                "invalid cookie name: {:?}",
                self.cookie_name
            )));
        }
        if self.ttl_days == 0 || self.ttl_days > MAX_TTL_DAYS {
            return Err(Error::Config(format!(
                "ttl_days must be between 1 and {}, got {}",
                MAX_TTL_DAYS, self.ttl_days
            )));
        }
        Ok(())
    }

    /// Full vendor loader URL for this measurement id.
    pub fn vendor_script_src(&self) -> String {
        format!("{}?id={}", self.vendor_script_url, self.measurement_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsentConfig::new("G-TEST123");
        assert_eq!(config.cookie_name, "consentConfig");
        assert_eq!(config.ttl_days, 180);
        assert_eq!(config.failure_policy, FailurePolicy::Lenient);
        assert_eq!(config.cookie.path, "/");
        assert_eq!(config.cookie.same_site, SameSite::Lax);
        assert!(config.cookie.secure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_vendor_script_src() {
        let config = ConsentConfig::new("G-TEST123");
        assert_eq!(
            config.vendor_script_src(),
            "https://www.googletagmanager.com/gtag/js?id=G-TEST123"
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ConsentConfig::new("").validate().is_err());
        assert!(ConsentConfig::new("G-1'); alert(1); ('").validate().is_err());
        assert!(ConsentConfig::new("G-OK").with_ttl_days(0).validate().is_err());
        assert!(ConsentConfig::new("G-OK").with_ttl_days(MAX_TTL_DAYS).validate().is_ok());
        assert!(ConsentConfig::new("G-OK").with_ttl_days(MAX_TTL_DAYS + 1).validate().is_err());
        assert!(ConsentConfig::new("G-OK").with_ttl_days(200_000_000).validate().is_err());

        let mut config = ConsentConfig::new("G-OK");
        config.cookie_name = "bad name".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ConsentConfig =
            serde_json::from_str(r#"{ "measurement_id": "G-ABC", "failure_policy": "strict" }"#)
                .unwrap();
        assert_eq!(config.ttl_days, 180);
        assert_eq!(config.failure_policy, FailurePolicy::Strict);
        assert_eq!(config.cookie, CookieAttributes::default());
    }
}
