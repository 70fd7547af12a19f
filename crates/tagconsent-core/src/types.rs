//! Consent record, categories, modes and the notification payload.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the event dispatched after every committed consent change.
pub const CONSENT_UPDATED_EVENT: &str = "consent-updated";

/// Binary permission state for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMode {
    Granted,
    #[default]
    Denied,
}

impl ConsentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "granted" => Some(Self::Granted),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }

    /// The opposite mode.
    pub fn toggled(self) -> Self {
        match self {
            Self::Granted => Self::Denied,
            Self::Denied => Self::Granted,
        }
    }
}

impl std::fmt::Display for ConsentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed, closed set of consent categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentCategory {
    AdStorage,
    AnalyticsStorage,
    FunctionalityStorage,
    PersonalizationStorage,
    AdUserData,
    AdPersonalization,
    SecurityStorage,
}

impl ConsentCategory {
    pub fn all() -> &'static [ConsentCategory] {
        &[
            Self::AdStorage,
            Self::AnalyticsStorage,
            Self::FunctionalityStorage,
            Self::PersonalizationStorage,
            Self::AdUserData,
            Self::AdPersonalization,
            Self::SecurityStorage,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AdStorage => "ad_storage",
            Self::AnalyticsStorage => "analytics_storage",
            Self::FunctionalityStorage => "functionality_storage",
            Self::PersonalizationStorage => "personalization_storage",
            Self::AdUserData => "ad_user_data",
            Self::AdPersonalization => "ad_personalization",
            Self::SecurityStorage => "security_storage",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for ConsentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Full consent state. Every category is always present; decoding rejects
/// missing or unknown keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsentRecord {
    pub ad_storage: ConsentMode,
    pub analytics_storage: ConsentMode,
    pub functionality_storage: ConsentMode,
    pub personalization_storage: ConsentMode,
    pub ad_user_data: ConsentMode,
    pub ad_personalization: ConsentMode,
    pub security_storage: ConsentMode,
}

impl ConsentRecord {
    /// A record with every category set to `mode`.
    pub fn all(mode: ConsentMode) -> Self {
        let mut record = Self::default();
        for category in ConsentCategory::all() {
            record.set(*category, mode);
        }
        record
    }

    /// First-visit default: everything denied.
    pub fn denied() -> Self {
        Self::all(ConsentMode::Denied)
    }

    pub fn get(&self, category: ConsentCategory) -> ConsentMode {
        match category {
            ConsentCategory::AdStorage => self.ad_storage,
            ConsentCategory::AnalyticsStorage => self.analytics_storage,
            ConsentCategory::FunctionalityStorage => self.functionality_storage,
            ConsentCategory::PersonalizationStorage => self.personalization_storage,
            ConsentCategory::AdUserData => self.ad_user_data,
            ConsentCategory::AdPersonalization => self.ad_personalization,
            ConsentCategory::SecurityStorage => self.security_storage,
        }
    }

    pub fn set(&mut self, category: ConsentCategory, mode: ConsentMode) {
        let slot = match category {
            ConsentCategory::AdStorage => &mut self.ad_storage,
            ConsentCategory::AnalyticsStorage => &mut self.analytics_storage,
            ConsentCategory::FunctionalityStorage => &mut self.functionality_storage,
            ConsentCategory::PersonalizationStorage => &mut self.personalization_storage,
            ConsentCategory::AdUserData => &mut self.ad_user_data,
            ConsentCategory::AdPersonalization => &mut self.ad_personalization,
            ConsentCategory::SecurityStorage => &mut self.security_storage,
        };
        *slot = mode;
    }

    /// Copy of this record with `category` replaced.
    pub fn with(mut self, category: ConsentCategory, mode: ConsentMode) -> Self {
        self.set(category, mode);
        self
    }

    /// Copy of this record with every present entry of `partial` applied.
    pub fn merged(mut self, partial: &PartialConsent) -> Self {
        for (category, mode) in partial.iter() {
            self.set(category, mode);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConsentCategory, ConsentMode)> + '_ {
        ConsentCategory::all().iter().map(move |c| (*c, self.get(*c)))
    }

    /// True iff every category equals `mode`.
    pub fn is_uniform(&self, mode: ConsentMode) -> bool {
        self.iter().all(|(_, m)| m == mode)
    }

    /// Categories whose mode differs between `previous` and `self`.
    pub fn changed_from(&self, previous: &ConsentRecord) -> Vec<ConsentCategory> {
        ConsentCategory::all()
            .iter()
            .copied()
            .filter(|c| self.get(*c) != previous.get(*c))
            .collect()
    }

    /// The record as a partial with every category present.
    pub fn to_partial(&self) -> PartialConsent {
        self.iter().collect()
    }
}

/// An arbitrary subset of category/mode pairs. Unknown keys are rejected on
/// decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConsent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_storage: Option<ConsentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_storage: Option<ConsentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functionality_storage: Option<ConsentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalization_storage: Option<ConsentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_user_data: Option<ConsentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_personalization: Option<ConsentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_storage: Option<ConsentMode>,
}

impl PartialConsent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: ConsentCategory) -> Option<ConsentMode> {
        match category {
            ConsentCategory::AdStorage => self.ad_storage,
            ConsentCategory::AnalyticsStorage => self.analytics_storage,
            ConsentCategory::FunctionalityStorage => self.functionality_storage,
            ConsentCategory::PersonalizationStorage => self.personalization_storage,
            ConsentCategory::AdUserData => self.ad_user_data,
            ConsentCategory::AdPersonalization => self.ad_personalization,
            ConsentCategory::SecurityStorage => self.security_storage,
        }
    }

    pub fn set(&mut self, category: ConsentCategory, mode: ConsentMode) {
        let slot = match category {
            ConsentCategory::AdStorage => &mut self.ad_storage,
            ConsentCategory::AnalyticsStorage => &mut self.analytics_storage,
            ConsentCategory::FunctionalityStorage => &mut self.functionality_storage,
            ConsentCategory::PersonalizationStorage => &mut self.personalization_storage,
            ConsentCategory::AdUserData => &mut self.ad_user_data,
            ConsentCategory::AdPersonalization => &mut self.ad_personalization,
            ConsentCategory::SecurityStorage => &mut self.security_storage,
        };
        *slot = Some(mode);
    }

    /// Builder-style `set`.
    pub fn with(mut self, category: ConsentCategory, mode: ConsentMode) -> Self {
        self.set(category, mode);
        self
    }

    /// Present entries in category order.
    pub fn iter(&self) -> impl Iterator<Item = (ConsentCategory, ConsentMode)> + '_ {
        ConsentCategory::all()
            .iter()
            .filter_map(move |c| self.get(*c).map(|m| (*c, m)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a JSON object such as `{"ad_storage": "granted"}`.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Error::from)
    }
}

impl FromIterator<(ConsentCategory, ConsentMode)> for PartialConsent {
    fn from_iter<I: IntoIterator<Item = (ConsentCategory, ConsentMode)>>(iter: I) -> Self {
        let mut partial = Self::default();
        for (category, mode) in iter {
            partial.set(category, mode);
        }
        partial
    }
}

/// Which part of the record a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsentEventKey {
    Category(ConsentCategory),
    All(AllSentinel),
}

/// The literal `"all"` key used by accept-all / reject-all notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllSentinel {
    All,
}

impl ConsentEventKey {
    pub const ALL: ConsentEventKey = ConsentEventKey::All(AllSentinel::All);
}

impl From<ConsentCategory> for ConsentEventKey {
    fn from(category: ConsentCategory) -> Self {
        Self::Category(category)
    }
}

/// The resulting mode reported by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsentEventMode {
    Granted,
    Denied,
    AcceptAll,
    RejectAll,
}

impl From<ConsentMode> for ConsentEventMode {
    fn from(mode: ConsentMode) -> Self {
        match mode {
            ConsentMode::Granted => Self::Granted,
            ConsentMode::Denied => Self::Denied,
        }
    }
}

/// Payload of a `consent-updated` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentNotification {
    pub key: ConsentEventKey,
    pub mode: ConsentEventMode,
    pub state: ConsentRecord,
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub timestamp: String,
}

impl ConsentNotification {
    pub fn new(
        key: impl Into<ConsentEventKey>,
        mode: impl Into<ConsentEventMode>,
        state: ConsentRecord,
    ) -> Self {
        Self {
            key: key.into(),
            mode: mode.into(),
            state,
            timestamp: chrono::Utc::now().timestamp_millis().to_string(),
        }
    }
}
