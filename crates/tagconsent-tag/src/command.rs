//! gtag command model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use tagconsent_core::{ConsentRecord, PartialConsent};

/// Second argument of a `gtag('consent', ...)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentAction {
    Default,
    Update,
}

impl ConsentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Update => "update",
        }
    }
}

/// One call into the vendor's command queue.
#[derive(Debug, Clone, PartialEq)]
pub enum GtagCommand {
    Consent {
        action: ConsentAction,
        params: PartialConsent,
    },
    Set {
        flag: String,
        value: Value,
    },
    Js(DateTime<Utc>),
    Config {
        id: String,
        options: Value,
    },
    Event {
        name: String,
        params: Value,
    },
}

impl GtagCommand {
    /// `gtag('consent', 'default', record)`.
    pub fn consent_default(record: &ConsentRecord) -> Self {
        Self::Consent {
            action: ConsentAction::Default,
            params: record.to_partial(),
        }
    }

    /// `gtag('consent', 'update', delta)`.
    pub fn consent_update(delta: PartialConsent) -> Self {
        Self::Consent {
            action: ConsentAction::Update,
            params: delta,
        }
    }

    pub fn set_flag(flag: impl Into<String>, value: bool) -> Self {
        Self::Set {
            flag: flag.into(),
            value: Value::Bool(value),
        }
    }

    /// `gtag('config', id, { send_page_view: false })`.
    pub fn config_without_page_view(id: impl Into<String>) -> Self {
        Self::Config {
            id: id.into(),
            options: json!({ "send_page_view": false }),
        }
    }

    /// `gtag('event', 'page_view', { page_path, page_title })`.
    pub fn page_view(path: &str, title: &str) -> Self {
        Self::Event {
            name: "page_view".into(),
            params: json!({ "page_path": path, "page_title": title }),
        }
    }

    pub fn is_page_view(&self) -> bool {
        matches!(self, Self::Event { name, .. } if name == "page_view")
    }

    /// Positional arguments as pushed onto the data layer.
    pub fn to_args(&self) -> Vec<Value> {
        match self {
            Self::Consent { action, params } => vec![
                json!("consent"),
                json!(action.as_str()),
                serde_json::to_value(params).unwrap_or(Value::Null),
            ],
            Self::Set { flag, value } => vec![json!("set"), json!(flag), value.clone()],
            Self::Js(at) => vec![json!("js"), json!(at.to_rfc3339())],
            Self::Config { id, options } => vec![json!("config"), json!(id), options.clone()],
            Self::Event { name, params } => vec![json!("event"), json!(name), params.clone()],
        }
    }

    /// Render as a JavaScript statement for an inline snippet.
    pub fn to_js(&self) -> String {
        match self {
            // The loader stamps its own start time when the snippet runs.
            Self::Js(_) => "gtag(\"js\", new Date());".to_string(),
            _ => {
                let args: Vec<String> = self.to_args().iter().map(Value::to_string).collect();
                format!("gtag({});", args.join(", "))
            }
        }
    }
}
