//! Tag bootstrap: sequences the consent default, the vendor loader and the
//! vendor init so the default consent is queued before the loader can run.
//!
//! Insertion order:
//! 1. inline consent snippet: installs `dataLayer`/`gtag`, `consent default`,
//!    privacy hardening flags; ignored by cookie-banner scanners
//! 2. async vendor loader, whose load callback inserts
//! 3. inline finalize snippet: `js` timestamp and `config` without page view

use chrono::Utc;
use tracing::{error, info};

use crate::command::GtagCommand;
use crate::host::Document;
use crate::node::{ExternalScript, HeadNode, InlineScript};
use tagconsent_core::{ConsentConfig, ConsentRecord, Error, Result};

/// Builds and inserts the vendor tag nodes.
#[derive(Debug, Clone)]
pub struct TagBootstrapper {
    measurement_id: String,
    script_src: String,
}

impl TagBootstrapper {
    pub fn new(config: &ConsentConfig) -> Self {
        Self {
            measurement_id: config.measurement_id.clone(),
            script_src: config.vendor_script_src(),
        }
    }

    pub fn measurement_id(&self) -> &str {
        &self.measurement_id
    }

    pub fn script_src(&self) -> &str {
        &self.script_src
    }

    /// Snippet that must run before the vendor loader.
    pub fn consent_snippet(&self, record: &ConsentRecord) -> InlineScript {
        InlineScript::new(vec![
            GtagCommand::consent_default(record),
            GtagCommand::set_flag("ads_data_redaction", true),
            GtagCommand::set_flag("url_passthrough", true),
        ])
        .installing_queue()
        .with_attribute("data-cookieconsent", "ignore")
    }

    /// Snippet inserted once the vendor loader has loaded.
    pub fn finalize_snippet(&self) -> InlineScript {
        InlineScript::new(vec![
            GtagCommand::Js(Utc::now()),
            GtagCommand::config_without_page_view(&self.measurement_id),
        ])
    }

    /// The vendor loader, without its load callback.
    pub fn vendor_script(&self) -> ExternalScript {
        ExternalScript::new(&self.script_src).asynchronous()
    }

    /// Insert the consent snippet, then the loader wired to insert the
    /// finalize snippet on load.
    ///
    /// Any failure is logged and returned as [`Error::Bootstrap`].
    pub fn bootstrap(&self, document: &dyn Document, record: &ConsentRecord) -> Result<()> {
        self.try_bootstrap(document, record).map_err(|e| {
            error!("Tag bootstrap failed for {}: {}", self.measurement_id, e);
            match e {
                Error::Bootstrap(_) => e,
                other => Error::Bootstrap(other.to_string()),
            }
        })
    }

    fn try_bootstrap(&self, document: &dyn Document, record: &ConsentRecord) -> Result<()> {
        let consent = self.consent_snippet(record);
        let finalize = self.finalize_snippet();
        let mut loader = self.vendor_script();
        loader.set_on_load(Box::new(move |doc: &dyn Document| {
            doc.append_to_head(HeadNode::Inline(finalize))
        }));

        document.append_to_head(HeadNode::Inline(consent))?;
        document.append_to_head(HeadNode::External(loader))?;

        info!("Tag bootstrapped: {}", self.script_src);
        Ok(())
    }
}
