//! Script nodes inserted into the document head.

use crate::command::GtagCommand;
use crate::host::Document;
use tagconsent_core::Result;

/// Prelude that installs the data layer and the `gtag` function.
const QUEUE_PRELUDE: &str =
    "window.dataLayer = window.dataLayer || [];\nfunction gtag(){ dataLayer.push(arguments); }";

/// Fired once when an external script finishes loading. Receives the
/// document the script was inserted into.
pub type LoadCallback = Box<dyn FnOnce(&dyn Document) -> Result<()> + Send>;

/// Inline `<script>` whose body is a sequence of gtag calls.
#[derive(Debug, Clone, Default)]
pub struct InlineScript {
    pub attributes: Vec<(String, String)>,
    /// Whether the body first sets up `window.dataLayer` / `gtag`.
    pub installs_queue: bool,
    pub commands: Vec<GtagCommand>,
}

impl InlineScript {
    pub fn new(commands: Vec<GtagCommand>) -> Self {
        Self {
            attributes: Vec::new(),
            installs_queue: false,
            commands,
        }
    }

    pub fn installing_queue(mut self) -> Self {
        self.installs_queue = true;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// JavaScript body of the snippet.
    pub fn text(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.commands.len() + 1);
        if self.installs_queue {
            lines.push(QUEUE_PRELUDE.to_string());
        }
        lines.extend(self.commands.iter().map(GtagCommand::to_js));
        lines.join("\n")
    }
}

/// External `<script src>` with an optional load callback.
pub struct ExternalScript {
    pub src: String,
    pub is_async: bool,
    pub attributes: Vec<(String, String)>,
    on_load: Option<LoadCallback>,
}

impl ExternalScript {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            is_async: false,
            attributes: Vec::new(),
            on_load: None,
        }
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn set_on_load(&mut self, callback: LoadCallback) {
        self.on_load = Some(callback);
    }

    pub fn has_on_load(&self) -> bool {
        self.on_load.is_some()
    }

    /// Remove the callback so the host can fire it later.
    pub fn take_on_load(&mut self) -> Option<LoadCallback> {
        self.on_load.take()
    }
}

impl std::fmt::Debug for ExternalScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalScript")
            .field("src", &self.src)
            .field("is_async", &self.is_async)
            .field("attributes", &self.attributes)
            .field("on_load", &self.on_load.is_some())
            .finish()
    }
}

/// A node appended to `<head>`.
#[derive(Debug)]
pub enum HeadNode {
    Inline(InlineScript),
    External(ExternalScript),
}

impl HeadNode {
    /// Markup for this node.
    pub fn to_html(&self) -> String {
        match self {
            Self::Inline(script) => format!(
                "<script{}>\n{}\n</script>",
                render_attributes(&script.attributes),
                script.text()
            ),
            Self::External(script) => {
                let mut attrs = vec![("src".to_string(), script.src.clone())];
                if script.is_async {
                    attrs.push(("async".to_string(), "true".to_string()));
                }
                attrs.extend(script.attributes.iter().cloned());
                format!("<script{}></script>", render_attributes(&attrs))
            }
        }
    }
}

fn render_attributes(attrs: &[(String, String)]) -> String {
    attrs
        .iter()
        .map(|(name, value)| format!(" {}=\"{}\"", name, escape_attribute(value)))
        .collect()
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_text_with_queue_prelude() {
        let script = InlineScript::new(vec![GtagCommand::set_flag("url_passthrough", true)])
            .installing_queue();
        let text = script.text();
        assert!(text.starts_with("window.dataLayer = window.dataLayer || [];"));
        assert!(text.ends_with(r#"gtag("set", "url_passthrough", true);"#));
    }

    #[test]
    fn test_inline_html_attributes() {
        let node = HeadNode::Inline(
            InlineScript::new(Vec::new()).with_attribute("data-cookieconsent", "ignore"),
        );
        assert!(node
            .to_html()
            .starts_with("<script data-cookieconsent=\"ignore\">"));
    }

    #[test]
    fn test_external_html() {
        let node = HeadNode::External(
            ExternalScript::new("https://example.com/gtag/js?id=G-1&x=\"y\"").asynchronous(),
        );
        assert_eq!(
            node.to_html(),
            "<script src=\"https://example.com/gtag/js?id=G-1&amp;x=&quot;y&quot;\" async=\"true\"></script>"
        );
    }

    #[test]
    fn test_on_load_take() {
        let mut script = ExternalScript::new("a.js");
        assert!(!script.has_on_load());
        script.set_on_load(Box::new(|_doc: &dyn Document| Ok(())));
        assert!(script.has_on_load());
        assert!(script.take_on_load().is_some());
        assert!(script.take_on_load().is_none());
    }
}
