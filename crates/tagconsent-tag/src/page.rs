//! In-memory page: executes inline scripts, defers external-script loads.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::command::GtagCommand;
use crate::host::{Document, GtagDispatcher, Window};
use crate::node::{HeadNode, LoadCallback};
use tagconsent_core::{Error, Result};

/// The recorded command queue (`window.dataLayer`).
#[derive(Debug, Default)]
pub struct DataLayer {
    commands: Mutex<Vec<GtagCommand>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every command pushed so far.
    pub fn commands(&self) -> Vec<GtagCommand> {
        self.commands.lock().clone()
    }

    pub fn page_view_count(&self) -> usize {
        self.commands.lock().iter().filter(|c| c.is_page_view()).count()
    }
}

impl GtagDispatcher for DataLayer {
    fn dispatch(&self, command: GtagCommand) -> Result<()> {
        debug!("gtag {:?}", command.to_args());
        self.commands.lock().push(command);
        Ok(())
    }
}

/// What ended up in `<head>`, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub html: String,
    /// `Some` for external scripts.
    pub src: Option<String>,
}

struct PageInner {
    head: Vec<NodeRecord>,
    data_layer: Option<Arc<DataLayer>>,
    pending_loads: HashMap<String, LoadCallback>,
    scripts_enabled: bool,
}

/// An in-process page standing in for the browser document and window.
///
/// Inline scripts run as soon as they are appended. External scripts are
/// recorded and their load callbacks held until [`MemoryPage::finish_loading`].
pub struct MemoryPage {
    inner: Mutex<PageInner>,
    path: RwLock<String>,
    title: RwLock<String>,
}

impl MemoryPage {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(PageInner {
                head: Vec::new(),
                data_layer: None,
                pending_loads: HashMap::new(),
                scripts_enabled: true,
            }),
            path: RwLock::new(path.into()),
            title: RwLock::new(title.into()),
        }
    }

    /// A page whose scripts never run, so the command queue never appears.
    pub fn with_scripts_blocked(path: impl Into<String>, title: impl Into<String>) -> Self {
        let page = Self::new(path, title);
        page.inner.lock().scripts_enabled = false;
        page
    }

    /// Simulate client-side navigation.
    pub fn navigate(&self, path: impl Into<String>, title: impl Into<String>) {
        *self.path.write() = path.into();
        *self.title.write() = title.into();
    }

    pub fn head(&self) -> Vec<NodeRecord> {
        self.inner.lock().head.clone()
    }

    pub fn data_layer(&self) -> Option<Arc<DataLayer>> {
        self.inner.lock().data_layer.clone()
    }

    /// Commands recorded on the data layer, empty if it was never installed.
    pub fn commands(&self) -> Vec<GtagCommand> {
        self.data_layer().map(|d| d.commands()).unwrap_or_default()
    }

    /// Sources of external scripts still waiting to load.
    pub fn pending_loads(&self) -> Vec<String> {
        self.inner.lock().pending_loads.keys().cloned().collect()
    }

    /// Mark the external script `src` as loaded and fire its callback.
    ///
    /// Returns `false` if nothing was waiting on `src`.
    pub fn finish_loading(&self, src: &str) -> Result<bool> {
        // Released before the callback runs: it appends to this page.
        let callback = self.inner.lock().pending_loads.remove(src);
        match callback {
            Some(callback) => {
                debug!("Script loaded: {}", src);
                callback(self)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Document for MemoryPage {
    fn append_to_head(&self, node: HeadNode) -> Result<()> {
        let html = node.to_html();
        let mut inner = self.inner.lock();
        match node {
            HeadNode::Inline(script) => {
                inner.head.push(NodeRecord { html, src: None });
                if !inner.scripts_enabled {
                    return Ok(());
                }
                if script.installs_queue && inner.data_layer.is_none() {
                    inner.data_layer = Some(Arc::new(DataLayer::new()));
                }
                match &inner.data_layer {
                    Some(layer) => {
                        for command in script.commands {
                            layer.dispatch(command)?;
                        }
                    }
                    None if !script.commands.is_empty() => {
                        warn!("Inline script ran before gtag was defined; {} commands dropped", script.commands.len());
                    }
                    None => {}
                }
            }
            HeadNode::External(mut script) => {
                if inner.head.iter().any(|n| n.src.as_deref() == Some(script.src.as_str())) {
                    return Err(Error::Bootstrap(format!("script already inserted: {}", script.src)));
                }
                inner.head.push(NodeRecord {
                    html,
                    src: Some(script.src.clone()),
                });
                if inner.scripts_enabled {
                    if let Some(callback) = script.take_on_load() {
                        inner.pending_loads.insert(script.src.clone(), callback);
                    }
                }
            }
        }
        Ok(())
    }
}

impl Window for MemoryPage {
    fn gtag(&self) -> Option<Arc<dyn GtagDispatcher>> {
        self.data_layer().map(|d| d as Arc<dyn GtagDispatcher>)
    }

    fn location_path(&self) -> String {
        self.path.read().clone()
    }

    fn document_title(&self) -> String {
        self.title.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ExternalScript, InlineScript};

    #[test]
    fn test_inline_installs_queue_and_runs() {
        let page = MemoryPage::new("/", "Home");
        assert!(page.gtag().is_none());

        page.append_to_head(HeadNode::Inline(
            InlineScript::new(vec![GtagCommand::set_flag("url_passthrough", true)]).installing_queue(),
        ))
        .unwrap();

        assert!(page.gtag().is_some());
        assert_eq!(page.commands().len(), 1);
        assert_eq!(page.head().len(), 1);
    }

    #[test]
    fn test_inline_without_queue_is_dropped() {
        let page = MemoryPage::new("/", "Home");
        page.append_to_head(HeadNode::Inline(InlineScript::new(vec![GtagCommand::Js(
            chrono::Utc::now(),
        )])))
        .unwrap();
        assert!(page.gtag().is_none());
        assert!(page.commands().is_empty());
    }

    #[test]
    fn test_external_load_callback_deferred() {
        let page = MemoryPage::new("/", "Home");
        let mut script = ExternalScript::new("vendor.js").asynchronous();
        script.set_on_load(Box::new(|doc: &dyn Document| {
            doc.append_to_head(HeadNode::Inline(InlineScript::new(Vec::new())))
        }));
        page.append_to_head(HeadNode::External(script)).unwrap();

        assert_eq!(page.pending_loads(), vec!["vendor.js".to_string()]);
        assert_eq!(page.head().len(), 1);

        assert!(page.finish_loading("vendor.js").unwrap());
        assert_eq!(page.head().len(), 2);
        assert!(!page.finish_loading("vendor.js").unwrap());
    }

    #[test]
    fn test_duplicate_external_rejected() {
        let page = MemoryPage::new("/", "Home");
        page.append_to_head(HeadNode::External(ExternalScript::new("a.js"))).unwrap();
        assert!(page.append_to_head(HeadNode::External(ExternalScript::new("a.js"))).is_err());
    }

    #[test]
    fn test_blocked_scripts_never_install_queue() {
        let page = MemoryPage::with_scripts_blocked("/", "Home");
        page.append_to_head(HeadNode::Inline(InlineScript::new(Vec::new()).installing_queue()))
            .unwrap();
        assert!(page.gtag().is_none());
        assert_eq!(page.head().len(), 1);
    }

    #[test]
    fn test_navigate() {
        let page = MemoryPage::new("/", "Home");
        page.navigate("/docs", "Docs");
        assert_eq!(page.location_path(), "/docs");
        assert_eq!(page.document_title(), "Docs");
    }
}
