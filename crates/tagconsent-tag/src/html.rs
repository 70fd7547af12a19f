//! Markup-rendering document for server-side templates.

use parking_lot::Mutex;

use crate::host::Document;
use crate::node::HeadNode;
use tagconsent_core::Result;

/// A document that renders appended nodes to HTML.
///
/// External scripts are treated as loaded the moment they are appended, so
/// anything their load callbacks insert follows them in the output.
#[derive(Default)]
pub struct HtmlHead {
    fragments: Mutex<Vec<String>>,
}

impl HtmlHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self) -> String {
        self.fragments.lock().join("\n")
    }
}

impl Document for HtmlHead {
    fn append_to_head(&self, node: HeadNode) -> Result<()> {
        self.fragments.lock().push(node.to_html());
        if let HeadNode::External(mut script) = node {
            if let Some(callback) = script.take_on_load() {
                callback(self)?;
            }
        }
        Ok(())
    }
}
