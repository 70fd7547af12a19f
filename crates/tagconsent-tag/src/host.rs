//! Host environment traits.

use std::sync::Arc;

use crate::command::GtagCommand;
use crate::node::HeadNode;
use tagconsent_core::Result;

/// The vendor's global command queue (`window.gtag`).
pub trait GtagDispatcher: Send + Sync {
    fn dispatch(&self, command: GtagCommand) -> Result<()>;
}

/// The hosting document. Nodes execute in insertion order.
pub trait Document: Send + Sync {
    fn append_to_head(&self, node: HeadNode) -> Result<()>;
}

/// The hosting window: where the dispatcher lives and what page is showing.
pub trait Window: Send + Sync {
    /// The installed dispatcher, or `None` if the queue was never set up.
    fn gtag(&self) -> Option<Arc<dyn GtagDispatcher>>;

    fn location_path(&self) -> String;

    fn document_title(&self) -> String;
}
