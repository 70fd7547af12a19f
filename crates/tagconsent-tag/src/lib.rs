//! Vendor tag integration: gtag command model, host document, bootstrap.
//!
//! The host environment is reached only through the `Document`, `Window` and
//! `GtagDispatcher` traits. `MemoryPage` is an in-process page that executes
//! inline scripts on insertion and holds external-script load callbacks until
//! told the download finished. `HtmlHead` renders the same sequence to markup.

pub mod bootstrap;
pub mod command;
pub mod host;
pub mod html;
pub mod node;
pub mod page;

pub use bootstrap::TagBootstrapper;
pub use command::{ConsentAction, GtagCommand};
pub use host::{Document, GtagDispatcher, Window};
pub use html::HtmlHead;
pub use node::{ExternalScript, HeadNode, InlineScript, LoadCallback};
pub use page::{DataLayer, MemoryPage, NodeRecord};
