//! Push-style XML event source for DMR documents, built on quick-xml.
//!
//! The source reads a document once, in order, and reports what it sees to a
//! [`SaxHandler`]. It owns the lexical layer (well-formedness, entity
//! expansion, namespace resolution); everything structural is left to the
//! handler.

mod handler;
mod locator;
mod source;

use thiserror::Error;

pub use handler::{
    predefined_entity, EndElement, NamespaceDecl, SaxHandler, StartElement, XmlAttribute,
};
pub use locator::Locator;
pub use source::{EventSource, QuickXmlSource};

#[derive(Debug, Error)]
pub enum SaxError {
    #[error("io: {0}")]
    Io(String),
}
