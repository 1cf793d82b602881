//! An XSLT 1.0 processor covering the instructions page-description
//! stylesheets use. Results are never built as a tree: every element and text
//! node is reported to a [`folio_traits::MarkupHandler`] as it is produced.

pub mod ast;
pub mod compiler;
pub mod error;
mod executor;
mod executor_handlers;
pub mod output;
pub mod pattern;
pub mod processor;
pub mod serializer;

pub use compiler::{XSLT_NS, compile};
pub use error::{Location, XsltError};
pub use processor::{XsltEngine, XsltTransform};
pub use serializer::XmlTextWriter;
