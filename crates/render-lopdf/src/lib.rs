//! Streaming XSL-FO to PDF formatter built on lopdf.
//!
//! The formatter accepts a subset of XSL-FO (page masters, static content,
//! blocks, inlines, page numbers and tables) and writes each page to the output
//! as soon as it is laid out.

pub mod formatter;
pub mod layout;
pub mod metrics;
pub mod page;
pub mod properties;
pub mod table;
pub mod vocabulary;
pub mod writer;

pub use formatter::{FoFormatter, FoSink, RenderError, format_markup};
pub use vocabulary::FO_NS;
pub use writer::StreamingPdfWriter;
