//! Contract for formatters that turn page-description markup into a binary
//! document.

use crate::markup::{MarkupHandler, SinkError};
use std::io::Write;
use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";

/// Failure to start a document. Nothing meaningful has been written when this is
/// returned.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Unsupported output type: {0}")]
    UnsupportedMimeType(String),

    #[error("Cannot prepare output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid formatter configuration: {0}")]
    Config(String),
}

/// An open document. Markup events are fed through [`MarkupHandler`]; output is
/// written to the underlying sink as it becomes available.
pub trait DocumentSink: MarkupHandler {
    /// Completes the document and flushes the output.
    fn finish(self: Box<Self>) -> Result<(), SinkError>;
}

/// Opens documents of one or more binary output types.
pub trait DocumentFormatter: Send + Sync + std::fmt::Debug {
    fn supports(&self, mime_type: &str) -> bool;

    fn begin_document<'w>(
        &self,
        mime_type: &str,
        output: &'w mut dyn Write,
    ) -> Result<Box<dyn DocumentSink + 'w>, FormatError>;

    /// Returns a human-readable name for this formatter (for logging).
    fn name(&self) -> &'static str;
}
