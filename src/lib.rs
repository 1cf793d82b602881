//! Table export pipeline: a table model is written as intermediate XML,
//! transformed by an XSLT stylesheet into XSL-FO and streamed out as PDF.

pub mod config;
pub mod error;
pub mod markup;
pub mod model;
pub mod pipeline;
pub mod resource;
pub mod style;

pub use config::{ConfigError, DEFAULT_STYLESHEET_PATH, ExportConfig};
pub use error::{ExportError, ExportErrorKind};
pub use markup::{MarkupError, MarkupProducer, XmlTotalsWriter};
pub use model::{CellValue, Column, TableModel};
pub use pipeline::{
    DiagnosticEntry, DiagnosticLevel, DiagnosticSink, ExportPipeline, ExportPipelineBuilder, LogDiagnostics,
    MemoryDiagnostics,
};
pub use style::{StyleDocument, StyleResolver};

pub use folio_render_lopdf::FoFormatter;
pub use folio_traits::{ResourceProvider, ValidationError};
pub use folio_xslt::XsltEngine;
