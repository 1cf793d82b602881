//! Export pipeline orchestration.
//!
//! - [`ExportPipelineBuilder`]: wires producer, transform engine, formatter,
//!   resources and diagnostics together
//! - [`ExportPipeline`]: runs exports; shareable across threads
//! - [`DiagnosticSink`]: receives page-description dumps in verbose mode and
//!   after validation failures
//!
//! # Example
//!
//! ```ignore
//! use folio::{Column, ExportPipelineBuilder, TableModel};
//!
//! let model = TableModel::new(vec![Column::new("Name"), Column::new("Amount").totaled()])
//!     .with_row(vec!["A".into(), 10i64.into()])
//!     .group_by(0);
//! let pipeline = ExportPipelineBuilder::new().build();
//! let mut pdf = Vec::new();
//! pipeline.export(&model, &mut pdf)?;
//! ```

mod builder;
pub mod diagnostics;
mod orchestrator;

pub use builder::ExportPipelineBuilder;
pub use diagnostics::{DiagnosticEntry, DiagnosticLevel, DiagnosticSink, LogDiagnostics, MemoryDiagnostics};
pub use orchestrator::ExportPipeline;
