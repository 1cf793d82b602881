// src/pipeline/builder.rs
use super::diagnostics::{DiagnosticSink, LogDiagnostics};
use super::orchestrator::ExportPipeline;
use crate::markup::{MarkupProducer, XmlTotalsWriter};
use crate::resource;
use folio_render_lopdf::FoFormatter;
use folio_traits::{DocumentFormatter, ResourceProvider, TransformEngine};
use folio_xslt::XsltEngine;
use std::sync::Arc;

/// A builder for creating an `ExportPipeline`.
///
/// Every collaborator has a default: [`XmlTotalsWriter`], [`XsltEngine`],
/// [`FoFormatter`], the bundled resources and [`LogDiagnostics`].
#[derive(Debug, Default)]
pub struct ExportPipelineBuilder {
    producer: Option<Arc<dyn MarkupProducer>>,
    engine: Option<Arc<dyn TransformEngine>>,
    formatter: Option<Arc<dyn DocumentFormatter>>,
    resources: Option<Arc<dyn ResourceProvider>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
    verbose: Option<bool>,
}

impl ExportPipelineBuilder {
    pub fn new() -> Self { Default::default() }

    pub fn with_producer(mut self, producer: impl MarkupProducer + 'static) -> Self { self.producer = Some(Arc::new(producer)); self }

    pub fn with_engine(mut self, engine: impl TransformEngine + 'static) -> Self { self.engine = Some(Arc::new(engine)); self }

    pub fn with_formatter(mut self, formatter: impl DocumentFormatter + 'static) -> Self { self.formatter = Some(Arc::new(formatter)); self }

    /// Sets where `stylesheet-path` is looked up. Replaces the bundled
    /// resources; layer them back in with `LayeredResourceProvider` if needed.
    pub fn with_resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self { self.resources = Some(resources); self }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self { self.diagnostics = Some(diagnostics); self }

    /// Dumps the page-description markup of every export. Unset, the
    /// diagnostic sink decides.
    pub fn with_verbose(mut self, verbose: bool) -> Self { self.verbose = Some(verbose); self }

    /// Consumes the builder and creates the `ExportPipeline`.
    pub fn build(self) -> ExportPipeline {
        ExportPipeline::new(
            self.producer.unwrap_or_else(|| Arc::new(XmlTotalsWriter::new())),
            self.engine.unwrap_or_else(|| Arc::new(XsltEngine::new())),
            self.formatter.unwrap_or_else(|| Arc::new(FoFormatter::new())),
            self.resources.unwrap_or_else(|| Arc::new(resource::bundled())),
            self.diagnostics.unwrap_or_else(|| Arc::new(LogDiagnostics::new())),
            self.verbose,
        )
    }
}
