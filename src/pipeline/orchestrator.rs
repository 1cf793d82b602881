// src/pipeline/orchestrator.rs
use super::diagnostics::{DiagnosticEntry, DiagnosticLevel, DiagnosticSink};
use crate::error::ExportError;
use crate::markup::MarkupProducer;
use crate::model::TableModel;
use crate::style::StyleResolver;
use folio_traits::{CompiledTransform, DocumentFormatter, MIME_PDF, ResourceProvider, TransformEngine, TransformError};
use folio_xslt::XmlTextWriter;
use log::{debug, info};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

/// Runs table exports: intermediate markup, style transformation, then PDF.
///
/// Holds only shared, immutable collaborators; one pipeline can serve any
/// number of concurrent exports.
#[derive(Debug, Clone)]
pub struct ExportPipeline {
    producer: Arc<dyn MarkupProducer>,
    engine: Arc<dyn TransformEngine>,
    formatter: Arc<dyn DocumentFormatter>,
    resources: Arc<dyn ResourceProvider>,
    diagnostics: Arc<dyn DiagnosticSink>,
    verbose: Option<bool>,
}

impl ExportPipeline {
    pub(super) fn new(
        producer: Arc<dyn MarkupProducer>,
        engine: Arc<dyn TransformEngine>,
        formatter: Arc<dyn DocumentFormatter>,
        resources: Arc<dyn ResourceProvider>,
        diagnostics: Arc<dyn DiagnosticSink>,
        verbose: Option<bool>,
    ) -> Self {
        Self { producer, engine, formatter, resources, diagnostics, verbose }
    }

    /// Renders `model` as a PDF into `output`.
    ///
    /// Nothing is written to `output` unless the style document resolved and
    /// compiled. After a `Validation` error the bytes already written are
    /// unusable.
    pub fn export(&self, model: &TableModel, output: &mut dyn Write) -> Result<(), ExportError> {
        let start = Instant::now();
        let markup = self.build_markup(model)?;
        let transform = self.compile(model)?;

        let mut sink = self.formatter.begin_document(MIME_PDF, output)?;
        debug!("Opened {} document with {}", MIME_PDF, self.formatter.name());

        if self.verbose() {
            self.dump_markup(transform.as_ref(), &markup, None);
        }

        let streamed = {
            let mut handler = &mut *sink;
            transform.apply(&mut markup.as_slice(), &mut handler)
        };
        let result = streamed.and_then(|()| sink.finish().map_err(TransformError::Sink));

        match result {
            Ok(()) => {
                info!("Exported {} rows in {:.2?}", model.rows.len(), start.elapsed());
                Ok(())
            }
            Err(e) if e.validation().is_some() => {
                let captured = self.dump_markup(transform.as_ref(), &markup, Some(&e));
                Err(ExportError::Validation { source: e, markup: captured })
            }
            Err(e) => Err(ExportError::RenderRuntime(e)),
        }
    }

    /// Runs only the first two stages and returns the page-description markup
    /// as text. Useful when writing a stylesheet against sample data.
    pub fn transform_to_string(&self, model: &TableModel) -> Result<String, ExportError> {
        let markup = self.build_markup(model)?;
        let transform = self.compile(model)?;
        capture(transform.as_ref(), &markup).map_err(ExportError::RenderRuntime)
    }

    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticSink> {
        &self.diagnostics
    }

    fn verbose(&self) -> bool {
        self.verbose.unwrap_or_else(|| self.diagnostics.verbose())
    }

    fn build_markup(&self, model: &TableModel) -> Result<Vec<u8>, ExportError> {
        let mut markup = Vec::new();
        self.producer.produce(model, &mut markup)?;
        debug!("{} produced {} bytes of intermediate markup", self.producer.name(), markup.len());
        Ok(markup)
    }

    fn compile(&self, model: &TableModel) -> Result<Arc<dyn CompiledTransform>, ExportError> {
        let style = StyleResolver::new(self.resources.as_ref()).resolve(&model.config)?;
        debug!("Compiling style document {} with {}", style.origin(), self.engine.name());
        self.engine.compile(&mut style.bytes()).map_err(ExportError::TransformConfig)
    }

    /// Re-runs the transform into a text buffer and records it. With `failure`
    /// set the entry is an error carrying that failure; otherwise it is
    /// informational. A failing re-run is only reported, never returned.
    fn dump_markup(
        &self,
        transform: &dyn CompiledTransform,
        markup: &[u8],
        failure: Option<&TransformError>,
    ) -> Option<String> {
        match capture(transform, markup) {
            Ok(text) => {
                let (level, message) = match failure {
                    Some(e) => (DiagnosticLevel::Error, format!("Page-description markup failed validation: {}", e)),
                    None => (DiagnosticLevel::Info, "Generated page-description markup:".to_string()),
                };
                self.diagnostics.record(DiagnosticEntry { level, message, markup: Some(text.clone()) });
                Some(text)
            }
            Err(rerun) => {
                let message = match failure {
                    Some(e) => format!("Page-description markup failed validation: {} (capture failed: {})", e, rerun),
                    None => format!("Cannot capture page-description markup: {}", rerun),
                };
                let level = if failure.is_some() { DiagnosticLevel::Error } else { DiagnosticLevel::Warn };
                self.diagnostics.record(DiagnosticEntry { level, message, markup: None });
                None
            }
        }
    }
}

fn capture(transform: &dyn CompiledTransform, markup: &[u8]) -> Result<String, TransformError> {
    let mut writer = XmlTextWriter::indented(Vec::new());
    transform.apply(&mut &markup[..], &mut writer)?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| TransformError::Runtime(format!("page-description markup is not UTF-8: {}", e)))
}
