//! The public face of the crate: an engine that compiles style documents and
//! the compiled transform it hands out.

use crate::ast::CompiledStylesheet;
use crate::compiler;
use crate::error::XsltError;
use crate::executor::TemplateExecutor;
use crate::output::ResultBuilder;
use crate::serializer::XmlTextWriter;
use folio_traits::{CompiledTransform, MarkupHandler, TransformEngine, TransformError};
use folio_xpath1::XNode;
use log::{debug, trace};
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

/// Compiles XSLT 1.0 stylesheets.
#[derive(Debug, Default, Clone, Copy)]
pub struct XsltEngine;

impl XsltEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compiles stylesheet text directly, keeping the detailed error.
    pub fn compile_str(&self, style: &str) -> Result<XsltTransform, XsltError> {
        Ok(XsltTransform::new(compiler::compile(style)?))
    }
}

impl TransformEngine for XsltEngine {
    fn compile(&self, style: &mut dyn Read) -> Result<Arc<dyn CompiledTransform>, TransformError> {
        let mut text = String::new();
        style
            .read_to_string(&mut text)
            .map_err(|e| TransformError::Config(format!("cannot read style document: {}", e)))?;
        let start = Instant::now();
        let transform = self.compile_str(&text)?;
        debug!("Stylesheet compiled in {:.2?}", start.elapsed());
        Ok(Arc::new(transform))
    }

    fn name(&self) -> &'static str {
        "xslt-1.0"
    }
}

/// A compiled stylesheet. Immutable, so it can be shared across threads and
/// applied concurrently.
#[derive(Debug, Clone)]
pub struct XsltTransform {
    compiled: Arc<CompiledStylesheet>,
}

impl XsltTransform {
    pub fn new(compiled: CompiledStylesheet) -> Self {
        Self { compiled: Arc::new(compiled) }
    }

    pub fn stylesheet(&self) -> &CompiledStylesheet {
        &self.compiled
    }

    /// Runs the transform over source text, streaming events into `handler`.
    pub fn transform_str(&self, source: &str, handler: &mut dyn MarkupHandler) -> Result<(), XsltError> {
        let doc = roxmltree::Document::parse(source).map_err(XsltError::SourceXml)?;
        let root = XNode::root_of(&doc);
        let mut builder = ResultBuilder::new(handler);
        builder.start_document()?;
        TemplateExecutor::new(&self.compiled, root).run(&mut builder)?;
        builder.end_document()
    }

    /// Runs the transform and serializes the result as XML text.
    pub fn transform_to_string(&self, source: &str) -> Result<String, XsltError> {
        let mut writer = if self.compiled.output.indent {
            XmlTextWriter::indented(Vec::new())
        } else {
            XmlTextWriter::new(Vec::new())
        };
        self.transform_str(source, &mut writer)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

impl CompiledTransform for XsltTransform {
    fn apply(&self, source: &mut dyn Read, handler: &mut dyn MarkupHandler) -> Result<(), TransformError> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(XsltError::from)?;
        trace!("Applying stylesheet to {} bytes of source markup", text.len());
        self.transform_str(&text, handler)?;
        Ok(())
    }
}
