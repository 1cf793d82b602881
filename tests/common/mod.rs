#![allow(dead_code)]

pub mod fixtures;
pub mod pdf_assertions;

use folio::{ExportError, ExportPipeline, TableModel};
use lopdf::Document as LopdfDocument;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Wrapper around a generated PDF with helper methods
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub doc: LopdfDocument,
}

impl GeneratedPdf {
    /// Create a GeneratedPdf from raw bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Box<dyn std::error::Error>> {
        let doc = LopdfDocument::load_mem(&bytes)?;
        Ok(Self { bytes, doc })
    }

    /// Get the number of pages in the PDF
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// The raw content stream of every page, in page order
    pub fn page_contents(&self) -> Vec<String> {
        pdf_assertions::page_contents(&self.doc)
    }

    /// The `/Title` entry of the document information dictionary
    pub fn title(&self) -> Option<String> {
        pdf_assertions::info_entry(&self.doc, b"Title")
    }

    /// Save PDF to a file for manual debugging
    pub fn save_for_debug(&self, name: &str) -> std::io::Result<()> {
        std::fs::write(format!("test_output_{}.pdf", name), &self.bytes)
    }
}

/// Export `model` through `pipeline` into memory and load the result back.
pub fn export_pdf(pipeline: &ExportPipeline, model: &TableModel) -> Result<GeneratedPdf, Box<dyn std::error::Error>> {
    let mut bytes = Vec::new();
    pipeline.export(model, &mut bytes)?;
    GeneratedPdf::from_bytes(bytes)
}

/// Export expecting failure; returns the error and the bytes written before it.
pub fn export_err(pipeline: &ExportPipeline, model: &TableModel) -> (ExportError, Vec<u8>) {
    let mut bytes = Vec::new();
    match pipeline.export(model, &mut bytes) {
        Ok(()) => panic!("export unexpectedly succeeded ({} bytes)", bytes.len()),
        Err(e) => (e, bytes),
    }
}
