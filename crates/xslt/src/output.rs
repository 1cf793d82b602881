//! Adapts instruction output to the [`MarkupHandler`] event contract.
//!
//! `xsl:attribute` may add attributes to an element after its start tag has
//! been produced by the executor, so the start event is held back until the
//! first child, text or end event arrives.

use crate::error::XsltError;
use folio_traits::{Attribute, MarkupHandler, QName};

struct PendingElement {
    name: QName,
    attributes: Vec<Attribute>,
}

pub struct ResultBuilder<'h> {
    target: &'h mut dyn MarkupHandler,
    pending: Option<PendingElement>,
}

impl<'h> ResultBuilder<'h> {
    pub fn new(target: &'h mut dyn MarkupHandler) -> Self {
        Self { target, pending: None }
    }

    pub fn start_element(&mut self, name: QName) -> Result<(), XsltError> {
        self.flush()?;
        self.pending = Some(PendingElement { name, attributes: Vec::new() });
        Ok(())
    }

    /// Adds or replaces an attribute on the element whose start tag is still open.
    pub fn attribute(&mut self, name: &str, value: String) -> Result<(), XsltError> {
        let Some(pending) = self.pending.as_mut() else {
            return Err(XsltError::Execution(format!(
                "attribute '{}' added after element content or outside any element",
                name
            )));
        };
        match pending.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => pending.attributes.push(Attribute::new(name, value)),
        }
        Ok(())
    }

    pub fn text(&mut self, text: &str) -> Result<(), XsltError> {
        if text.is_empty() {
            return Ok(());
        }
        self.flush()?;
        self.target.text(text)?;
        Ok(())
    }

    pub fn end_element(&mut self, name: &QName) -> Result<(), XsltError> {
        self.flush()?;
        self.target.end_element(name)?;
        Ok(())
    }

    pub fn start_document(&mut self) -> Result<(), XsltError> {
        self.target.start_document()?;
        Ok(())
    }

    pub fn end_document(&mut self) -> Result<(), XsltError> {
        self.flush()?;
        self.target.end_document()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), XsltError> {
        if let Some(pending) = self.pending.take() {
            self.target.start_element(&pending.name, &pending.attributes)?;
        }
        Ok(())
    }
}
