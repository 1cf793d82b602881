//! Event-level markup contract shared by the transform engine and its consumers.
//!
//! A transform never builds an output tree. It reports start/end/text events to a
//! [`MarkupHandler`], which either serializes them (diagnostic buffers) or feeds
//! them straight into a document formatter.

use std::fmt;
use thiserror::Error;

/// An expanded element name: the prefix it was written with, its local part and
/// the namespace URI it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QName {
    /// A name in no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), namespace: None }
    }

    pub fn with_namespace(
        prefix: Option<&str>,
        local: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            local: local.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// `prefix:local`, or just `local` when unprefixed.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local),
            None => self.local.clone(),
        }
    }

    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// A single attribute on a start event. Names are kept as written (`font-size`,
/// `xml:lang`); namespace declarations are not reported as attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Looks up an attribute value by name.
pub fn attribute_value<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

/// A structural defect in page-description markup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("<{element}>: {message}")]
pub struct ValidationError {
    /// Qualified name of the offending element (or its parent, for text).
    pub element: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self { element: element.into(), message: message.into() }
    }
}

/// Failure reported by a [`MarkupHandler`].
#[derive(Error, Debug)]
pub enum SinkError {
    /// The events describe markup the consumer considers structurally invalid.
    #[error("Invalid page-description markup: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error while writing output: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure while consuming events.
    #[error("Rendering failed: {0}")]
    Render(String),
}

impl SinkError {
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            SinkError::Validation(v) => Some(v),
            _ => None,
        }
    }
}

/// Receiver of markup events, in document order.
pub trait MarkupHandler {
    fn start_document(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn start_element(&mut self, name: &QName, attributes: &[Attribute]) -> Result<(), SinkError>;

    fn end_element(&mut self, name: &QName) -> Result<(), SinkError>;

    fn text(&mut self, text: &str) -> Result<(), SinkError>;

    fn end_document(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<H: MarkupHandler + ?Sized> MarkupHandler for &mut H {
    fn start_document(&mut self) -> Result<(), SinkError> {
        (**self).start_document()
    }

    fn start_element(&mut self, name: &QName, attributes: &[Attribute]) -> Result<(), SinkError> {
        (**self).start_element(name, attributes)
    }

    fn end_element(&mut self, name: &QName) -> Result<(), SinkError> {
        (**self).end_element(name)
    }

    fn text(&mut self, text: &str) -> Result<(), SinkError> {
        (**self).text(text)
    }

    fn end_document(&mut self) -> Result<(), SinkError> {
        (**self).end_document()
    }
}

/// Collects only character data, discarding element structure. Used to turn a
/// result tree fragment into its string value.
#[derive(Debug, Default)]
pub struct TextCollector {
    pub text: String,
}

impl MarkupHandler for TextCollector {
    fn start_element(&mut self, _name: &QName, _attributes: &[Attribute]) -> Result<(), SinkError> {
        Ok(())
    }

    fn end_element(&mut self, _name: &QName) -> Result<(), SinkError> {
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), SinkError> {
        self.text.push_str(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_uses_prefix() {
        let name = QName::with_namespace(Some("fo"), "block", "urn:fo");
        assert_eq!(name.qualified(), "fo:block");
        assert!(name.is_in("urn:fo"));
        assert_eq!(QName::local("table").to_string(), "table");
    }

    #[test]
    fn empty_prefix_is_dropped() {
        let name = QName::with_namespace(Some(""), "root", "urn:x");
        assert_eq!(name.prefix, None);
    }

    #[test]
    fn validation_error_is_distinguishable() {
        let err: SinkError = ValidationError::new("fo:tabel", "unknown element").into();
        assert!(err.as_validation().is_some());
        assert!(err.to_string().contains("fo:tabel"));

        let io: SinkError = std::io::Error::other("disk full").into();
        assert!(io.as_validation().is_none());
    }

    #[test]
    fn text_collector_ignores_structure() {
        let mut collector = TextCollector::default();
        let name = QName::local("b");
        collector.start_element(&name, &[]).unwrap();
        collector.text("bold").unwrap();
        collector.end_element(&name).unwrap();
        collector.text(" text").unwrap();
        assert_eq!(collector.text, "bold text");
    }

    #[test]
    fn attribute_lookup() {
        let attrs = vec![Attribute::new("a", "1"), Attribute::new("b", "2")];
        assert_eq!(attribute_value(&attrs, "b"), Some("2"));
        assert_eq!(attribute_value(&attrs, "c"), None);
    }
}
