use folio_traits::{SinkError, TransformError};
use folio_xpath1::XPathError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

impl From<roxmltree::TextPos> for Location {
    fn from(pos: roxmltree::TextPos) -> Self {
        Location { line: pos.row, col: pos.col }
    }
}

#[derive(Error, Debug)]
pub enum XsltError {
    #[error("Stylesheet is not well-formed XML: {0}")]
    StylesheetXml(roxmltree::Error),

    #[error("Source document is not well-formed XML: {0}")]
    SourceXml(roxmltree::Error),

    #[error("Stylesheet compilation error at {location}: {message}")]
    Compilation { message: String, location: Location },

    #[error("XPath evaluation error: {0}")]
    XPath(#[from] XPathError),

    #[error("Template execution error: {0}")]
    Execution(String),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl XsltError {
    pub(crate) fn compilation(message: impl Into<String>, location: Location) -> Self {
        XsltError::Compilation { message: message.into(), location }
    }
}

impl From<XsltError> for TransformError {
    fn from(err: XsltError) -> Self {
        match err {
            XsltError::StylesheetXml(_) | XsltError::Compilation { .. } => {
                TransformError::Config(err.to_string())
            }
            XsltError::SourceXml(_) | XsltError::Utf8(_) => TransformError::Source(err.to_string()),
            XsltError::XPath(_) | XsltError::Execution(_) => TransformError::Runtime(err.to_string()),
            XsltError::Sink(e) => TransformError::Sink(e),
            XsltError::Io(e) => TransformError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_traits::ValidationError;

    #[test]
    fn sink_errors_survive_conversion() {
        let err = XsltError::Sink(ValidationError::new("fo:x", "unknown").into());
        let transform: TransformError = err.into();
        assert_eq!(transform.validation().map(|v| v.element.as_str()), Some("fo:x"));
    }

    #[test]
    fn compilation_errors_are_config_errors() {
        let err = XsltError::compilation("missing select", Location { line: 3, col: 5 });
        let transform: TransformError = err.into();
        assert!(matches!(transform, TransformError::Config(msg) if msg.contains("line 3, column 5")));
    }
}
