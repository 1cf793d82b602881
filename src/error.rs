// src/error.rs
use crate::markup::MarkupError;
use folio_traits::{FormatError, TransformError, ValidationError};
use thiserror::Error;

/// Which stage of an export failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportErrorKind {
    Markup,
    StyleNotFound,
    TransformConfig,
    FormatterInit,
    Validation,
    RenderRuntime,
}

/// The single error type returned by an export. Every variant is fatal to the
/// export that raised it.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot build intermediate markup: {0}")]
    Markup(#[from] MarkupError),

    #[error("Style document not found: '{0}'")]
    StyleNotFound(String),

    #[error("Style document cannot be compiled: {0}")]
    TransformConfig(#[source] TransformError),

    #[error("Cannot start the output document: {0}")]
    FormatterInit(#[from] FormatError),

    /// The formatter rejected the generated page-description markup. Output
    /// already written is unusable. `markup` holds the page-description text
    /// captured by re-running the transform, when that succeeded.
    #[error("Generated page-description markup is invalid: {source}")]
    Validation { source: TransformError, markup: Option<String> },

    #[error("Rendering failed: {0}")]
    RenderRuntime(#[source] TransformError),
}

impl ExportError {
    pub fn kind(&self) -> ExportErrorKind {
        match self {
            ExportError::Markup(_) => ExportErrorKind::Markup,
            ExportError::StyleNotFound(_) => ExportErrorKind::StyleNotFound,
            ExportError::TransformConfig(_) => ExportErrorKind::TransformConfig,
            ExportError::FormatterInit(_) => ExportErrorKind::FormatterInit,
            ExportError::Validation { .. } => ExportErrorKind::Validation,
            ExportError::RenderRuntime(_) => ExportErrorKind::RenderRuntime,
        }
    }

    /// The formatter's validation failure, for `Validation` errors.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            ExportError::Validation { source, .. } => source.validation(),
            _ => None,
        }
    }

    /// The page-description text captured while diagnosing a validation failure.
    pub fn captured_markup(&self) -> Option<&str> {
        match self {
            ExportError::Validation { markup, .. } => markup.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_traits::SinkError;
    use std::error::Error as _;

    #[test]
    fn kinds_and_sources() {
        let err = ExportError::StyleNotFound("missing.xsl".into());
        assert_eq!(err.kind(), ExportErrorKind::StyleNotFound);
        assert!(err.to_string().contains("missing.xsl"));
        assert!(err.source().is_none());

        let cause = TransformError::Sink(SinkError::Validation(ValidationError::new("fo:tabel", "unknown formatting object")));
        let err = ExportError::Validation { source: cause, markup: Some("<fo:root/>".into()) };
        assert_eq!(err.kind(), ExportErrorKind::Validation);
        assert_eq!(err.validation_error().map(|v| v.element.as_str()), Some("fo:tabel"));
        assert_eq!(err.captured_markup(), Some("<fo:root/>"));
        assert!(err.source().is_some());
    }
}
