//! Locates the style document for an export.

use crate::config::ExportConfig;
use crate::error::ExportError;
use folio_traits::{ResourceProvider, SharedResourceData};
use log::{debug, warn};

/// A style document ready to be compiled.
#[derive(Debug, Clone)]
pub enum StyleDocument {
    /// Literal text taken from `stylesheet-body`.
    Inline(String),
    /// Bytes loaded from a resource provider.
    Resource { path: String, data: SharedResourceData },
}

impl StyleDocument {
    pub fn bytes(&self) -> &[u8] {
        match self {
            StyleDocument::Inline(text) => text.as_bytes(),
            StyleDocument::Resource { data, .. } => data,
        }
    }

    /// Where the document came from, for logging.
    pub fn origin(&self) -> &str {
        match self {
            StyleDocument::Inline(_) => "<inline>",
            StyleDocument::Resource { path, .. } => path,
        }
    }
}

/// Resolves `stylesheet-body` / `stylesheet-path` against a resource provider.
pub struct StyleResolver<'p> {
    resources: &'p dyn ResourceProvider,
}

impl<'p> StyleResolver<'p> {
    pub fn new(resources: &'p dyn ResourceProvider) -> Self {
        Self { resources }
    }

    /// A non-blank literal body wins and the provider is not consulted.
    /// Otherwise the configured path is loaded; a missing path or a failed
    /// load is `StyleNotFound`.
    pub fn resolve(&self, config: &ExportConfig) -> Result<StyleDocument, ExportError> {
        if let Some(body) = config.get_non_empty(ExportConfig::STYLESHEET_BODY) {
            debug!("Using inline style document ({} bytes)", body.len());
            return Ok(StyleDocument::Inline(body.to_string()));
        }

        let path = config.get_non_empty(ExportConfig::STYLESHEET_PATH).map(str::trim).unwrap_or_default();
        if path.is_empty() {
            warn!("No style document configured");
            return Err(ExportError::StyleNotFound(String::new()));
        }

        match self.resources.load(path) {
            Ok(data) => {
                debug!("Loaded style document '{}' from {}", path, self.resources.name());
                Ok(StyleDocument::Resource { path: path.to_string(), data })
            }
            Err(e) => {
                warn!("Style document '{}' unavailable: {}", path, e);
                Err(ExportError::StyleNotFound(path.to_string()))
            }
        }
    }
}
