//! ResourceProvider trait for abstracting stylesheet and asset lookup.
//!
//! The export pipeline resolves its default stylesheet by path through this
//! trait, so it never touches the filesystem directly.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug, Clone)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to load resource '{path}': {message}")]
    LoadFailed { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::Io(err.to_string())
    }
}

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// A read-only set of named resources.
///
/// Implementations must be safe for unsynchronized concurrent reads: several
/// exports may resolve their stylesheets from the same provider at once.
pub trait ResourceProvider: Send + Sync + Debug {
    /// Load a resource by its path.
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError>;

    /// Check if a resource exists without loading it.
    fn exists(&self, path: &str) -> bool;

    /// Returns a human-readable name for this provider (for logging).
    fn name(&self) -> &'static str;
}

/// A resource provider backed by a map that is filled before the provider is
/// shared and never mutated afterwards.
#[derive(Debug, Default, Clone)]
pub struct InMemoryResourceProvider {
    resources: HashMap<String, SharedResourceData>,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used to assemble bundled resource sets.
    pub fn with_resource(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    /// Inserts or replaces a resource.
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.resources.insert(path.into(), Arc::new(data.into()));
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates over the stored resource paths in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        self.resources
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resources.contains_key(path)
    }

    fn name(&self) -> &'static str {
        "InMemoryResourceProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_returns_inserted_bytes() {
        let provider = InMemoryResourceProvider::new().with_resource("style.xsl", "<xsl/>");
        let data = provider.load("style.xsl").unwrap();
        assert_eq!(&*data, b"<xsl/>");
    }

    #[test]
    fn missing_resource_is_not_found() {
        let provider = InMemoryResourceProvider::new();
        let result = provider.load("nonexistent.xsl");
        assert!(matches!(result, Err(ResourceError::NotFound(p)) if p == "nonexistent.xsl"));
    }

    #[test]
    fn exists_reflects_contents() {
        let provider = InMemoryResourceProvider::new().with_resource("a", vec![]);
        assert!(provider.exists("a"));
        assert!(!provider.exists("b"));
    }

    #[test]
    fn insert_overwrites() {
        let mut provider = InMemoryResourceProvider::new();
        provider.insert("s", "one");
        provider.insert("s", "two");
        assert_eq!(provider.len(), 1);
        assert_eq!(&*provider.load("s").unwrap(), b"two");
    }

    #[test]
    fn shared_data_is_not_copied_per_load() {
        let provider = InMemoryResourceProvider::new().with_resource("big", vec![0u8; 4096]);
        let first = provider.load("big").unwrap();
        let second = provider.load("big").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn error_display_names_path() {
        let err = ResourceError::LoadFailed {
            path: "file.xsl".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("file.xsl"));
        assert!(err.to_string().contains("permission denied"));
    }
}
