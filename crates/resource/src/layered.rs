//! Ordered lookup across several providers.

use folio_traits::{ResourceError, ResourceProvider, SharedResourceData};
use std::sync::Arc;

/// Tries each provider in order; the first one that has the resource wins.
///
/// Typical use puts a user resource directory in front of the bundled defaults,
/// so a deployment can shadow a bundled stylesheet without rebuilding.
#[derive(Debug, Default, Clone)]
pub struct LayeredResourceProvider {
    layers: Vec<Arc<dyn ResourceProvider>>,
}

impl LayeredResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer with lower precedence than every layer added before it.
    pub fn with_layer(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.layers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl ResourceProvider for LayeredResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        for layer in &self.layers {
            match layer.load(path) {
                Err(ResourceError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(ResourceError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.layers.iter().any(|l| l.exists(path))
    }

    fn name(&self) -> &'static str {
        "LayeredResourceProvider"
    }
}
