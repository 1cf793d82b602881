//! Contract between the export pipeline and a markup-to-markup transformation
//! engine.

use crate::markup::{MarkupHandler, SinkError, ValidationError};
use std::fmt::Debug;
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while compiling or applying a transformation.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The style document itself is unusable (malformed, unknown instruction, ...).
    #[error("Invalid style document: {0}")]
    Config(String),

    /// The source markup could not be read or parsed.
    #[error("Invalid source markup: {0}")]
    Source(String),

    /// Evaluation failed while producing output.
    #[error("Transformation failed: {0}")]
    Runtime(String),

    /// The result handler rejected an event. The original error is kept intact.
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// The validation failure that aborted the transform, if the result handler
    /// raised one.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            TransformError::Sink(sink) => sink.as_validation(),
            _ => None,
        }
    }
}

/// A style document compiled once and applied any number of times.
///
/// `apply` must be deterministic: the same source bytes always produce the same
/// event sequence. Implementations hold no per-call state.
pub trait CompiledTransform: Send + Sync + Debug {
    fn apply(&self, source: &mut dyn Read, handler: &mut dyn MarkupHandler) -> Result<(), TransformError>;
}

/// Factory for compiled transforms.
pub trait TransformEngine: Send + Sync + Debug {
    /// Parses and compiles a style document. Failures are always
    /// [`TransformError::Config`].
    fn compile(&self, style: &mut dyn Read) -> Result<Arc<dyn CompiledTransform>, TransformError>;

    /// Returns a human-readable name for this engine (for logging).
    fn name(&self) -> &'static str;
}
