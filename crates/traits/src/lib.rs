//! Seams shared by the folio crates: resource lookup, markup events, transform
//! engines and document formatters.

pub mod format;
pub mod markup;
pub mod resource;
pub mod transform;

pub use format::{DocumentFormatter, DocumentSink, FormatError, MIME_PDF};
pub use markup::{
    Attribute, MarkupHandler, QName, SinkError, TextCollector, ValidationError, attribute_value,
};
pub use resource::{InMemoryResourceProvider, ResourceError, ResourceProvider, SharedResourceData};
pub use transform::{CompiledTransform, TransformEngine, TransformError};
