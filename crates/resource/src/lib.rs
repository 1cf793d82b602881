//! Resource providers for the folio export pipeline.
//!
//! ## Available Providers
//!
//! - [`FilesystemResourceProvider`]: resources below a root directory
//! - [`LayeredResourceProvider`]: ordered fallback across other providers
//! - [`InMemoryResourceProvider`]: re-exported from folio-traits

mod filesystem;
mod layered;

pub use filesystem::FilesystemResourceProvider;
pub use layered::LayeredResourceProvider;

pub use folio_traits::InMemoryResourceProvider;
