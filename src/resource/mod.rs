//! Resource providers for the export pipeline.
//!
//! The platform providers live in `folio-resource`; this module adds the
//! resources compiled into the binary.
//!
//! ## Available Providers
//!
//! - [`bundled`]: the default table stylesheet at [`DEFAULT_STYLESHEET_PATH`]
//! - [`FilesystemResourceProvider`]: resources below a root directory
//! - [`LayeredResourceProvider`]: first match wins across several providers

use crate::config::DEFAULT_STYLESHEET_PATH;

pub use folio_resource::{FilesystemResourceProvider, InMemoryResourceProvider, LayeredResourceProvider};

const TABLE_STYLESHEET: &str = include_str!("../../resources/table-fo.xsl");

/// Resources shipped with the crate.
pub fn bundled() -> InMemoryResourceProvider {
    InMemoryResourceProvider::new().with_resource(DEFAULT_STYLESHEET_PATH, TABLE_STYLESHEET)
}
