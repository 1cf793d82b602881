//! Intermediate markup: the fixed-schema XML document a style transformation
//! consumes.
//!
//! ```text
//! table [title]
//!   header
//!     header-cell [total="true"]   one per visible column
//!   data
//!     subgroup grouped-by="N"     one level per grouping column, level 0 outermost
//!       row
//!         cell [grouped="true"]    one per visible column
//!       subtotal
//!         subtotal-cell            one per visible totaled column
//! ```

mod totals;

pub use totals::XmlTotalsWriter;

use crate::model::TableModel;
use std::fmt::Debug;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Grouping column {column} does not exist; the table has {columns} columns")]
    InvalidGrouping { column: usize, columns: usize },

    #[error("The {location} contains U+{code:04X}, which XML does not allow")]
    InvalidCharacter { location: String, code: u32 },

    #[error("Cannot write intermediate markup: {0}")]
    Write(String),
}

/// Serializes a table model into intermediate markup.
pub trait MarkupProducer: Send + Sync + Debug {
    fn produce(&self, model: &TableModel, output: &mut dyn Write) -> Result<(), MarkupError>;

    /// Returns a human-readable name for this producer (for logging).
    fn name(&self) -> &'static str;
}
