//! An XPath 1.0 subset evaluated over `roxmltree` documents.
//!
//! Covers location paths over the child, attribute, self, parent, ancestor,
//! descendant and sibling axes, predicates, variables, the usual operators and
//! the core function library plus `format-number`.

pub mod ast;
pub mod engine;
pub mod error;
pub mod functions;
pub mod node;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step};
pub use engine::{EvaluationContext, NoVariables, VariableResolver, XPathValue, evaluate, number_to_string};
pub use error::XPathError;
pub use node::{NodeKind, XNode, sort_document_order};
pub use parser::parse_expression;
