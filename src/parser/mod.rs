//! DSL text parsing and IR generation

pub mod grammar;
pub mod ir;

use thiserror::Error;

pub use grammar::parse_document;
pub use ir::{Attributes, Node, Value};

/// A syntax error in DSL source text.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    /// 1-based line where parsing stopped.
    pub line: usize,
    pub message: String,
}
