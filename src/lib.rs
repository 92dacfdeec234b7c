//! changelog-dsl: declarative changelog front-end
//!
//! Parses changelogs written in a compact, Groovy-flavoured DSL into the
//! change-log / change-set / change object model a migration engine
//! executes. Element attributes are checked against per-element allow-lists,
//! `${property}` tokens are expanded, loosely typed booleans are coerced, and
//! `include`/`includeAll` pull other changelog files into the result.

pub mod coerce;
pub mod config;
pub mod input;
pub mod model;
pub mod output;
pub mod parser;

// Re-export commonly used types
pub use config::Config;
pub use input::{ChangeLogParseError, ChangeLogParser, ParserOptions};
pub use model::{Change, ChangeKind, ChangeLogDocument, ChangeSet};
pub use parser::{Node, Value};
