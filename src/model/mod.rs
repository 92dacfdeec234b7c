//! Output object model
//!
//! The structures a parsed changelog is turned into. They mirror the
//! migration engine's own model (change log, change set, change, column and
//! constraint configs, precondition tree) and are treated as a fixed contract:
//! builders populate them, nothing here interprets them.

pub mod change;
pub mod precondition;

use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

pub use change::{
    Change, ChangeKind, ChangeParameter, ColumnConfig, ConstraintsConfig, SqlVisitor,
    SqlVisitorKind,
};
pub use precondition::{
    FailOption, OnSqlOutputOption, Precondition, PreconditionCheck, PreconditionContainer,
    PreconditionKind,
};

/// What to do when a change set's checksum no longer validates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationFailOption {
    #[default]
    Halt,
    MarkRan,
    Warn,
}

/// How the engine quotes object names in generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectQuotingStrategy {
    Legacy,
    QuoteAllObjects,
    QuoteOnlyReservedWords,
}

/// Comma-separated member names of an enum, for error messages.
pub fn member_names<E>() -> String
where
    E: IntoEnumIterator + Into<&'static str>,
{
    E::iter()
        .map(|e| e.into())
        .collect::<Vec<&'static str>>()
        .join(", ")
}

/// A root changelog, or one of the files it includes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogDocument {
    /// Path recorded on change sets; defaults to the physical path.
    pub logical_file_path: String,
    /// Path the document was actually read from.
    pub physical_file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_quoting_strategy: Option<ObjectQuotingStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<PreconditionContainer>,
    /// Execution order.
    pub change_sets: Vec<ChangeSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyBinding>,
}

impl ChangeLogDocument {
    pub fn new(physical_file_path: impl Into<String>) -> Self {
        let physical_file_path = physical_file_path.into();
        Self {
            logical_file_path: physical_file_path.clone(),
            physical_file_path,
            ..Self::default()
        }
    }

    /// Find a change set by identity. `author` is only compared when given.
    pub fn find_change_set(&self, id: &str, author: Option<&str>, path: &str) -> Option<&ChangeSet> {
        self.change_sets.iter().find(|cs| {
            cs.id == id && cs.file_path == path && author.is_none_or(|a| cs.author == a)
        })
    }
}

/// One identified unit of migration work.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub id: String,
    pub author: String,
    /// Logical path of the document that declared this change set.
    pub file_path: String,
    pub run_always: bool,
    pub run_on_change: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dbms: Vec<String>,
    pub run_in_transaction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_error: Option<bool>,
    pub on_validation_fail: ValidationFailOption,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_quoting_strategy: Option<ObjectQuotingStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub valid_checksums: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<PreconditionContainer>,
    pub changes: Vec<Change>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rollback: Vec<Change>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sql_visitors: Vec<SqlVisitor>,
}

impl ChangeSet {
    /// A change set with the engine's defaults: not run-always, not
    /// run-on-change, run in a transaction, halt on validation failure.
    pub fn new(id: impl Into<String>, author: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            file_path: file_path.into(),
            run_always: false,
            run_on_change: false,
            context: None,
            labels: Vec::new(),
            dbms: Vec::new(),
            run_in_transaction: true,
            fail_on_error: None,
            on_validation_fail: ValidationFailOption::default(),
            object_quoting_strategy: None,
            comments: None,
            valid_checksums: Vec::new(),
            preconditions: None,
            changes: Vec::new(),
            rollback: Vec::new(),
            sql_visitors: Vec::new(),
        }
    }
}

/// A named substitution value for `${name}` tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyBinding {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbms: Option<String>,
    /// Global bindings are visible to every document in the parse; local
    /// ones only to `source_document`.
    pub global: bool,
    /// Physical path of the document that declared the binding.
    pub source_document: String,
}
