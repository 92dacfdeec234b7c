//! Precondition trees.
//!
//! Combinators (`and`/`or`/`not`) and leaf checks are distinct enum variants,
//! so a tree's shape is fixed when it is built.

use crate::model::ChangeParameter;
use crate::parser::Attributes;
use serde::Serialize;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Reaction to a failed (or erroring) precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailOption {
    Halt,
    Continue,
    MarkRan,
    Warn,
}

/// Behaviour of preconditions when the engine only emits SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnSqlOutputOption {
    Ignore,
    Test,
    Fail,
}

/// Root of a precondition tree. Its nested preconditions are implicitly AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreconditionContainer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_fail: Option<FailOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_error: Option<FailOption>,
    #[serde(rename = "onUpdateSQL", skip_serializing_if = "Option::is_none")]
    pub on_update_sql: Option<OnSqlOutputOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_fail_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_error_message: Option<String>,
    pub nested: Vec<Precondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Precondition {
    And(Vec<Precondition>),
    Or(Vec<Precondition>),
    Not(Vec<Precondition>),
    Check(PreconditionCheck),
}

/// Leaf predicate element names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum PreconditionKind {
    Dbms,
    RunningAs,
    ChangeSetExecuted,
    ColumnExists,
    TableExists,
    ViewExists,
    ForeignKeyConstraintExists,
    IndexExists,
    SequenceExists,
    PrimaryKeyExists,
    SqlCheck,
    ChangeLogPropertyDefined,
    ExpectedQuotingStrategy,
    RowCount,
    TableIsEmpty,
    CustomPrecondition,
}

impl PreconditionKind {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreconditionCheck {
    pub kind: PreconditionKind,
    pub attributes: Attributes,
    /// The query of a `sqlCheck`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ChangeParameter>,
}

impl Precondition {
    /// Children of a combinator; leaves have none.
    pub fn children(&self) -> &[Precondition] {
        match self {
            Precondition::And(c) | Precondition::Or(c) | Precondition::Not(c) => c,
            Precondition::Check(_) => &[],
        }
    }
}
