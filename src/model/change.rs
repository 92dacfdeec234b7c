//! Changes and their nested column / constraint / parameter configs.

use crate::parser::Attributes;
use serde::Serialize;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Every change element a change set may contain, by DSL element name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    AddAutoIncrement,
    AddColumn,
    AddDefaultValue,
    AddForeignKeyConstraint,
    AddLookupTable,
    AddNotNullConstraint,
    AddPrimaryKey,
    AddUniqueConstraint,
    AlterSequence,
    CreateIndex,
    CreateProcedure,
    CreateSequence,
    CreateTable,
    CreateView,
    CustomChange,
    Delete,
    DropAllForeignKeyConstraints,
    DropColumn,
    DropDefaultValue,
    DropForeignKeyConstraint,
    DropIndex,
    DropNotNullConstraint,
    DropPrimaryKey,
    DropProcedure,
    DropSequence,
    DropTable,
    DropUniqueConstraint,
    DropView,
    Empty,
    ExecuteCommand,
    Insert,
    LoadData,
    LoadUpdateData,
    MergeColumns,
    ModifyDataType,
    Output,
    RenameColumn,
    RenameSequence,
    RenameTable,
    RenameView,
    SetColumnRemarks,
    SetTableRemarks,
    Sql,
    SqlFile,
    Stop,
    TagDatabase,
    Update,
}

impl ChangeKind {
    /// DSL element name, e.g. `renameTable`.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One concrete operation inside a change set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub kind: ChangeKind,
    /// Validated, token-expanded attributes in declaration order.
    pub attributes: Attributes,
    /// Body text: SQL for `sql`, the procedure body, a view's select query,
    /// the message of `stop`/`output`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnConfig>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ChangeParameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Change {
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            attributes: Attributes::new(),
            text: None,
            comment: None,
            columns: Vec::new(),
            where_clause: None,
            params: Vec::new(),
            args: Vec::new(),
        }
    }

    /// A raw SQL change, as produced by `rollback "..."`.
    pub fn raw_sql(sql: impl Into<String>) -> Self {
        let mut change = Self::new(ChangeKind::Sql);
        change.text = Some(sql.into());
        change
    }

    /// String attribute lookup.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }
}

/// A column inside createTable, addColumn, insert, update, loadData, ...
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConfig {
    pub attributes: Attributes,
    /// Every `constraints` element of the column merged into one config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ConstraintsConfig>,
}

impl ColumnConfig {
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConstraintsConfig {
    pub attributes: Attributes,
}

/// A `param` of customChange / customPrecondition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeParameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A `modifySql` rewrite applied to the SQL the engine generates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlVisitor {
    #[serde(flatten)]
    pub kind: SqlVisitorKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dbms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub apply_to_rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SqlVisitorKind {
    Prepend { value: String },
    Append { value: String },
    Replace { replace: String, with: String },
    RegExpReplace { replace: String, with: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_change_kind_uses_dsl_element_names() {
        assert_eq!(ChangeKind::from_str("renameTable").ok(), Some(ChangeKind::RenameTable));
        assert_eq!(
            ChangeKind::from_str("dropAllForeignKeyConstraints").ok(),
            Some(ChangeKind::DropAllForeignKeyConstraints)
        );
        assert_eq!(ChangeKind::from_str("sql").ok(), Some(ChangeKind::Sql));
        assert_eq!(ChangeKind::SqlFile.name(), "sqlFile");
        assert!(ChangeKind::from_str("RenameTable").is_err());
    }

    #[test]
    fn test_raw_sql_change() {
        let change = Change::raw_sql("drop table t");
        assert_eq!(change.kind, ChangeKind::Sql);
        assert_eq!(change.text.as_deref(), Some("drop table t"));
    }
}
