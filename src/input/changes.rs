//! Leaf change builders.
//!
//! Every change element is checked against the attribute names the engine's
//! change class accepts, then copied (token-expanded) onto a [`Change`].
//! Nested `column`, `constraints`, `where`, `param` and `arg` elements are
//! only accepted by the kinds that have them.

use crate::coerce::as_text;
use crate::input::ChangeLogParseError;
use crate::input::properties::Expander;
use crate::input::validate::{reject_positional, required_text, validate_attributes};
use crate::model::{Change, ChangeKind, ChangeParameter, ColumnConfig, ConstraintsConfig};
use crate::parser::{Node, Value};

const COLUMN_ATTRIBUTES: &[&str] = &[
    "name",
    "computed",
    "type",
    "value",
    "valueNumeric",
    "valueBoolean",
    "valueDate",
    "valueComputed",
    "valueSequenceNext",
    "valueSequenceCurrent",
    "valueBlobFile",
    "valueClobFile",
    "encoding",
    "defaultValue",
    "defaultValueNumeric",
    "defaultValueBoolean",
    "defaultValueDate",
    "defaultValueComputed",
    "defaultValueSequenceNext",
    "defaultValueConstraintName",
    "autoIncrement",
    "startWith",
    "incrementBy",
    "generationType",
    "defaultOnNull",
    "remarks",
    "descending",
    "position",
    "afterColumn",
    "beforeColumn",
];

/// loadData columns also map CSV headers and indexes.
const LOAD_DATA_COLUMN_ATTRIBUTES: &[&str] = &[
    "name",
    "type",
    "header",
    "index",
    "defaultValue",
    "defaultValueNumeric",
    "defaultValueBoolean",
    "defaultValueDate",
    "defaultValueComputed",
    "allowUpdate",
];

const CONSTRAINT_ATTRIBUTES: &[&str] = &[
    "nullable",
    "notNullConstraintName",
    "primaryKey",
    "primaryKeyName",
    "primaryKeyTablespace",
    "unique",
    "uniqueConstraintName",
    "references",
    "referencedTableCatalogName",
    "referencedTableSchemaName",
    "referencedTableName",
    "referencedColumnNames",
    "foreignKeyName",
    "deleteCascade",
    "deferrable",
    "initiallyDeferred",
    "checkConstraint",
    "validateNullable",
    "validateUnique",
    "validatePrimaryKey",
    "validateForeignKey",
];

const PARAM_ATTRIBUTES: &[&str] = &["name", "value"];

/// Attributes the change element `kind` accepts.
pub fn change_attributes(kind: ChangeKind) -> &'static [&'static str] {
    use ChangeKind::*;
    match kind {
        AddAutoIncrement => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnName",
            "columnDataType",
            "startWith",
            "incrementBy",
            "defaultOnNull",
            "generationType",
        ],
        AddColumn | Delete | Insert | Update => &["catalogName", "schemaName", "tableName", "dbms"],
        AddDefaultValue => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnName",
            "columnDataType",
            "defaultValue",
            "defaultValueNumeric",
            "defaultValueDate",
            "defaultValueBoolean",
            "defaultValueComputed",
            "defaultValueSequenceNext",
            "defaultValueConstraintName",
        ],
        AddForeignKeyConstraint => &[
            "baseTableCatalogName",
            "baseTableSchemaName",
            "baseTableName",
            "baseColumnNames",
            "constraintName",
            "referencedTableCatalogName",
            "referencedTableSchemaName",
            "referencedTableName",
            "referencedColumnNames",
            "deferrable",
            "initiallyDeferred",
            "onUpdate",
            "onDelete",
            "deleteCascade",
            "validate",
        ],
        AddLookupTable => &[
            "existingTableCatalogName",
            "existingTableSchemaName",
            "existingTableName",
            "existingColumnName",
            "newTableCatalogName",
            "newTableSchemaName",
            "newTableName",
            "newColumnName",
            "newColumnDataType",
            "constraintName",
        ],
        AddNotNullConstraint => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnName",
            "defaultNullValue",
            "columnDataType",
            "constraintName",
            "validate",
        ],
        AddPrimaryKey => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnNames",
            "constraintName",
            "tablespace",
            "clustered",
            "forIndexCatalogName",
            "forIndexSchemaName",
            "forIndexName",
            "validate",
        ],
        AddUniqueConstraint => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnNames",
            "constraintName",
            "tablespace",
            "deferrable",
            "initiallyDeferred",
            "disabled",
            "clustered",
            "forIndexCatalogName",
            "forIndexSchemaName",
            "forIndexName",
            "validate",
        ],
        AlterSequence => &[
            "catalogName",
            "schemaName",
            "sequenceName",
            "incrementBy",
            "maxValue",
            "minValue",
            "ordered",
            "cacheSize",
            "cycle",
            "dataType",
        ],
        CreateIndex => &[
            "catalogName",
            "schemaName",
            "tableName",
            "indexName",
            "unique",
            "tablespace",
            "clustered",
        ],
        CreateProcedure => &[
            "catalogName",
            "schemaName",
            "procedureName",
            "path",
            "relativeToChangelogFile",
            "encoding",
            "dbms",
            "comments",
            "replaceIfExists",
        ],
        CreateSequence => &[
            "catalogName",
            "schemaName",
            "sequenceName",
            "startValue",
            "incrementBy",
            "maxValue",
            "minValue",
            "ordered",
            "cacheSize",
            "cycle",
            "dataType",
        ],
        CreateTable => &["catalogName", "schemaName", "tableName", "tablespace", "remarks"],
        CreateView => &[
            "catalogName",
            "schemaName",
            "viewName",
            "replaceIfExists",
            "fullDefinition",
            "path",
            "relativeToChangelogFile",
            "encoding",
            "remarks",
        ],
        CustomChange => &["class"],
        DropAllForeignKeyConstraints => {
            &["baseTableCatalogName", "baseTableSchemaName", "baseTableName"]
        }
        DropColumn => &["catalogName", "schemaName", "tableName", "columnName"],
        DropDefaultValue => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnName",
            "columnDataType",
        ],
        DropForeignKeyConstraint => &[
            "baseTableCatalogName",
            "baseTableSchemaName",
            "baseTableName",
            "constraintName",
        ],
        DropIndex => &["catalogName", "schemaName", "tableName", "indexName"],
        DropNotNullConstraint => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnName",
            "columnDataType",
            "constraintName",
        ],
        DropPrimaryKey => &[
            "catalogName",
            "schemaName",
            "tableName",
            "constraintName",
            "dropIndex",
        ],
        DropProcedure => &["catalogName", "schemaName", "procedureName"],
        DropSequence => &["catalogName", "schemaName", "sequenceName"],
        DropTable => &["catalogName", "schemaName", "tableName", "cascadeConstraints"],
        DropUniqueConstraint => &[
            "catalogName",
            "schemaName",
            "tableName",
            "constraintName",
            "uniqueColumns",
        ],
        DropView => &["catalogName", "schemaName", "viewName", "ifExists"],
        Empty => &[],
        ExecuteCommand => &["executable", "os", "timeout"],
        LoadData => &[
            "catalogName",
            "schemaName",
            "tableName",
            "file",
            "relativeToChangelogFile",
            "encoding",
            "separator",
            "quotchar",
            "commentLineStartsWith",
            "usePreparedStatements",
        ],
        LoadUpdateData => &[
            "catalogName",
            "schemaName",
            "tableName",
            "file",
            "relativeToChangelogFile",
            "encoding",
            "separator",
            "quotchar",
            "commentLineStartsWith",
            "usePreparedStatements",
            "primaryKey",
            "onlyUpdate",
        ],
        MergeColumns => &[
            "catalogName",
            "schemaName",
            "tableName",
            "column1Name",
            "joinString",
            "column2Name",
            "finalColumnName",
            "finalColumnType",
        ],
        ModifyDataType => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnName",
            "newDataType",
        ],
        Output => &["target", "message"],
        RenameColumn => &[
            "catalogName",
            "schemaName",
            "tableName",
            "oldColumnName",
            "newColumnName",
            "columnDataType",
            "remarks",
        ],
        RenameSequence => &["catalogName", "schemaName", "oldSequenceName", "newSequenceName"],
        RenameTable => &["catalogName", "schemaName", "oldTableName", "newTableName"],
        RenameView => &["catalogName", "schemaName", "oldViewName", "newViewName"],
        SetColumnRemarks => &[
            "catalogName",
            "schemaName",
            "tableName",
            "columnName",
            "remarks",
            "columnDataType",
        ],
        SetTableRemarks => &["catalogName", "schemaName", "tableName", "remarks"],
        Sql => &["dbms", "splitStatements", "stripComments", "endDelimiter"],
        SqlFile => &[
            "dbms",
            "path",
            "relativeToChangelogFile",
            "encoding",
            "splitStatements",
            "stripComments",
            "endDelimiter",
        ],
        Stop => &["message"],
        TagDatabase => &["tag"],
    }
}

/// Kinds whose first positional value is body text (SQL, procedure body,
/// view query, message).
fn takes_text(kind: ChangeKind) -> bool {
    matches!(
        kind,
        ChangeKind::Sql
            | ChangeKind::CreateProcedure
            | ChangeKind::CreateView
            | ChangeKind::Stop
            | ChangeKind::Output
    )
}

fn takes_columns(kind: ChangeKind) -> bool {
    use ChangeKind::*;
    matches!(
        kind,
        CreateTable
            | AddColumn
            | CreateIndex
            | DropColumn
            | Insert
            | Update
            | LoadData
            | LoadUpdateData
    )
}

pub(crate) struct ChangeBuilder<'a> {
    expander: Expander<'a>,
    context: &'a str,
}

impl<'a> ChangeBuilder<'a> {
    pub(crate) fn new(expander: Expander<'a>, context: &'a str) -> Self {
        Self { expander, context }
    }

    pub(crate) fn build(&self, kind: ChangeKind, node: &Node) -> Result<Change, ChangeLogParseError> {
        validate_attributes(kind.name(), &node.attributes, change_attributes(kind), self.context)?;

        let mut change = Change::new(kind);
        change.attributes = self.expander.attributes(&node.attributes);
        match node.args.as_slice() {
            [] => {}
            [Value::String(text)] if takes_text(kind) => {
                change.text = Some(self.expander.expand(text));
            }
            _ if takes_text(kind) => return Err(text_required(node, self.context)),
            _ => reject_positional(node, self.context)?,
        }

        for child in &node.children {
            self.nested(&mut change, child)?;
        }
        Ok(change)
    }

    fn nested(&self, change: &mut Change, node: &Node) -> Result<(), ChangeLogParseError> {
        let kind = change.kind;
        match node.name.as_str() {
            "column" if takes_columns(kind) => change.columns.push(self.column(kind, node)?),
            "where" if matches!(kind, ChangeKind::Update | ChangeKind::Delete) => {
                change.where_clause = Some(self.body_text(node)?);
            }
            "comment" if kind == ChangeKind::Sql => change.comment = Some(self.body_text(node)?),
            "param" if kind == ChangeKind::CustomChange => {
                change.params.push(build_param(self.expander, node, self.context)?);
            }
            "arg" if kind == ChangeKind::ExecuteCommand => {
                validate_attributes("arg", &node.attributes, &["value"], self.context)?;
                reject_positional(node, self.context)?;
                let attributes = self.expander.attributes(&node.attributes);
                change
                    .args
                    .push(required_text(&attributes, "arg", "value", self.context)?);
            }
            other => {
                return Err(ChangeLogParseError::InvalidElement {
                    element: other.to_string(),
                    parent: kind.name().to_string(),
                    context: self.context.to_string(),
                });
            }
        }
        Ok(())
    }

    fn column(&self, kind: ChangeKind, node: &Node) -> Result<ColumnConfig, ChangeLogParseError> {
        let allowed = match kind {
            ChangeKind::LoadData | ChangeKind::LoadUpdateData => LOAD_DATA_COLUMN_ATTRIBUTES,
            _ => COLUMN_ATTRIBUTES,
        };
        validate_attributes("column", &node.attributes, allowed, self.context)?;
        reject_positional(node, self.context)?;

        let mut column = ColumnConfig {
            attributes: self.expander.attributes(&node.attributes),
            constraints: None,
        };
        for child in &node.children {
            if child.name != "constraints" {
                return Err(ChangeLogParseError::InvalidElement {
                    element: child.name.clone(),
                    parent: "column".to_string(),
                    context: self.context.to_string(),
                });
            }
            validate_attributes("constraints", &child.attributes, CONSTRAINT_ATTRIBUTES, self.context)?;
            reject_positional(child, self.context)?;
            // Repeated constraints blocks accumulate into one config.
            column
                .constraints
                .get_or_insert_with(ConstraintsConfig::default)
                .attributes
                .extend(self.expander.attributes(&child.attributes));
        }
        Ok(column)
    }

    fn body_text(&self, node: &Node) -> Result<String, ChangeLogParseError> {
        body_text(self.expander, node, self.context)
    }
}

/// The single positional string of a text-only element such as `where`
/// or `comment`.
pub(crate) fn body_text(
    expander: Expander<'_>,
    node: &Node,
    context: &str,
) -> Result<String, ChangeLogParseError> {
    validate_attributes(&node.name, &node.attributes, &[], context)?;
    match (node.args.as_slice(), node.children.is_empty()) {
        ([value], true) => match as_text(value) {
            Some(text) => Ok(expander.expand(&text)),
            None => Err(text_required(node, context)),
        },
        _ => Err(text_required(node, context)),
    }
}

fn text_required(node: &Node, context: &str) -> ChangeLogParseError {
    ChangeLogParseError::InvalidValue {
        context: context.to_string(),
        message: format!("'{}' takes exactly one text value", node.name),
    }
}

/// `param(name: ..., value: ...)` of customChange and customPrecondition.
/// The value may also be given positionally.
pub(crate) fn build_param(
    expander: Expander<'_>,
    node: &Node,
    context: &str,
) -> Result<ChangeParameter, ChangeLogParseError> {
    validate_attributes("param", &node.attributes, PARAM_ATTRIBUTES, context)?;
    let attributes = expander.attributes(&node.attributes);
    let name = required_text(&attributes, "param", "name", context)?;
    let value = match (attributes.get("value").and_then(as_text), node.args.as_slice()) {
        (Some(value), []) => Some(value),
        (None, [positional]) => as_text(positional).map(|v| expander.expand(&v)),
        (None, []) => None,
        _ => return Err(text_required(node, context)),
    };
    Ok(ChangeParameter { name, value })
}
