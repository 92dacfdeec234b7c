//! `preConditions` blocks.

use crate::coerce::as_text;
use crate::input::ChangeLogParseError;
use crate::input::changes::build_param;
use crate::input::properties::Expander;
use crate::input::validate::{optional_enum, reject_positional, validate_attributes};
use crate::model::{Precondition, PreconditionCheck, PreconditionContainer, PreconditionKind};
use crate::parser::Node;
use std::str::FromStr;

const CONTAINER_ATTRIBUTES: &[&str] = &[
    "onFail",
    "onError",
    "onUpdateSQL",
    "onFailMessage",
    "onErrorMessage",
];

pub fn check_attributes(kind: PreconditionKind) -> &'static [&'static str] {
    use PreconditionKind::*;
    match kind {
        Dbms => &["type"],
        RunningAs => &["username"],
        ChangeSetExecuted => &["id", "author", "changeLogFile"],
        ColumnExists => &["catalogName", "schemaName", "tableName", "columnName"],
        TableExists | TableIsEmpty => &["catalogName", "schemaName", "tableName"],
        ViewExists => &["catalogName", "schemaName", "viewName"],
        ForeignKeyConstraintExists => &[
            "catalogName",
            "schemaName",
            "foreignKeyTableName",
            "foreignKeyName",
        ],
        IndexExists => &[
            "catalogName",
            "schemaName",
            "tableName",
            "indexName",
            "columnNames",
        ],
        SequenceExists => &["catalogName", "schemaName", "sequenceName"],
        PrimaryKeyExists => &["catalogName", "schemaName", "tableName", "primaryKeyName"],
        SqlCheck => &["expectedResult"],
        ChangeLogPropertyDefined => &["property", "value"],
        ExpectedQuotingStrategy => &["strategy"],
        RowCount => &["catalogName", "schemaName", "tableName", "expectedRows"],
        CustomPrecondition => &["className"],
    }
}

pub(crate) struct PreconditionBuilder<'a> {
    expander: Expander<'a>,
    context: &'a str,
}

impl<'a> PreconditionBuilder<'a> {
    pub(crate) fn new(expander: Expander<'a>, context: &'a str) -> Self {
        Self { expander, context }
    }

    pub(crate) fn container(&self, node: &Node) -> Result<PreconditionContainer, ChangeLogParseError> {
        validate_attributes("preConditions", &node.attributes, CONTAINER_ATTRIBUTES, self.context)?;
        reject_positional(node, self.context)?;
        let attributes = self.expander.attributes(&node.attributes);

        Ok(PreconditionContainer {
            on_fail: optional_enum(&attributes, "onFail", self.context)?,
            on_error: optional_enum(&attributes, "onError", self.context)?,
            on_update_sql: optional_enum(&attributes, "onUpdateSQL", self.context)?,
            on_fail_message: attributes.get("onFailMessage").and_then(as_text),
            on_error_message: attributes.get("onErrorMessage").and_then(as_text),
            nested: self.children(node)?,
        })
    }

    fn children(&self, parent: &Node) -> Result<Vec<Precondition>, ChangeLogParseError> {
        parent
            .children
            .iter()
            .map(|child| self.precondition(child, &parent.name))
            .collect()
    }

    fn precondition(&self, node: &Node, parent: &str) -> Result<Precondition, ChangeLogParseError> {
        if matches!(node.name.as_str(), "and" | "or" | "not") {
            validate_attributes(&node.name, &node.attributes, &[], self.context)?;
            reject_positional(node, self.context)?;
            let children = self.children(node)?;
            return Ok(match node.name.as_str() {
                "and" => Precondition::And(children),
                "or" => Precondition::Or(children),
                _ => Precondition::Not(children),
            });
        }

        let kind = PreconditionKind::from_str(&node.name).map_err(|_| {
            ChangeLogParseError::InvalidElement {
                element: node.name.clone(),
                parent: parent.to_string(),
                context: self.context.to_string(),
            }
        })?;
        self.check(kind, node).map(Precondition::Check)
    }

    fn check(&self, kind: PreconditionKind, node: &Node) -> Result<PreconditionCheck, ChangeLogParseError> {
        validate_attributes(kind.name(), &node.attributes, check_attributes(kind), self.context)?;

        let mut check = PreconditionCheck {
            kind,
            attributes: self.expander.attributes(&node.attributes),
            sql: None,
            params: Vec::new(),
        };
        if kind == PreconditionKind::SqlCheck {
            check.sql = match node.args.as_slice() {
                [sql] => as_text(sql).map(|s| self.expander.expand(&s)),
                _ => None,
            };
            if check.sql.is_none() {
                return Err(ChangeLogParseError::InvalidValue {
                    context: self.context.to_string(),
                    message: "'sqlCheck' requires the SQL to run as its value".to_string(),
                });
            }
        } else {
            reject_positional(node, self.context)?;
        }

        for child in &node.children {
            if kind == PreconditionKind::CustomPrecondition && child.name == "param" {
                check.params.push(build_param(self.expander, child, self.context)?);
            } else {
                return Err(ChangeLogParseError::InvalidElement {
                    element: child.name.clone(),
                    parent: kind.name().to_string(),
                    context: self.context.to_string(),
                });
            }
        }
        Ok(check)
    }
}
