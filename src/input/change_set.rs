//! `changeSet` elements: attributes, body elements, rollback, modifySql.

use crate::coerce::{as_list, as_text, parse_truth};
use crate::input::ChangeLogParseError;
use crate::input::changes::{ChangeBuilder, body_text};
use crate::input::precondition::PreconditionBuilder;
use crate::input::properties::Expander;
use crate::input::validate::{
    optional_enum, reject_positional, reject_renamed, required_text, validate_attributes,
};
use crate::model::{Change, ChangeKind, ChangeLogDocument, ChangeSet, SqlVisitor, SqlVisitorKind};
use crate::parser::{Attributes, Node, Value};
use regex::Regex;
use std::str::FromStr;

pub const CHANGE_SET_ATTRIBUTES: &[&str] = &[
    "id",
    "author",
    "dbms",
    "runAlways",
    "runOnChange",
    "context",
    "labels",
    "runInTransaction",
    "failOnError",
    "onValidationFail",
    "objectQuotingStrategy",
];

const ROLLBACK_ATTRIBUTES: &[&str] = &["changeSetId", "changeSetAuthor", "changeSetPath"];

const MODIFY_SQL_ATTRIBUTES: &[&str] = &["dbms", "context", "labels", "applyToRollback"];

pub(crate) struct ChangeSetBuilder<'a> {
    expander: Expander<'a>,
    /// The document being built; earlier change sets are visible to
    /// rollback references.
    document: &'a ChangeLogDocument,
}

impl<'a> ChangeSetBuilder<'a> {
    pub(crate) fn new(expander: Expander<'a>, document: &'a ChangeLogDocument) -> Self {
        Self { expander, document }
    }

    pub(crate) fn build(&self, node: &Node) -> Result<ChangeSet, ChangeLogParseError> {
        let raw_id = node.attributes.get("id").map(Value::to_string).unwrap_or_default();
        let context = format!("{}: changeSet '{}'", self.document.physical_file_path, raw_id);

        reject_renamed("changeSet", &node.attributes, "alwaysRun", "runAlways", &context)?;
        validate_attributes("changeSet", &node.attributes, CHANGE_SET_ATTRIBUTES, &context)?;
        reject_positional(node, &context)?;

        let attributes = self.expander.attributes(&node.attributes);
        let text = |key: &str| attributes.get(key).and_then(as_text);

        let mut change_set = ChangeSet::new(
            text("id").unwrap_or_default(),
            text("author").unwrap_or_default(),
            self.document.logical_file_path.clone(),
        );
        change_set.run_always = parse_truth(attributes.get("runAlways"), false);
        change_set.run_on_change = parse_truth(attributes.get("runOnChange"), false);
        change_set.run_in_transaction = parse_truth(attributes.get("runInTransaction"), true);
        change_set.fail_on_error = attributes
            .get("failOnError")
            .filter(|v| !v.is_null())
            .map(|v| parse_truth(Some(v), true));
        change_set.context = text("context");
        change_set.labels = attributes.get("labels").map(as_list).unwrap_or_default();
        change_set.dbms = attributes.get("dbms").map(as_list).unwrap_or_default();
        if let Some(option) = optional_enum(&attributes, "onValidationFail", &context)? {
            change_set.on_validation_fail = option;
        }
        change_set.object_quoting_strategy =
            optional_enum(&attributes, "objectQuotingStrategy", &context)?
                .or(self.document.object_quoting_strategy);

        self.body(&mut change_set, &node.children, &context, false)?;
        Ok(change_set)
    }

    /// Apply body elements in order. Inside a rollback block only change
    /// elements are allowed.
    fn body(
        &self,
        change_set: &mut ChangeSet,
        children: &[Node],
        context: &str,
        in_rollback: bool,
    ) -> Result<(), ChangeLogParseError> {
        for child in children {
            match child.name.as_str() {
                "comment" if !in_rollback => {
                    change_set.comments = Some(body_text(self.expander, child, context)?);
                }
                "validCheckSum" if !in_rollback => {
                    change_set
                        .valid_checksums
                        .push(body_text(self.expander, child, context)?);
                }
                "preConditions" if !in_rollback => {
                    change_set.preconditions =
                        Some(PreconditionBuilder::new(self.expander, context).container(child)?);
                }
                "rollback" if !in_rollback => self.rollback(change_set, child, context)?,
                "modifySql" if !in_rollback => {
                    change_set.sql_visitors.extend(self.modify_sql(child, context)?);
                }
                name => {
                    let kind = ChangeKind::from_str(name).map_err(|_| {
                        ChangeLogParseError::InvalidElement {
                            element: name.to_string(),
                            parent: if in_rollback { "rollback" } else { "changeSet" }.to_string(),
                            context: context.to_string(),
                        }
                    })?;
                    change_set
                        .changes
                        .push(ChangeBuilder::new(self.expander, context).build(kind, child)?);
                }
            }
        }
        Ok(())
    }

    /// `rollback` accepts any combination of: raw SQL text, a reference to an
    /// earlier change set whose changes are reused, and a block of changes.
    fn rollback(
        &self,
        change_set: &mut ChangeSet,
        node: &Node,
        context: &str,
    ) -> Result<(), ChangeLogParseError> {
        validate_attributes("rollback", &node.attributes, ROLLBACK_ATTRIBUTES, context)?;
        let attributes = self.expander.attributes(&node.attributes);

        match node.args.as_slice() {
            [] => {}
            [Value::String(sql)] => change_set.rollback.push(Change::raw_sql(self.expander.expand(sql))),
            _ => {
                return Err(ChangeLogParseError::InvalidValue {
                    context: context.to_string(),
                    message: "'rollback' takes a single SQL string".to_string(),
                });
            }
        }

        if let Some(id) = attributes.get("changeSetId").and_then(as_text) {
            change_set.rollback.extend(self.referenced_changes(&attributes, id, context)?);
        }

        if !node.children.is_empty() {
            // Built like a change set but never added to the changelog.
            let mut scaffold = ChangeSet::new(
                change_set.id.clone(),
                change_set.author.clone(),
                change_set.file_path.clone(),
            );
            self.body(&mut scaffold, &node.children, context, true)?;
            change_set.rollback.extend(scaffold.changes);
        }
        Ok(())
    }

    fn referenced_changes(
        &self,
        attributes: &Attributes,
        id: String,
        context: &str,
    ) -> Result<Vec<Change>, ChangeLogParseError> {
        let author = attributes.get("changeSetAuthor").and_then(as_text);
        let path = attributes
            .get("changeSetPath")
            .and_then(as_text)
            .unwrap_or_else(|| self.document.logical_file_path.clone());

        match self.document.find_change_set(&id, author.as_deref(), &path) {
            Some(referenced) => Ok(referenced.changes.clone()),
            None => Err(ChangeLogParseError::RollbackChangeSetNotFound {
                id,
                author: author.unwrap_or_default(),
                path,
                context: context.to_string(),
            }),
        }
    }

    fn modify_sql(&self, node: &Node, context: &str) -> Result<Vec<SqlVisitor>, ChangeLogParseError> {
        validate_attributes("modifySql", &node.attributes, MODIFY_SQL_ATTRIBUTES, context)?;
        reject_positional(node, context)?;
        let attributes = self.expander.attributes(&node.attributes);
        let dbms = attributes.get("dbms").map(as_list).unwrap_or_default();
        let labels = attributes.get("labels").map(as_list).unwrap_or_default();
        let scope_context = attributes.get("context").and_then(as_text);
        let apply_to_rollback = parse_truth(attributes.get("applyToRollback"), false);

        node.children
            .iter()
            .map(|child| {
                Ok(SqlVisitor {
                    kind: self.visitor_kind(child, context)?,
                    dbms: dbms.clone(),
                    context: scope_context.clone(),
                    labels: labels.clone(),
                    apply_to_rollback,
                })
            })
            .collect()
    }

    fn visitor_kind(&self, node: &Node, context: &str) -> Result<SqlVisitorKind, ChangeLogParseError> {
        let element = node.name.as_str();
        let allowed: &[&str] = match element {
            "prepend" | "append" => &["value"],
            "replace" | "regExpReplace" => &["replace", "with"],
            other => {
                return Err(ChangeLogParseError::InvalidElement {
                    element: other.to_string(),
                    parent: "modifySql".to_string(),
                    context: context.to_string(),
                });
            }
        };
        validate_attributes(element, &node.attributes, allowed, context)?;
        reject_positional(node, context)?;
        let attributes = self.expander.attributes(&node.attributes);

        let kind = match element {
            "prepend" => SqlVisitorKind::Prepend {
                value: required_text(&attributes, element, "value", context)?,
            },
            "append" => SqlVisitorKind::Append {
                value: required_text(&attributes, element, "value", context)?,
            },
            "replace" => SqlVisitorKind::Replace {
                replace: required_text(&attributes, element, "replace", context)?,
                with: attributes.get("with").and_then(as_text).unwrap_or_default(),
            },
            _ => {
                let replace = required_text(&attributes, element, "replace", context)?;
                if let Err(e) = Regex::new(&replace) {
                    return Err(ChangeLogParseError::InvalidValue {
                        context: context.to_string(),
                        message: format!("invalid regExpReplace pattern '{}': {}", replace, e),
                    });
                }
                SqlVisitorKind::RegExpReplace {
                    replace,
                    with: attributes.get("with").and_then(as_text).unwrap_or_default(),
                }
            }
        };
        Ok(kind)
    }
}
