//! Document-level walk of a `databaseChangeLog` root.

use crate::coerce::{as_text, parse_truth};
use crate::input::change_set::ChangeSetBuilder;
use crate::input::precondition::PreconditionBuilder;
use crate::input::properties::{Expander, parse_properties};
use crate::input::validate::{optional_enum, reject_positional, validate_attributes};
use crate::input::{
    ChangeLogParseError, ChangeLogParser, ParseSession, ROOT_ELEMENT, ResourceAccessor,
    resolve_relative,
};
use crate::model::{ChangeLogDocument, PropertyBinding};
use crate::parser::Node;

const ROOT_ATTRIBUTES: &[&str] = &["logicalFilePath", "objectQuotingStrategy"];

const PROPERTY_ATTRIBUTES: &[&str] = &[
    "name",
    "value",
    "file",
    "relativeToChangelogFile",
    "context",
    "labels",
    "dbms",
    "global",
];

/// Builds one document. Included documents get their own builder sharing
/// the same session.
pub(crate) struct DocumentBuilder<'p, R: ResourceAccessor> {
    pub(super) parser: &'p ChangeLogParser<R>,
    pub(super) session: &'p mut ParseSession,
    pub(super) document: ChangeLogDocument,
}

impl<'p, R: ResourceAccessor> DocumentBuilder<'p, R> {
    pub(crate) fn new(
        parser: &'p ChangeLogParser<R>,
        session: &'p mut ParseSession,
        physical_path: &str,
    ) -> Self {
        Self {
            parser,
            session,
            document: ChangeLogDocument::new(physical_path),
        }
    }

    pub(crate) fn build(mut self, root: &Node) -> Result<ChangeLogDocument, ChangeLogParseError> {
        self.root_attributes(root)?;
        for child in &root.children {
            self.element(child)?;
        }
        Ok(self.document)
    }

    pub(super) fn context(&self) -> String {
        self.document.physical_file_path.clone()
    }

    pub(super) fn expander(&self) -> Expander<'_> {
        Expander::new(
            &self.session.properties,
            &self.document.physical_file_path,
            &self.parser.options().scope,
        )
    }

    fn root_attributes(&mut self, root: &Node) -> Result<(), ChangeLogParseError> {
        let context = self.context();
        validate_attributes(ROOT_ELEMENT, &root.attributes, ROOT_ATTRIBUTES, &context)?;
        let attributes = self.expander().attributes(&root.attributes);

        if let Some(path) = attributes.get("logicalFilePath").and_then(as_text) {
            self.document.logical_file_path = path;
        }
        self.document.object_quoting_strategy =
            optional_enum(&attributes, "objectQuotingStrategy", &context)?;
        Ok(())
    }

    fn element(&mut self, node: &Node) -> Result<(), ChangeLogParseError> {
        match node.name.as_str() {
            "changeSet" => {
                let change_set = ChangeSetBuilder::new(self.expander(), &self.document).build(node)?;
                self.document.change_sets.push(change_set);
            }
            "preConditions" => {
                let context = self.context();
                let container = PreconditionBuilder::new(self.expander(), &context).container(node)?;
                self.document.preconditions = Some(container);
            }
            "property" => self.property(node)?,
            "include" => self.include(node)?,
            "includeAll" => self.include_all(node)?,
            other => {
                return Err(ChangeLogParseError::InvalidElement {
                    element: other.to_string(),
                    parent: ROOT_ELEMENT.to_string(),
                    context: self.context(),
                });
            }
        }
        Ok(())
    }

    /// `property(name:, value:)` defines one binding; `property(file:)`
    /// loads every entry of a properties file with the same scoping.
    fn property(&mut self, node: &Node) -> Result<(), ChangeLogParseError> {
        let context = self.context();
        validate_attributes("property", &node.attributes, PROPERTY_ATTRIBUTES, &context)?;
        reject_positional(node, &context)?;
        let attributes = self.expander().attributes(&node.attributes);

        let template = PropertyBinding {
            name: String::new(),
            value: String::new(),
            context: attributes.get("context").and_then(as_text),
            labels: attributes.get("labels").and_then(as_text),
            dbms: attributes.get("dbms").and_then(as_text),
            global: parse_truth(attributes.get("global"), true),
            source_document: self.document.physical_file_path.clone(),
        };

        if let Some(file) = attributes.get("file").and_then(as_text) {
            let path = if parse_truth(attributes.get("relativeToChangelogFile"), false) {
                resolve_relative(&self.document.physical_file_path, &file)
            } else {
                file
            };
            let text = self.parser.accessor().read_to_string(&path).map_err(|e| {
                ChangeLogParseError::PropertyFileNotFound {
                    path: path.clone(),
                    source: e,
                }
            })?;
            for (name, value) in parse_properties(&text) {
                self.session.properties.define(PropertyBinding {
                    name,
                    value,
                    ..template.clone()
                });
            }
            return Ok(());
        }

        let Some(name) = attributes.get("name").and_then(as_text) else {
            return Err(ChangeLogParseError::MissingAttribute {
                element: "property".to_string(),
                attribute: "name".to_string(),
                context,
            });
        };
        let value = attributes.get("value").and_then(as_text).unwrap_or_default();
        self.session.properties.define(PropertyBinding {
            name,
            value,
            ..template
        });
        Ok(())
    }
}
