//! Changelog loading
//!
//! Turns DSL documents into a [`ChangeLogDocument`]. The root node is walked
//! depth-first: each element is validated against the allow-list for its
//! kind, its string attributes get `${token}` expansion, and the populated
//! model fragment is appended to the growing tree. `include`/`includeAll`
//! recursively parse other files and splice their change sets in place.

pub mod change_set;
pub mod changelog;
pub mod changes;
pub mod filter;
pub mod include;
pub mod precondition;
pub mod properties;
pub mod resource;
pub mod validate;

use crate::model::ChangeLogDocument;
use crate::parser::{Node, parse_document};
use changelog::DocumentBuilder;
use std::path::PathBuf;
use thiserror::Error;

pub use filter::{FilterRegistry, IncludeAllFilter, PatternFilter};
pub use include::resolve_relative;
pub use properties::{PropertyTable, RuntimeScope};
pub use resource::{FileSystemAccessor, ResourceAccessor};

/// File extension of DSL changelogs; `includeAll` only picks up these files.
pub const CHANGELOG_EXTENSION: &str = "changelog";

/// Name of the single root element of every changelog.
pub const ROOT_ELEMENT: &str = "databaseChangeLog";

#[derive(Debug, Error)]
pub enum ChangeLogParseError {
    #[error("{context}: '{key}' is not a valid attribute of '{element}'")]
    UnknownAttribute {
        element: String,
        key: String,
        context: String,
    },

    #[error("{context}: '{old}' is no longer supported on '{element}'; use '{replacement}' instead")]
    RenamedAttribute {
        element: String,
        old: String,
        replacement: String,
        context: String,
    },

    #[error("{context}: '{value}' is not a valid value for '{attribute}' (expected one of: {valid})")]
    InvalidEnumValue {
        attribute: String,
        value: String,
        valid: String,
        context: String,
    },

    #[error("{context}: '{element}' is not a valid element of '{parent}'")]
    InvalidElement {
        element: String,
        parent: String,
        context: String,
    },

    #[error("{context}: '{element}' requires the '{attribute}' attribute")]
    MissingAttribute {
        element: String,
        attribute: String,
        context: String,
    },

    #[error("{context}: {message}")]
    InvalidValue { context: String, message: String },

    #[error("includeAll path '{path}' {}", missing_or_empty(.missing))]
    MissingOrEmptyIncludePath { path: String, missing: bool },

    #[error("property file '{path}' could not be opened: {source}")]
    PropertyFileNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {message}")]
    MalformedRootElement { path: String, message: String },

    #[error("syntax error in {path} at line {line}: {message}")]
    Syntax {
        path: String,
        line: usize,
        message: String,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: unknown resource filter '{name}'")]
    UnknownResourceFilter { name: String, context: String },

    #[error(
        "{context}: rollback refers to change set '{id}' (author '{author}') in '{path}', which is not defined before it"
    )]
    RollbackChangeSetNotFound {
        id: String,
        author: String,
        path: String,
        context: String,
    },

    #[error("circular include of '{path}' (include chain: {chain})")]
    CircularInclude { path: String, chain: String },
}

fn missing_or_empty(missing: &bool) -> &'static str {
    if *missing {
        "does not exist"
    } else {
        "contains no changelog files"
    }
}

/// Knobs that shape a parse without being part of any document.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Runtime contexts/labels/database used to select scoped properties.
    pub scope: RuntimeScope,
    /// Extension `includeAll` matches, without the dot.
    pub extension: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            scope: RuntimeScope::default(),
            extension: CHANGELOG_EXTENSION.to_string(),
        }
    }
}

/// State shared by a root document and everything it includes.
#[derive(Debug, Default)]
pub(crate) struct ParseSession {
    pub(crate) properties: PropertyTable,
    /// Physical paths of the documents currently being parsed, outermost first.
    include_stack: Vec<String>,
}

impl ParseSession {
    fn enter(&mut self, path: &str) -> Result<(), ChangeLogParseError> {
        let key = include::normalize_key(path);
        if self
            .include_stack
            .iter()
            .any(|p| include::normalize_key(p) == key)
        {
            let mut chain = self.include_stack.clone();
            chain.push(path.to_string());
            return Err(ChangeLogParseError::CircularInclude {
                path: path.to_string(),
                chain: chain.join(" -> "),
            });
        }
        self.include_stack.push(path.to_string());
        Ok(())
    }

    fn leave(&mut self) {
        self.include_stack.pop();
    }
}

/// Entry point: parses a changelog (and whatever it includes) into a
/// [`ChangeLogDocument`].
///
/// Each call to [`parse`](Self::parse) is independent; the property table
/// lives only for that call and is shared with included documents.
pub struct ChangeLogParser<R: ResourceAccessor = FileSystemAccessor> {
    accessor: R,
    filters: FilterRegistry,
    options: ParserOptions,
}

impl ChangeLogParser<FileSystemAccessor> {
    /// Parser reading changelogs relative to `base_dir`.
    pub fn from_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(FileSystemAccessor::new(base_dir))
    }
}

impl<R: ResourceAccessor> ChangeLogParser<R> {
    pub fn new(accessor: R) -> Self {
        Self {
            accessor,
            filters: FilterRegistry::new(),
            options: ParserOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn accessor(&self) -> &R {
        &self.accessor
    }

    /// Parse the changelog at `path` (resolved by the resource accessor).
    pub fn parse(&self, path: &str) -> Result<ChangeLogDocument, ChangeLogParseError> {
        let mut session = ParseSession::default();
        let mut document = self.parse_file(path, &mut session)?;
        document.properties = session.properties.into_bindings();
        Ok(document)
    }

    /// Parse DSL text that was not read through the accessor. Includes are
    /// still resolved through it.
    pub fn parse_source(
        &self,
        source: &str,
        physical_path: &str,
    ) -> Result<ChangeLogDocument, ChangeLogParseError> {
        let mut session = ParseSession::default();
        session.enter(physical_path)?;
        let mut document = self.parse_text(source, physical_path, &mut session)?;
        document.properties = session.properties.into_bindings();
        Ok(document)
    }

    /// Build a document from a node tree constructed in code.
    pub fn parse_node(
        &self,
        root: &Node,
        physical_path: &str,
    ) -> Result<ChangeLogDocument, ChangeLogParseError> {
        let mut session = ParseSession::default();
        session.enter(physical_path)?;
        check_root(std::slice::from_ref(root), physical_path)?;
        let mut document = DocumentBuilder::new(self, &mut session, physical_path).build(root)?;
        document.properties = session.properties.into_bindings();
        Ok(document)
    }

    /// Read and parse one file within an existing session.
    pub(crate) fn parse_file(
        &self,
        path: &str,
        session: &mut ParseSession,
    ) -> Result<ChangeLogDocument, ChangeLogParseError> {
        session.enter(path)?;
        let result = self
            .accessor
            .read_to_string(path)
            .map_err(|e| ChangeLogParseError::Io {
                path: path.to_string(),
                source: e,
            })
            .and_then(|source| self.parse_text(&source, path, session));
        session.leave();
        result
    }

    fn parse_text(
        &self,
        source: &str,
        physical_path: &str,
        session: &mut ParseSession,
    ) -> Result<ChangeLogDocument, ChangeLogParseError> {
        let nodes = parse_document(source).map_err(|e| ChangeLogParseError::Syntax {
            path: physical_path.to_string(),
            line: e.line,
            message: e.message,
        })?;
        let root = check_root(&nodes, physical_path)?;
        DocumentBuilder::new(self, session, physical_path).build(root)
    }
}

/// The document must consist of exactly one `databaseChangeLog` element
/// with named attributes only.
fn check_root<'n>(nodes: &'n [Node], path: &str) -> Result<&'n Node, ChangeLogParseError> {
    let malformed = |message: String| ChangeLogParseError::MalformedRootElement {
        path: path.to_string(),
        message,
    };

    let root = match nodes {
        [root] => root,
        _ => {
            return Err(malformed(format!(
                "expected a single '{}' element, found {} top-level elements",
                ROOT_ELEMENT,
                nodes.len()
            )));
        }
    };
    if root.name != ROOT_ELEMENT {
        return Err(malformed(format!(
            "root element must be '{}', found '{}'",
            ROOT_ELEMENT, root.name
        )));
    }
    if !root.args.is_empty() {
        return Err(malformed(format!(
            "'{}' takes named attributes only",
            ROOT_ELEMENT
        )));
    }
    Ok(root)
}
