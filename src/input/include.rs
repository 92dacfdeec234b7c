//! `include` and `includeAll`.
//!
//! Included files are parsed as documents of their own (sharing the parse
//! session, so properties flow across files) and their change sets are
//! spliced into the including document at the point of inclusion.

use crate::coerce::{as_text, parse_truth};
use crate::input::changelog::DocumentBuilder;
use crate::input::filter::IncludeAllFilter;
use crate::input::validate::{reject_positional, reject_renamed, required_text, validate_attributes};
use crate::input::{ChangeLogParseError, ResourceAccessor};
use crate::model::ChangeLogDocument;
use crate::parser::Node;
use std::path::Path;
use tracing::{debug, warn};

const INCLUDE_ATTRIBUTES: &[&str] = &["file", "relativeToChangelogFile", "errorIfMissing"];

const INCLUDE_ALL_ATTRIBUTES: &[&str] = &[
    "path",
    "relativeToChangelogFile",
    "errorIfMissingOrEmpty",
    "resourceFilter",
];

/// Resolve `path` against the directory of `changelog_path`.
///
/// Pure string manipulation: everything up to the last `/` or `\` of the
/// including document's physical path is kept and `path` appended. A
/// changelog path without a separator leaves `path` unchanged.
pub fn resolve_relative(changelog_path: &str, path: &str) -> String {
    match changelog_path.rfind(['/', '\\']) {
        Some(idx) => format!("{}/{}", &changelog_path[..idx], path),
        None => path.to_string(),
    }
}

/// Lexically normalized form of a resource path, used to recognise the
/// same file reached through different spellings (`db/./a`, `db/x/../a`).
pub(crate) fn normalize_key(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." if parts.last().is_some_and(|last| *last != "..") => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute { format!("/{}", joined) } else { joined }
}

fn has_extension(path: &str, extension: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

impl<R: ResourceAccessor> DocumentBuilder<'_, R> {
    pub(super) fn include(&mut self, node: &Node) -> Result<(), ChangeLogParseError> {
        let context = self.context();
        reject_renamed("include", &node.attributes, "path", "includeAll", &context)?;
        validate_attributes("include", &node.attributes, INCLUDE_ATTRIBUTES, &context)?;
        reject_positional(node, &context)?;
        let attributes = self.expander().attributes(&node.attributes);

        let file = required_text(&attributes, "include", "file", &context)?;
        let path = if parse_truth(attributes.get("relativeToChangelogFile"), false) {
            resolve_relative(&self.document.physical_file_path, &file)
        } else {
            file
        };

        if !parse_truth(attributes.get("errorIfMissing"), true)
            && !self.parser.accessor().exists(&path)
        {
            warn!(
                changelog = %self.document.physical_file_path,
                path = %path,
                "included changelog does not exist; skipping"
            );
            return Ok(());
        }
        self.include_file(&path)
    }

    pub(super) fn include_all(&mut self, node: &Node) -> Result<(), ChangeLogParseError> {
        let context = self.context();
        validate_attributes("includeAll", &node.attributes, INCLUDE_ALL_ATTRIBUTES, &context)?;
        reject_positional(node, &context)?;
        let attributes = self.expander().attributes(&node.attributes);

        let dir = required_text(&attributes, "includeAll", "path", &context)?;
        let dir = if parse_truth(attributes.get("relativeToChangelogFile"), false) {
            resolve_relative(&self.document.physical_file_path, &dir)
        } else {
            dir
        };
        let error_if_missing_or_empty = parse_truth(attributes.get("errorIfMissingOrEmpty"), true);

        let filter = match attributes.get("resourceFilter").and_then(as_text) {
            Some(name) => match self.parser.filters().create(&name) {
                Some(filter) => Some(filter),
                None => return Err(ChangeLogParseError::UnknownResourceFilter { name, context }),
            },
            None => None,
        };

        let listed = match self.parser.accessor().list_files(&dir) {
            Ok(listed) => listed,
            Err(e) if error_if_missing_or_empty => {
                debug!(path = %dir, error = %e, "includeAll directory unreadable");
                return Err(ChangeLogParseError::MissingOrEmptyIncludePath {
                    path: dir,
                    missing: true,
                });
            }
            Err(e) => {
                debug!(path = %dir, error = %e, "includeAll directory unreadable; skipping");
                return Ok(());
            }
        };

        let filter: Option<&dyn IncludeAllFilter> = filter.as_deref();
        let extension = &self.parser.options().extension;
        let mut files: Vec<String> = listed
            .into_iter()
            .filter(|path| has_extension(path, extension))
            .filter(|path| filter.is_none_or(|f| f.include(path)))
            .collect();
        files.sort();

        if files.is_empty() {
            if error_if_missing_or_empty {
                return Err(ChangeLogParseError::MissingOrEmptyIncludePath {
                    path: dir,
                    missing: false,
                });
            }
            debug!(path = %dir, "includeAll found no changelogs");
            return Ok(());
        }

        for file in &files {
            self.include_file(file)?;
        }
        Ok(())
    }

    fn include_file(&mut self, path: &str) -> Result<(), ChangeLogParseError> {
        debug!(
            changelog = %self.document.physical_file_path,
            path,
            "including changelog"
        );
        let included = self.parser.parse_file(path, self.session)?;
        self.splice(included);
        Ok(())
    }

    /// Change sets are appended in order; preconditions of the included
    /// document join the including document's container.
    fn splice(&mut self, included: ChangeLogDocument) {
        self.document.change_sets.extend(included.change_sets);
        if let Some(preconditions) = included.preconditions {
            self.document
                .preconditions
                .get_or_insert_with(Default::default)
                .nested
                .extend(preconditions.nested);
        }
    }
}
