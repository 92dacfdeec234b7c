//! Human-readable text output reporter
//!
//! An outline of the parsed changelog, one change set per block:
//! ```text
//! changeSet rename-orders by alice (db/main.changelog)
//!   renameTable oldTableName=orders newTableName=purchases
//!   rollback sql: alter table purchases rename to orders
//! ```

use crate::model::{Change, ChangeLogDocument, ChangeSet};
use crate::output::{ReportError, Reporter, TextReporter, write_report};
use std::fmt::Write as FmtWrite;
use std::path::Path;

/// `kind key=value ...`, plus body text and nested element counts.
fn format_change(change: &Change) -> String {
    let mut line = change.kind.name().to_string();
    for (key, value) in change.attributes.iter() {
        let _ = write!(line, " {}={}", key, value);
    }
    if !change.columns.is_empty() {
        let _ = write!(line, " [{} column(s)]", change.columns.len());
    }
    if let Some(text) = &change.text {
        let _ = write!(line, ": {}", text.split_whitespace().collect::<Vec<_>>().join(" "));
    }
    line
}

fn format_flags(change_set: &ChangeSet) -> Vec<String> {
    let mut flags = Vec::new();
    if change_set.run_always {
        flags.push("runAlways".to_string());
    }
    if change_set.run_on_change {
        flags.push("runOnChange".to_string());
    }
    if !change_set.run_in_transaction {
        flags.push("runInTransaction=false".to_string());
    }
    if let Some(context) = &change_set.context {
        flags.push(format!("context={}", context));
    }
    if !change_set.labels.is_empty() {
        flags.push(format!("labels={}", change_set.labels.join(",")));
    }
    if !change_set.dbms.is_empty() {
        flags.push(format!("dbms={}", change_set.dbms.join(",")));
    }
    flags
}

fn format_change_set(change_set: &ChangeSet) -> String {
    let mut buf = String::new();
    let _ = write!(
        buf,
        "changeSet {} by {} ({})",
        change_set.id, change_set.author, change_set.file_path
    );
    let flags = format_flags(change_set);
    if !flags.is_empty() {
        let _ = write!(buf, " [{}]", flags.join(" "));
    }
    buf.push('\n');

    if let Some(comments) = &change_set.comments {
        let _ = writeln!(buf, "  -- {}", comments);
    }
    if let Some(preconditions) = &change_set.preconditions {
        let _ = writeln!(buf, "  preConditions: {} check(s)", preconditions.nested.len());
    }
    for change in &change_set.changes {
        let _ = writeln!(buf, "  {}", format_change(change));
    }
    for change in &change_set.rollback {
        let _ = writeln!(buf, "  rollback {}", format_change(change));
    }
    buf
}

/// Format the whole document. Change sets are separated by a blank line.
fn format_document(document: &ChangeLogDocument) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "databaseChangeLog {}", document.physical_file_path);
    if document.logical_file_path != document.physical_file_path {
        let _ = writeln!(output, "  logicalFilePath {}", document.logical_file_path);
    }
    if let Some(preconditions) = &document.preconditions {
        let _ = writeln!(output, "  preConditions: {} check(s)", preconditions.nested.len());
    }
    if !document.properties.is_empty() {
        let _ = writeln!(output, "  properties: {}", document.properties.len());
    }
    for change_set in &document.change_sets {
        output.push('\n');
        output.push_str(&format_change_set(change_set));
    }
    output
}

impl Reporter for TextReporter {
    /// Emit the outline to stdout, or as `changelog.txt` in `output_dir`.
    fn emit(&self, document: &ChangeLogDocument, output_dir: &Path) -> Result<(), ReportError> {
        write_report(
            &format_document(document),
            self.use_stdout,
            output_dir,
            "changelog.txt",
        )
    }
}
