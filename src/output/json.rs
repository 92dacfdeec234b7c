//! JSON reporter: the whole object model, pretty-printed.

use crate::model::ChangeLogDocument;
use crate::output::{JsonReporter, ReportError, Reporter, write_report};
use std::path::Path;

impl Reporter for JsonReporter {
    /// Emit the document as `changelog.json` (or to stdout).
    fn emit(&self, document: &ChangeLogDocument, output_dir: &Path) -> Result<(), ReportError> {
        let mut json = serde_json::to_string_pretty(document)
            .map_err(|e| ReportError::Serialization(e.to_string()))?;
        json.push('\n');
        write_report(&json, self.use_stdout, output_dir, "changelog.json")
    }
}
