//! Output reporters for different formats
//!
//! Renders a parsed [`ChangeLogDocument`] as an indented text outline or as
//! pretty-printed JSON of the full object model.

use crate::model::ChangeLogDocument;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error writing report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Trait for output format reporters.
pub trait Reporter {
    /// Write the document to stdout or to the given output directory.
    /// The filename is determined by the reporter (e.g., "changelog.json").
    fn emit(&self, document: &ChangeLogDocument, output_dir: &Path) -> Result<(), ReportError>;
}

pub struct TextReporter {
    pub use_stdout: bool,
}

impl TextReporter {
    pub fn new(use_stdout: bool) -> Self {
        Self { use_stdout }
    }
}

pub struct JsonReporter {
    pub use_stdout: bool,
}

impl JsonReporter {
    pub fn new(use_stdout: bool) -> Self {
        Self { use_stdout }
    }
}

/// Write `content` to stdout, or to `output_dir/file_name` (creating the
/// directory if needed).
fn write_report(
    content: &str,
    use_stdout: bool,
    output_dir: &Path,
    file_name: &str,
) -> Result<(), ReportError> {
    if use_stdout {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(content.as_bytes())?;
        handle.flush()?;
    } else {
        std::fs::create_dir_all(output_dir)?;
        std::fs::write(output_dir.join(file_name), content)?;
    }
    Ok(())
}

pub mod json;
pub mod text;

#[cfg(test)]
pub(crate) mod test_helpers;
