//! Runnable examples embedded in a content unit.

use serde_json::Value;

use crate::document::is_empty_document;
use crate::slug::slugify;

/// Section bucket used when an example does not name one.
pub const DEFAULT_SECTION: &str = "general";

/// A normalized example.
///
/// Every optional field of the source format has already been defaulted by
/// the loader; downstream code never re-derives defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub name: String,
    pub description: String,
    /// The transformation script as a structured document.
    pub script: Value,
    /// Original script text when the source wrote it as a string.
    pub script_source: Option<String>,
    /// Input document; empty when the example takes none.
    pub input: Value,
    /// Expected output. `None` makes the example unverifiable.
    pub expected: Option<Value>,
    pub cli_flags: Vec<String>,
    pub section: String,
    pub tutorial_text: Option<String>,
    pub notes: Option<String>,
}

impl Example {
    /// Whether the interpreter gets an input file.
    pub fn has_input(&self) -> bool {
        !is_empty_document(&self.input)
    }

    /// Whether the example can be judged pass/fail.
    pub fn is_verifiable(&self) -> bool {
        self.expected.is_some()
    }

    /// Directory name of the example's leaf directory.
    pub fn directory_name(&self) -> String {
        slugify(&self.name)
    }

    /// Directory name of the example's section group.
    pub fn section_directory_name(&self) -> String {
        slugify(&self.section)
    }
}
