//! Discovery and loading of unit sources.
//!
//! Each chapter or appendix lives in its own TOML file:
//!
//! ```toml
//! [chapter]
//! number = 1
//! title = "Getting Started"
//!
//! [chapter.learning_objectives]
//! summary = "..."
//!
//! [[sections]]
//! title = "Why transform?"
//! content = "..."
//!
//! [[examples]]
//! name = "add_two"
//! description = "Add two numbers"
//! script = '{"op": "add", "args": [1, 2]}'
//! expected = 3
//! ```
//!
//! Loading normalizes every optional example field so later stages see a
//! fully populated [`Example`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BookError, Result};
use crate::example::{Example, DEFAULT_SECTION};
use crate::unit::{ContentUnit, Section, UnitId};
use crate::document::normalize_script;

const CHAPTER_PREFIX: &str = "ch";
const APPENDIX_PREFIX: &str = "appendix";
const SOURCE_EXTENSION: &str = ".toml";

/// Find unit sources in `dir`: chapters (`ch*.toml`) sorted by file name,
/// followed by appendices (`appendix*.toml`) sorted by file name.
///
/// An empty result is a [`BookError::NoUnitsFound`].
pub fn discover_units(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| BookError::SourceDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut chapters = Vec::new();
    let mut appendices = Vec::new();

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !file_name.ends_with(SOURCE_EXTENSION) {
            continue;
        }
        if file_name.starts_with(APPENDIX_PREFIX) {
            appendices.push((file_name, entry.path()));
        } else if file_name.starts_with(CHAPTER_PREFIX) {
            chapters.push((file_name, entry.path()));
        }
    }

    if chapters.is_empty() && appendices.is_empty() {
        return Err(BookError::NoUnitsFound {
            dir: dir.to_path_buf(),
        });
    }

    chapters.sort();
    appendices.sort();
    debug!(
        chapters = chapters.len(),
        appendices = appendices.len(),
        "Discovered unit sources"
    );

    Ok(chapters
        .into_iter()
        .chain(appendices)
        .map(|(_, path)| path)
        .collect())
}

/// Read and normalize one unit file.
pub fn load_unit(path: &Path) -> Result<ContentUnit> {
    let text = std::fs::read_to_string(path).map_err(|source| BookError::ReadUnit {
        path: path.to_path_buf(),
        source,
    })?;
    parse_unit(&text, path)
}

/// Parse unit TOML; `path` is recorded as the unit's source and used in errors.
pub fn parse_unit(text: &str, path: &Path) -> Result<ContentUnit> {
    let raw: RawUnitFile = toml::from_str(text).map_err(|source| BookError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    let (id, header) = match (raw.chapter, raw.appendix) {
        (Some(chapter), None) => {
            let number = chapter.number.ok_or_else(|| BookError::InvalidUnit {
                path: path.to_path_buf(),
                reason: "[chapter] has no number".to_string(),
            })?;
            (UnitId::chapter(number), chapter)
        }
        (None, Some(appendix)) => {
            let letter = appendix
                .letter
                .clone()
                .filter(|l| !l.trim().is_empty())
                .ok_or_else(|| BookError::InvalidUnit {
                    path: path.to_path_buf(),
                    reason: "[appendix] has no letter".to_string(),
                })?;
            (UnitId::appendix(&letter), appendix)
        }
        (Some(_), Some(_)) => {
            return Err(BookError::InvalidUnit {
                path: path.to_path_buf(),
                reason: "both [chapter] and [appendix] tables present".to_string(),
            })
        }
        (None, None) => {
            return Err(BookError::InvalidUnit {
                path: path.to_path_buf(),
                reason: "missing [chapter] or [appendix] table".to_string(),
            })
        }
    };

    // Older sources nest sections and examples under the header table.
    let sections = if raw.sections.is_empty() {
        header.sections
    } else {
        raw.sections
    };
    let raw_examples = if raw.examples.is_empty() {
        header.examples
    } else {
        raw.examples
    };

    let examples = raw_examples.into_iter().map(RawExample::normalize).collect();

    Ok(ContentUnit {
        id,
        title: header.title,
        learning_objectives: header.learning_objectives.and_then(|lo| lo.summary),
        sections,
        summary: header.summary.map(|s| s.content),
        examples,
        source: path.to_path_buf(),
    })
}

#[derive(Debug, Deserialize)]
struct RawUnitFile {
    chapter: Option<RawHeader>,
    appendix: Option<RawHeader>,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    examples: Vec<RawExample>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    number: Option<u32>,
    letter: Option<String>,
    title: String,
    learning_objectives: Option<RawLearningObjectives>,
    summary: Option<RawSummary>,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    examples: Vec<RawExample>,
}

#[derive(Debug, Deserialize)]
struct RawLearningObjectives {
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RawExample {
    name: String,
    description: String,
    script: Value,
    input: Option<Value>,
    expected: Option<Value>,
    cli_flags: Option<Vec<String>>,
    section: Option<String>,
    tutorial_text: Option<String>,
    notes: Option<String>,
}

impl RawExample {
    fn normalize(self) -> Example {
        let script_source = match &self.script {
            Value::String(text) => Some(text.clone()),
            _ => None,
        };
        Example {
            name: self.name,
            description: self.description,
            script: normalize_script(self.script),
            script_source,
            input: self.input.unwrap_or_else(|| Value::Object(Map::new())),
            expected: self.expected,
            cli_flags: self.cli_flags.unwrap_or_default(),
            section: self
                .section
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SECTION.to_string()),
            tutorial_text: self.tutorial_text,
            notes: self.notes,
        }
    }
}
