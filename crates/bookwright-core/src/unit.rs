//! Content units: chapters and appendices.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::example::Example;
use crate::slug::slugify;

/// Identity of a content unit.
///
/// Ordering is the summary order: every chapter (by number)
/// before every appendix (by letter), and units whose identity could not be
/// read last, by the string they were recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitId {
    Chapter { number: u32 },
    Appendix { letter: String },
    /// A unit that failed before its identity was known; carries the
    /// source file stem.
    Unresolved { name: String },
}

impl UnitId {
    pub fn chapter(number: u32) -> Self {
        UnitId::Chapter { number }
    }

    /// Appendix letters are stored upper-case so `a` and `A` are one unit.
    pub fn appendix(letter: &str) -> Self {
        UnitId::Appendix {
            letter: letter.trim().to_uppercase(),
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        UnitId::Unresolved { name: name.into() }
    }

    /// `chapter`, `appendix` or `unit`.
    pub fn kind(&self) -> &'static str {
        match self {
            UnitId::Chapter { .. } => "chapter",
            UnitId::Appendix { .. } => "appendix",
            UnitId::Unresolved { .. } => "unit",
        }
    }

    /// Identifier as written in metadata: `3`, `B`, or the file stem.
    pub fn identifier(&self) -> String {
        match self {
            UnitId::Chapter { number } => number.to_string(),
            UnitId::Appendix { letter } => letter.clone(),
            UnitId::Unresolved { name } => name.clone(),
        }
    }

    /// Human label: `Chapter 3`, `Appendix B`.
    pub fn label(&self) -> String {
        match self {
            UnitId::Chapter { number } => format!("Chapter {}", number),
            UnitId::Appendix { letter } => format!("Appendix {}", letter),
            UnitId::Unresolved { name } => name.clone(),
        }
    }

    /// Short file-name prefix: `ch03`, `appendix_b`.
    pub fn short_id(&self) -> String {
        match self {
            UnitId::Chapter { number } => format!("ch{:02}", number),
            UnitId::Appendix { letter } => format!("appendix_{}", letter.to_lowercase()),
            UnitId::Unresolved { name } => slugify(name),
        }
    }

    /// Output directory name: short id plus a slug of the title.
    pub fn directory_name(&self, title: &str) -> String {
        format!("{}_{}", self.short_id(), slugify(title))
    }

    fn tier(&self) -> u8 {
        match self {
            UnitId::Chapter { .. } => 0,
            UnitId::Appendix { .. } => 1,
            UnitId::Unresolved { .. } => 2,
        }
    }
}

impl Ord for UnitId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (UnitId::Chapter { number: a }, UnitId::Chapter { number: b }) => a.cmp(b),
            (UnitId::Appendix { letter: a }, UnitId::Appendix { letter: b }) => a.cmp(b),
            (UnitId::Unresolved { name: a }, UnitId::Unresolved { name: b }) => a.cmp(b),
            _ => self.tier().cmp(&other.tier()),
        }
    }
}

impl PartialOrd for UnitId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A prose section of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
}

/// A fully loaded chapter or appendix.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnit {
    pub id: UnitId,
    pub title: String,
    /// Summary paragraph shown under the heading.
    pub learning_objectives: Option<String>,
    pub sections: Vec<Section>,
    /// Closing text rendered after the examples.
    pub summary: Option<String>,
    /// Examples in declaration order.
    pub examples: Vec<Example>,
    pub source: PathBuf,
}

impl ContentUnit {
    /// Directory under `code/` holding this unit's examples.
    pub fn directory_name(&self) -> String {
        self.id.directory_name(&self.title)
    }

    /// File name of the unit's text page.
    pub fn page_file_name(&self) -> String {
        match &self.id {
            UnitId::Chapter { number } => format!("{:02}_{}.md", number, slugify(&self.title)),
            _ => format!("{}.md", self.directory_name()),
        }
    }

    /// File name of the unit's validation report.
    pub fn report_file_name(&self) -> String {
        report_file_name(&self.id)
    }

    /// File name of the unit's example archive, placed beside its directory.
    pub fn archive_file_name(&self) -> String {
        format!("{}_examples.zip", self.directory_name())
    }

    /// Section names in first-seen order.
    pub fn example_sections(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for example in &self.examples {
            if !seen.contains(&example.section.as_str()) {
                seen.push(&example.section);
            }
        }
        seen
    }
}

/// Report file name for a unit identity.
pub fn report_file_name(id: &UnitId) -> String {
    format!("{}_test_report.md", id.short_id())
}
