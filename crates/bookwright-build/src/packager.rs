//! Artifact Packager: text pages and runnable example directories.
//!
//! Layout under the output root:
//!
//! ```text
//! <page>.md
//! code/<unit-dir>/README.md
//! code/<unit-dir>/<section>/<example>/script.json
//!                                     input.json      (only with input)
//!                                     expected.json   (only when verifiable)
//!                                     metadata.json
//!                                     run.sh
//!                                     run.bat
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bookwright_core::invocation::{EXPECTED_FILE, INPUT_FILE, METADATA_FILE, SCRIPT_FILE};
use bookwright_core::{render_unit_page, ContentUnit, Example, Invocation, ALL_EXAMPLES_ARCHIVE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{PackagingError, Result};

pub const POSIX_RUNNER: &str = "run.sh";
pub const WINDOWS_RUNNER: &str = "run.bat";
pub const UNIT_README: &str = "README.md";

/// `metadata.json` contents.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExampleMetadata {
    pub name: String,
    pub description: String,
    pub section: String,
    pub cli_flags: Vec<String>,
    pub unit_kind: String,
    pub unit: String,
    pub unit_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tutorial_text: Option<String>,
}

impl ExampleMetadata {
    pub fn new(unit: &ContentUnit, example: &Example) -> Self {
        Self {
            name: example.name.clone(),
            description: example.description.clone(),
            section: example.section.clone(),
            cli_flags: example.cli_flags.clone(),
            unit_kind: unit.id.kind().to_string(),
            unit: unit.id.identifier(),
            unit_title: unit.title.clone(),
            tutorial_text: example.tutorial_text.clone(),
        }
    }
}

/// Writes a unit's page and example files beneath the output root.
#[derive(Debug, Clone)]
pub struct ArtifactPackager {
    output_dir: PathBuf,
    program: String,
}

impl ArtifactPackager {
    /// `program` is the interpreter name used in pages and runner scripts.
    pub fn new(output_dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            program: program.into(),
        }
    }

    pub fn code_dir(&self) -> PathBuf {
        self.output_dir.join(bookwright_core::CODE_DIR)
    }

    /// Directory a unit's examples are written to.
    pub fn unit_dir(&self, unit: &ContentUnit) -> PathBuf {
        self.code_dir().join(unit.directory_name())
    }

    /// Write the unit's text page; returns its path.
    pub fn write_page(&self, unit: &ContentUnit) -> Result<PathBuf> {
        let path = self.output_dir.join(unit.page_file_name());
        write_file(&path, render_unit_page(unit, &self.program))?;
        debug!(unit = %unit.id, path = %path.display(), "Wrote text page");
        Ok(path)
    }

    /// Write every example of `unit` and the unit README; returns the unit
    /// directory.
    ///
    /// The directory is recreated from scratch so examples removed from the
    /// source do not linger in it. Examples whose section and name normalize
    /// to the same directory are rejected before anything is touched.
    pub fn package(&self, unit: &ContentUnit) -> Result<PathBuf> {
        let unit_dir = self.unit_dir(unit);
        let dirs = example_dirs(&unit_dir, unit)?;

        if unit_dir.exists() {
            std::fs::remove_dir_all(&unit_dir).map_err(PackagingError::io(&unit_dir))?;
        }
        create_dir(&unit_dir)?;

        for (example_dir, example) in dirs.iter().zip(&unit.examples) {
            self.write_example(example_dir, unit, example)?;
        }

        write_file(&unit_dir.join(UNIT_README), render_unit_readme(unit, &self.program))?;

        info!(
            unit = %unit.id,
            examples = unit.examples.len(),
            dir = %unit_dir.display(),
            "Packaged examples"
        );
        Ok(unit_dir)
    }

    fn write_example(&self, dir: &Path, unit: &ContentUnit, example: &Example) -> Result<()> {
        create_dir(dir)?;

        write_json(&dir.join(SCRIPT_FILE), &example.script)?;
        if example.has_input() {
            write_json(&dir.join(INPUT_FILE), &example.input)?;
        }
        if let Some(expected) = &example.expected {
            write_json(&dir.join(EXPECTED_FILE), expected)?;
        }

        let metadata = serde_json::to_string_pretty(&ExampleMetadata::new(unit, example))?;
        write_file(&dir.join(METADATA_FILE), metadata + "\n")?;

        let invocation = Invocation::packaged(&self.program, example);
        let has_expected = example.is_verifiable();

        let posix = dir.join(POSIX_RUNNER);
        write_file(&posix, render_posix_runner(&example.name, &invocation, has_expected))?;
        make_executable(&posix)?;

        write_file(
            &dir.join(WINDOWS_RUNNER),
            render_windows_runner(&example.name, &invocation, has_expected),
        )?;
        Ok(())
    }
}

/// POSIX shell runner for an example directory.
pub fn render_posix_runner(name: &str, invocation: &Invocation, has_expected: bool) -> String {
    let command = posix_command(invocation);
    let mut sh = String::new();
    sh.push_str("#!/bin/sh\n");
    sh.push_str(&format!("# Run {} example\n", name));
    sh.push_str("# Usage: ./run.sh\n\n");
    sh.push_str("cd \"$(dirname \"$0\")\" || exit 1\n\n");
    sh.push_str(&format!("echo {}\n", posix_quote(&format!("Running {} example...", name))));
    sh.push_str(&format!("echo {}\n", posix_quote(&format!("Command: {}", invocation))));
    sh.push_str("echo \"\"\n\n");
    sh.push_str(&command);
    sh.push_str("\n\necho \"\"\n");
    if has_expected {
        sh.push_str("echo \"Expected output:\"\n");
        sh.push_str(&format!("cat {}\n", EXPECTED_FILE));
    } else {
        sh.push_str("echo \"No expected output is recorded for this example.\"\n");
    }
    sh.push_str("echo \"\"\n");
    sh
}

/// Windows batch runner for an example directory. Uses CRLF line endings.
pub fn render_windows_runner(name: &str, invocation: &Invocation, has_expected: bool) -> String {
    let command = windows_command(invocation);
    let mut bat = String::new();
    bat.push_str("@echo off\n");
    bat.push_str(&format!("REM Run {} example\n", batch_echo_escape(name)));
    bat.push_str("REM Usage: run.bat\n\n");
    bat.push_str("cd /d \"%~dp0\"\n\n");
    bat.push_str(&format!("echo Running {} example...\n", batch_echo_escape(name)));
    bat.push_str(&format!("echo Command: {}\n", batch_echo_escape(&invocation.to_string())));
    bat.push_str("echo.\n\n");
    bat.push_str(&command);
    bat.push_str("\n\necho.\n");
    if has_expected {
        bat.push_str("echo Expected output:\n");
        bat.push_str(&format!("type {}\n", EXPECTED_FILE));
    } else {
        bat.push_str("echo No expected output is recorded for this example.\n");
    }
    bat.push_str("echo.\n");
    bat.push_str("pause\n");
    bat.replace('\n', "\r\n")
}

/// The invocation as a POSIX shell command line.
pub fn posix_command(invocation: &Invocation) -> String {
    std::iter::once(invocation.program.clone())
        .chain(invocation.args())
        .map(|word| posix_quote(&word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The invocation as a batch command line.
pub fn windows_command(invocation: &Invocation) -> String {
    std::iter::once(invocation.program.clone())
        .chain(invocation.args())
        .map(|word| batch_quote(&word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn posix_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

fn batch_quote(word: &str) -> String {
    let escaped = word.replace('%', "%%");
    let plain = !escaped.is_empty()
        && escaped
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,+@%\\".contains(c));
    if plain {
        escaped
    } else {
        format!("\"{}\"", escaped.replace('"', "\"\""))
    }
}

fn batch_echo_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => out.push_str("%%"),
            '^' | '&' | '|' | '<' | '>' => {
                out.push('^');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// README placed in each unit's code directory.
pub fn render_unit_readme(unit: &ContentUnit, program: &str) -> String {
    let label = unit.id.label();
    let mut md = format!("# {}: {} - Code Examples\n\n", label, unit.title);
    md.push_str(&format!(
        "This directory contains all runnable code examples from {}.\n\n",
        label
    ));
    md.push_str("## Quick Start\n\nEach example directory contains:\n");
    md.push_str(&format!("- `{}` - The script\n", SCRIPT_FILE));
    md.push_str(&format!("- `{}` - Input data for the script (when needed)\n", INPUT_FILE));
    md.push_str(&format!("- `{}` - Expected output (when recorded)\n", EXPECTED_FILE));
    md.push_str(&format!("- `{}` - Linux/Mac script to run the example\n", POSIX_RUNNER));
    md.push_str(&format!("- `{}` - Windows script to run the example\n", WINDOWS_RUNNER));
    md.push_str(&format!("- `{}` - Example metadata and description\n\n", METADATA_FILE));

    md.push_str("## Running Examples\n\n");
    md.push_str("### Linux/Mac:\n```bash\ncd <section>/<example_name>/\n./run.sh\n```\n\n");
    md.push_str("### Windows:\n```cmd\ncd <section>\\<example_name>\nrun.bat\n```\n\n");
    md.push_str(&format!(
        "### Manual:\n```bash\n# For examples with input data:\n{p} {s} {i}\n\n# For examples without input data:\n{p} {s}\n```\n\n",
        p = program,
        s = SCRIPT_FILE,
        i = INPUT_FILE
    ));

    md.push_str("## Examples by Section\n\n");
    for section in unit.example_sections() {
        md.push_str(&format!("### {}\n\n", bookwright_core::slug::title_case(section)));
        for example in unit.examples.iter().filter(|e| e.section == section) {
            md.push_str(&format!(
                "- **{}** (`{}/{}/`): {}\n",
                example.name,
                example.section_directory_name(),
                example.directory_name(),
                example.description
            ));
        }
        md.push('\n');
    }

    md.push_str("## Requirements\n\n");
    md.push_str(&format!("- `{}` installed and available in PATH\n\n", program));
    md.push_str("## Download\n\n");
    md.push_str(&format!(
        "- [Download this {}'s examples](../{})\n",
        unit.id.kind(),
        unit.archive_file_name()
    ));
    md.push_str(&format!("- [Download all book examples](../../{})\n", ALL_EXAMPLES_ARCHIVE));
    md
}

/// One directory per example, in source order.
fn example_dirs(unit_dir: &Path, unit: &ContentUnit) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut dirs = Vec::with_capacity(unit.examples.len());
    for example in &unit.examples {
        let dir = unit_dir
            .join(example.section_directory_name())
            .join(example.directory_name());
        if !seen.insert(dir.clone()) {
            return Err(PackagingError::DuplicateExample { path: dir });
        }
        dirs.push(dir);
    }
    Ok(dirs)
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    write_file(path, text + "\n")
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    std::fs::write(path, contents).map_err(PackagingError::io(path))
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(PackagingError::io(path))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(PackagingError::io(path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
