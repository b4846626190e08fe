//! Report Aggregator: per-unit test reports and the build summary.
//!
//! Both renderers are pure; nothing time- or machine-dependent is written,
//! so an unchanged build produces identical reports.

use std::path::{Path, PathBuf};

use bookwright_core::document::to_compact_json;
use bookwright_core::slug::title_case;
use tracing::info;

use crate::archive::ArchiveInfo;
use crate::error::{PackagingError, Result};
use crate::pipeline::BuildResult;
use crate::validator::ExampleOutcome;

pub const BUILD_SUMMARY_FILE: &str = "build_summary.md";

const PASS_MARK: &str = "✓";
const FAIL_MARK: &str = "✗";
const SKIP_MARK: &str = "-";

/// Markdown validation report for one unit.
pub fn render_unit_report(result: &BuildResult) -> String {
    let mut md = format!("# Test Report: {}\n\n", result.id.label());
    if let Some(title) = &result.title {
        md.push_str(&format!("**{}**\n\n", title));
    }

    let Some(outcomes) = &result.outcomes else {
        md.push_str("No examples were validated.\n");
        return md;
    };

    let passed = result.passed_count();
    let failed = result.failed_count();
    let skipped = result.skipped_count();

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- **Total Examples**: {}\n", passed + failed));
    md.push_str(&format!("- **Passed**: {} {}\n", passed, PASS_MARK));
    if failed > 0 {
        md.push_str(&format!("- **Failed**: {} {}\n", failed, FAIL_MARK));
    } else {
        md.push_str("- **Failed**: 0\n");
    }
    if skipped > 0 {
        md.push_str(&format!("- **Skipped**: {} (no expected output)\n", skipped));
    }
    md.push('\n');

    md.push_str("## Results by Section\n\n");
    for (section, group) in group_by_section(outcomes) {
        let section_passed = group.iter().filter(|o| o.passed()).count();
        let section_total = group.iter().filter(|o| !o.skipped()).count();
        md.push_str(&format!(
            "### {}: {}/{}\n\n",
            title_case(section),
            section_passed,
            section_total
        ));
        for outcome in group {
            let line = if outcome.skipped() {
                format!("- {} {} (skipped)\n", SKIP_MARK, outcome.name)
            } else if outcome.passed() {
                format!("- {} {}\n", PASS_MARK, outcome.name)
            } else {
                format!("- {} {}\n", FAIL_MARK, outcome.name)
            };
            md.push_str(&line);
        }
        md.push('\n');
    }

    if failed > 0 {
        md.push_str("## Failed Examples\n\n");
        for outcome in outcomes.iter().filter(|o| o.failed()) {
            render_failure(&mut md, outcome);
        }
    }

    md
}

fn render_failure(md: &mut String, outcome: &ExampleOutcome) {
    let Some(result) = &outcome.result else {
        return;
    };

    md.push_str(&format!("### {}\n\n", outcome.name));
    md.push_str(&format!("**Description**: {}\n\n", outcome.description));
    if let Some(error) = result.error_message() {
        md.push_str(&format!("**Error**: {} ({})\n\n", error, result.kind()));
    }
    if let Some(command) = result.command() {
        md.push_str(&format!("**Command**: `{}`\n\n", command));
    }
    if let Some((expected, actual)) = result.expected_actual() {
        md.push_str(&format!("**Expected**: `{}`\n\n", to_compact_json(expected)));
        md.push_str(&format!("**Actual**: `{}`\n\n", to_compact_json(actual)));
    }
    if !result.stderr().trim().is_empty() {
        md.push_str(&format!("**Stderr**:\n```\n{}\n```\n\n", result.stderr().trim_end()));
    }
    if !result.stdout().trim().is_empty() {
        md.push_str(&format!("**Stdout**:\n```\n{}\n```\n\n", result.stdout().trim_end()));
    }
    md.push_str("---\n\n");
}

/// Outcomes grouped by section, sections in first-seen order.
fn group_by_section(outcomes: &[ExampleOutcome]) -> Vec<(&str, Vec<&ExampleOutcome>)> {
    let mut groups: Vec<(&str, Vec<&ExampleOutcome>)> = Vec::new();
    for outcome in outcomes {
        match groups.iter_mut().find(|(section, _)| *section == outcome.section) {
            Some((_, group)) => group.push(outcome),
            None => groups.push((outcome.section.as_str(), vec![outcome])),
        }
    }
    groups
}

/// Markdown summary of a whole build. Units are listed in identity order
/// (chapters by number, then appendices by letter) whatever order they
/// finished in.
pub fn render_build_summary(results: &[BuildResult], archive: Option<&ArchiveInfo>) -> String {
    let total = results.len();
    let successful = results.iter().filter(|r| r.success).count();

    let mut md = String::from("# Build Summary\n\n");
    md.push_str("## Unit Generation\n\n");
    md.push_str(&format!("- **Total Units**: {}\n", total));
    md.push_str(&format!("- **Successful**: {}\n", successful));
    md.push_str(&format!("- **Failed**: {}\n\n", total - successful));

    if results.iter().any(|r| r.outcomes.is_some()) {
        let passed: usize = results.iter().map(BuildResult::passed_count).sum();
        let failed: usize = results.iter().map(BuildResult::failed_count).sum();
        let skipped: usize = results.iter().map(BuildResult::skipped_count).sum();

        md.push_str("## Example Validation\n\n");
        md.push_str(&format!("- **Total Examples**: {}\n", passed + failed));
        md.push_str(&format!("- **Passed**: {}\n", passed));
        md.push_str(&format!("- **Failed**: {}\n", failed));
        if skipped > 0 {
            md.push_str(&format!("- **Skipped**: {}\n", skipped));
        }
        md.push('\n');
    }

    md.push_str("## Unit Details\n\n");
    let mut ordered: Vec<&BuildResult> = results.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));
    for result in ordered {
        let status = if result.success { "PASS" } else { "FAIL" };
        md.push_str(&format!("- **{}** {}", status, result.id.label()));
        if let Some(title) = &result.title {
            md.push_str(&format!(": {}", title));
        }
        if let Some(error) = &result.error {
            md.push_str(&format!(" - Error: {}", single_line(error)));
        } else if result.outcomes.is_some() {
            md.push_str(&format!(
                " - Examples: {}/{}",
                result.passed_count(),
                result.passed_count() + result.failed_count()
            ));
        }
        md.push('\n');
    }

    if let Some(archive) = archive {
        let name = archive
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        md.push_str("\n## Downloads\n\n");
        md.push_str(&format!(
            "- `{}`: {} files, sha256 `{}`\n",
            name,
            archive.members.len(),
            archive.sha256
        ));
    }

    md
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Write the unit's test report under `output_dir`.
///
/// Returns `None` without writing anything when the unit was not validated.
pub fn write_unit_report(output_dir: &Path, result: &BuildResult) -> Result<Option<PathBuf>> {
    if result.outcomes.is_none() {
        return Ok(None);
    }
    let path = output_dir.join(bookwright_core::unit::report_file_name(&result.id));
    std::fs::write(&path, render_unit_report(result)).map_err(PackagingError::io(&path))?;
    info!(unit = %result.id, path = %path.display(), "Wrote test report");
    Ok(Some(path))
}

/// Write `build_summary.md` under `output_dir`.
pub fn write_build_summary(
    output_dir: &Path,
    results: &[BuildResult],
    archive: Option<&ArchiveInfo>,
) -> Result<PathBuf> {
    let path = output_dir.join(BUILD_SUMMARY_FILE);
    std::fs::write(&path, render_build_summary(results, archive)).map_err(PackagingError::io(&path))?;
    info!(path = %path.display(), "Wrote build summary");
    Ok(path)
}
