//! Markdown text page for a content unit.
//!
//! The page is a pure function of the unit, so rebuilding unchanged content
//! produces a byte-identical file.

use serde_json::Value;

use crate::document::{to_compact_json, to_pretty_json};
use crate::example::Example;
use crate::invocation::{Invocation, INPUT_FILE};
use crate::slug::title_case;
use crate::unit::ContentUnit;

/// Name of the whole-book archive, relative to the output root.
pub const ALL_EXAMPLES_ARCHIVE: &str = "download_all_examples.zip";
/// Directory under the output root holding packaged examples.
pub const CODE_DIR: &str = "code";

/// Render the text page of `unit`. `program` is the interpreter name shown
/// in "How to Run" blocks.
pub fn render_unit_page(unit: &ContentUnit, program: &str) -> String {
    let mut md = format!("## **{}: {}**\n\n", unit.id.label(), unit.title);

    if let Some(objectives) = &unit.learning_objectives {
        md.push_str(objectives.trim_end());
        md.push_str("\n\n");
    }

    for section in &unit.sections {
        md.push_str(&format!("### {}\n\n", section.title));
        md.push_str(section.content.trim_end());
        md.push_str("\n\n");
    }

    if !unit.examples.is_empty() {
        md.push_str("## Hands-On Examples\n\n");
        md.push_str(&format!(
            "These examples demonstrate the concepts covered in this {}. Each example includes \
             the complete script, expected output, and instructions for running it yourself.\n\n",
            unit.id.kind()
        ));
        for example in &unit.examples {
            render_example(&mut md, unit, example, program);
        }
    }

    if let Some(summary) = &unit.summary {
        md.push_str(summary.trim_end());
        md.push('\n');
    }

    md
}

fn render_example(md: &mut String, unit: &ContentUnit, example: &Example, program: &str) {
    let example_dir = format!(
        "{}/{}/{}/{}",
        CODE_DIR,
        unit.directory_name(),
        example.section_directory_name(),
        example.directory_name()
    );

    md.push_str(&format!("### {}\n\n", title_case(&example.name)));
    md.push_str(&format!("**Purpose**: {}\n\n", example.description));

    if let Some(tutorial) = &example.tutorial_text {
        md.push_str(tutorial.trim_end());
        md.push_str("\n\n");
    }

    md.push_str("**Script**:\n```json\n");
    match &example.script_source {
        // Keep the author's own formatting.
        Some(text) => md.push_str(text.trim()),
        None => md.push_str(&to_compact_json(&example.script)),
    }
    md.push_str("\n```\n\n");

    if example.has_input() {
        md.push_str(&format!("**Input Data** (`{}`):\n```json\n", INPUT_FILE));
        md.push_str(&pretty_or_compact(&example.input));
        md.push_str("\n```\n\n");
    }

    let invocation = Invocation::packaged(program, example);
    md.push_str("**How to Run**:\n```bash\n");
    md.push_str("# Navigate to the example directory\n");
    md.push_str(&format!("cd {}/\n\n", example_dir));
    md.push_str("# Run the example\n");
    md.push_str(&format!("{}\n\n", invocation));
    md.push_str("# Or use the provided script\n");
    md.push_str("./run.sh    # Linux/Mac\n");
    md.push_str("run.bat     # Windows\n");
    md.push_str("```\n\n");

    md.push_str("**Expected Output**:\n");
    match &example.expected {
        Some(expected) => {
            md.push_str("```json\n");
            md.push_str(&pretty_or_compact(expected));
            md.push_str("\n```\n\n");
        }
        None => md.push_str("_No expected output is recorded for this example._\n\n"),
    }

    if let Some(notes) = &example.notes {
        md.push_str(&format!("**What to Learn**: {}\n\n", notes.trim_end()));
    }

    if !example.cli_flags.is_empty() {
        md.push_str("**CLI Flags Used**:\n");
        for flag in &example.cli_flags {
            md.push_str(&format!("- `{}`: {}\n", flag, describe_flag(flag)));
        }
        md.push('\n');
    }

    md.push_str("**Download**:\n");
    md.push_str(&format!("- [This example's files]({}/)\n", example_dir));
    md.push_str(&format!(
        "- [{} examples]({}/{})\n",
        unit.id.label(),
        CODE_DIR,
        unit.archive_file_name()
    ));
    md.push_str(&format!("- [All book examples]({})\n\n", ALL_EXAMPLES_ARCHIVE));
    md.push_str("---\n\n");
}

fn pretty_or_compact(value: &Value) -> String {
    to_pretty_json(value).unwrap_or_else(|_| to_compact_json(value))
}

fn describe_flag(flag: &str) -> String {
    match flag {
        "--trace" => "Shows execution flow and operation details".to_string(),
        "--profile" => "Displays timing information for performance analysis".to_string(),
        f if f.starts_with("--pretty") => {
            "Formats output with proper indentation for readability".to_string()
        }
        other => other.to_string(),
    }
}
