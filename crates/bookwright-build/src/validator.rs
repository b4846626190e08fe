//! Example Validator: runs examples against the interpreter.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bookwright_core::{ContentUnit, Example, Invocation};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::runner::{ExampleExecutor, Execution};
use crate::validation::{classify, ValidationResult};

/// One example's entry in a unit's validation results.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleOutcome {
    pub name: String,
    pub description: String,
    pub section: String,
    /// `None` for an example without expected output: it is listed as
    /// skipped and never counted as passed or failed.
    pub result: Option<ValidationResult>,
}

impl ExampleOutcome {
    pub fn passed(&self) -> bool {
        self.result.as_ref().is_some_and(ValidationResult::passed)
    }

    pub fn failed(&self) -> bool {
        self.result.as_ref().is_some_and(|r| !r.passed())
    }

    pub fn skipped(&self) -> bool {
        self.result.is_none()
    }
}

/// Validates examples by running them through an [`ExampleExecutor`].
#[derive(Clone)]
pub struct ExampleValidator {
    executor: Arc<dyn ExampleExecutor>,
    interpreter: String,
    timeout: Duration,
}

impl ExampleValidator {
    pub fn new(executor: Arc<dyn ExampleExecutor>, interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            executor,
            interpreter: interpreter.into(),
            timeout,
        }
    }

    /// Run one example and classify the result.
    ///
    /// The script (and the input, when non-empty) are written to temporary
    /// files that are removed when this returns, whatever the outcome.
    /// Examples without expected output are compared against `null`; callers
    /// that want them skipped use [`ExampleValidator::validate_unit`].
    pub async fn validate(&self, example: &Example) -> ValidationResult {
        let script_file = match write_temp_document(&example.script, "script") {
            Ok(file) => file,
            Err(e) => return setup_failure("script", e),
        };
        let input_file = if example.has_input() {
            match write_temp_document(&example.input, "input") {
                Ok(file) => Some(file),
                Err(e) => return setup_failure("input", e),
            }
        } else {
            None
        };

        let invocation = Invocation::new(
            self.interpreter.as_str(),
            &example.cli_flags,
            path_arg(script_file.path()),
            input_file.as_ref().map(|f| path_arg(f.path())),
        );
        let command = invocation.to_string();

        let execution = match self.executor.execute(&invocation, self.timeout).await {
            Ok(execution) => execution,
            Err(e) => {
                return ValidationResult::ProcessFailure {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: format!("failed to start interpreter: {}", e),
                    command: Some(command),
                }
            }
        };

        if let Execution::Completed {
            exit_code, duration_ms, ..
        } = &execution
        {
            debug!(example = %example.name, exit_code, duration_ms, "Interpreter finished");
        }

        let expected = example.expected.clone().unwrap_or(Value::Null);
        classify(execution, &expected, command)
    }

    /// Validate every example of `unit` in declaration order.
    ///
    /// A failing example never stops its siblings.
    pub async fn validate_unit(&self, unit: &ContentUnit) -> Vec<ExampleOutcome> {
        info!(unit = %unit.id, examples = unit.examples.len(), "Validating examples");

        let mut outcomes = Vec::with_capacity(unit.examples.len());
        for (index, example) in unit.examples.iter().enumerate() {
            let result = if example.is_verifiable() {
                let result = self.validate(example).await;
                match result.error_message() {
                    None => info!(unit = %unit.id, "{:2}. {:<30} PASS", index + 1, example.name),
                    Some(error) => warn!(
                        unit = %unit.id,
                        kind = result.kind(),
                        "{:2}. {:<30} FAIL: {}",
                        index + 1,
                        example.name,
                        error
                    ),
                }
                Some(result)
            } else {
                info!(unit = %unit.id, "{:2}. {:<30} SKIP (no expected output)", index + 1, example.name);
                None
            };

            outcomes.push(ExampleOutcome {
                name: example.name.clone(),
                description: example.description.clone(),
                section: example.section.clone(),
                result,
            });
        }
        outcomes
    }
}

fn write_temp_document(value: &Value, role: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("bookwright-{}-", role))
        .suffix(".json")
        .tempfile()?;
    let text = serde_json::to_string_pretty(value)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn setup_failure(role: &str, error: std::io::Error) -> ValidationResult {
    ValidationResult::ProcessFailure {
        exit_code: -1,
        stdout: String::new(),
        stderr: format!("failed to write temporary {} file: {}", role, error),
        command: None,
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
