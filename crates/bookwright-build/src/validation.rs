//! Validation outcomes and their classification.

use std::time::Duration;

use bookwright_core::documents_equal;
use serde_json::Value;

use crate::runner::Execution;

/// Outcome of running one example against the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Output parsed and matched the expected document.
    Success { actual: Value, stderr: String },

    /// The interpreter exited non-zero. `exit_code` is `-1` when it was
    /// killed by a signal or could not be started, in which case `stderr`
    /// carries the reason.
    ProcessFailure {
        exit_code: i32,
        stdout: String,
        stderr: String,
        command: Option<String>,
    },

    /// The interpreter did not finish in time and was killed.
    Timeout { limit: Duration, command: String },

    /// Standard output was not a structured document.
    ParseFailure {
        raw: String,
        reason: String,
        stderr: String,
        command: String,
    },

    /// Output parsed but differs from the expected document.
    Mismatch {
        expected: Value,
        actual: Value,
        stdout: String,
        stderr: String,
        command: String,
    },
}

impl ValidationResult {
    pub fn passed(&self) -> bool {
        matches!(self, ValidationResult::Success { .. })
    }

    /// Stable classification name.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationResult::Success { .. } => "success",
            ValidationResult::ProcessFailure { .. } => "process_failure",
            ValidationResult::Timeout { .. } => "timeout",
            ValidationResult::ParseFailure { .. } => "parse_failure",
            ValidationResult::Mismatch { .. } => "mismatch",
        }
    }

    /// One-line error description; `None` for success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ValidationResult::Success { .. } => None,
            ValidationResult::ProcessFailure { exit_code, .. } => {
                Some(format!("interpreter returned error code {}", exit_code))
            }
            ValidationResult::Timeout { limit, .. } => Some(format!(
                "interpreter execution timed out after {} seconds",
                limit.as_secs_f64()
            )),
            ValidationResult::ParseFailure { reason, .. } => {
                Some(format!("failed to parse interpreter output as JSON: {}", reason))
            }
            ValidationResult::Mismatch { .. } => Some("output mismatch".to_string()),
        }
    }

    /// Command line that produced this result, when one was run.
    pub fn command(&self) -> Option<&str> {
        match self {
            ValidationResult::Success { .. } => None,
            ValidationResult::ProcessFailure { command, .. } => command.as_deref(),
            ValidationResult::Timeout { command, .. }
            | ValidationResult::ParseFailure { command, .. }
            | ValidationResult::Mismatch { command, .. } => Some(command),
        }
    }

    /// `(expected, actual)` for a mismatch.
    pub fn expected_actual(&self) -> Option<(&Value, &Value)> {
        match self {
            ValidationResult::Mismatch { expected, actual, .. } => Some((expected, actual)),
            _ => None,
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            ValidationResult::ProcessFailure { stdout, .. }
            | ValidationResult::Mismatch { stdout, .. } => stdout,
            ValidationResult::ParseFailure { raw, .. } => raw,
            ValidationResult::Success { .. } | ValidationResult::Timeout { .. } => "",
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            ValidationResult::Success { stderr, .. }
            | ValidationResult::ProcessFailure { stderr, .. }
            | ValidationResult::ParseFailure { stderr, .. }
            | ValidationResult::Mismatch { stderr, .. } => stderr,
            ValidationResult::Timeout { .. } => "",
        }
    }
}

/// Classify an execution against the expected document.
///
/// Priority: timeout, non-zero exit, unparseable stdout, mismatch, success.
pub fn classify(execution: Execution, expected: &Value, command: String) -> ValidationResult {
    let (exit_code, stdout, stderr) = match execution {
        Execution::TimedOut { limit } => return ValidationResult::Timeout { limit, command },
        Execution::Completed {
            exit_code,
            stdout,
            stderr,
            ..
        } => (exit_code, stdout, stderr),
    };

    if exit_code != 0 {
        return ValidationResult::ProcessFailure {
            exit_code,
            stdout,
            stderr,
            command: Some(command),
        };
    }

    let actual: Value = match serde_json::from_str(stdout.trim()) {
        Ok(value) => value,
        Err(e) => {
            return ValidationResult::ParseFailure {
                raw: stdout,
                reason: e.to_string(),
                stderr,
                command,
            }
        }
    };

    if documents_equal(&actual, expected) {
        ValidationResult::Success { actual, stderr }
    } else {
        ValidationResult::Mismatch {
            expected: expected.clone(),
            actual,
            stdout,
            stderr,
            command,
        }
    }
}
