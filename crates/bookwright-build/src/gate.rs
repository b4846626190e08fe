//! Build gate: aggregate pass/fail for a finished build.

use serde::{Deserialize, Serialize};

use crate::pipeline::BuildOutcome;

/// Gate evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildVerdict {
    /// Whether the build passed.
    pub passed: bool,

    /// Violations that caused failure (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

impl BuildVerdict {
    /// Process exit code for this verdict.
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

/// Build gate rules.
pub struct BuildGate;

impl BuildGate {
    /// Evaluate a finished build.
    ///
    /// Gate rule:
    /// - every unit must have succeeded
    /// - the whole-build archive must have been written
    /// - the hypertext stage, when it ran, must have succeeded
    pub fn evaluate(outcome: &BuildOutcome) -> BuildVerdict {
        let mut violations = Vec::new();

        for result in &outcome.results {
            if result.success {
                continue;
            }
            match &result.error {
                Some(error) => violations.push(format!("{} failed: {}", result.id.label(), error)),
                None => violations.push(format!(
                    "{} has {} failing example(s)",
                    result.id.label(),
                    result.failed_count()
                )),
            }
        }

        if let Some(error) = &outcome.archive_error {
            violations.push(format!("Whole-build archive failed: {}", error));
        }

        if let crate::hypertext::HypertextStatus::Failed { exit_code, .. } = &outcome.hypertext {
            violations.push(format!("Hypertext stage failed with exit code {}", exit_code));
        }

        let passed = violations.is_empty();
        let message = if passed {
            format!("All {} unit(s) built successfully", outcome.results.len())
        } else {
            format!("Build failed with {} violation(s)", violations.len())
        };

        BuildVerdict {
            passed,
            violations,
            message,
        }
    }
}
