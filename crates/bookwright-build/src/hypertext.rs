//! Optional markup-to-hypertext stage run after packaging.

use std::path::Path;
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::{info, warn};

/// Result of the hypertext stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HypertextStatus {
    /// Disabled for this build.
    Skipped,
    Succeeded,
    /// Non-zero exit, or the converter could not be started (`exit_code` -1).
    Failed { exit_code: i32, stderr: String },
}

impl HypertextStatus {
    pub fn failed(&self) -> bool {
        matches!(self, HypertextStatus::Failed { .. })
    }
}

/// External converter invoked as `<command...> --input-dir <input> --output-dir <output>`.
#[derive(Debug, Clone)]
pub struct HypertextStage {
    command: Vec<String>,
}

impl HypertextStage {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Run the converter. Its failure is reported, never raised: the
    /// markup artifacts already written stay in place.
    pub async fn run(&self, input_dir: &Path, output_dir: &Path) -> HypertextStatus {
        let Some((program, args)) = self.command.split_first() else {
            return HypertextStatus::Failed {
                exit_code: -1,
                stderr: "no hypertext command configured".to_string(),
            };
        };

        info!(command = %self.command.join(" "), "Generating hypertext");

        let output = Command::new(program)
            .args(args)
            .arg("--input-dir")
            .arg(input_dir)
            .arg("--output-dir")
            .arg(output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                info!("Hypertext generation completed");
                HypertextStatus::Succeeded
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let exit_code = output.status.code().unwrap_or(-1);
                warn!(exit_code, stderr = %stderr.trim(), "Hypertext generation failed");
                HypertextStatus::Failed { exit_code, stderr }
            }
            Err(e) => {
                warn!(program = %program, error = %e, "Hypertext converter could not be started");
                HypertextStatus::Failed {
                    exit_code: -1,
                    stderr: e.to_string(),
                }
            }
        }
    }
}
