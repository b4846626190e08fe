//! Build configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Wall-clock limit for a single interpreter run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything one build needs to know.
///
/// The CLI fills this from flags and `BOOKWRIGHT_*` environment variables;
/// tests construct it directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory holding `ch*.toml` / `appendix*.toml` sources.
    pub source_dir: PathBuf,

    /// Root of every produced artifact.
    pub output_dir: PathBuf,

    /// Interpreter used to run examples (name on `PATH` or a path).
    pub interpreter: String,

    /// Run every example and write per-unit test reports.
    pub validate: bool,

    /// Run the markup-to-hypertext stage after packaging.
    pub hypertext: bool,

    /// Hypertext converter; `--input-dir` and `--output-dir` are appended.
    pub hypertext_command: Vec<String>,

    /// Destination handed to the hypertext converter.
    pub docs_dir: PathBuf,

    /// Per-example timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum number of units processed concurrently. 1 is sequential.
    pub jobs: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("book-source"),
            output_dir: PathBuf::from("new_way"),
            interpreter: "computo".to_string(),
            validate: false,
            hypertext: true,
            hypertext_command: vec![
                "python3".to_string(),
                "scripts/generate_html.py".to_string(),
            ],
            docs_dir: PathBuf::from("docs"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            jobs: 1,
        }
    }
}

impl BuildConfig {
    /// Configuration for `source_dir` -> `output_dir` with defaults elsewhere.
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Disable the hypertext stage.
    pub fn without_hypertext(mut self) -> Self {
        self.hypertext = false;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Concurrency bound, never below one.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.max(1)
    }

    /// Interpreter name written into packaged runners and pages.
    ///
    /// Packaged examples are run on the reader's machine, so only the file
    /// name of a configured path is kept.
    pub fn program_name(&self) -> String {
        Path::new(&self.interpreter)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.interpreter.clone())
    }

    /// `output/code`, root of the packaged examples.
    pub fn code_dir(&self) -> PathBuf {
        self.output_dir.join(bookwright_core::CODE_DIR)
    }
}
