//! bookwright build pipeline
//!
//! Turns a directory of chapter and appendix sources into reviewable
//! artifacts:
//!
//! - Example validation against an external interpreter with timeout and
//!   failure classification
//! - Text pages, runnable example directories and zip archives
//! - Per-unit test reports and a whole-build summary
//! - A gate deciding the build's pass/fail and exit code
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bookwright_build::{BuildConfig, BuildPipeline, ProcessExecutor};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = BuildConfig::new("book-source", "new_way").with_validation(true);
//! let outcome = BuildPipeline::run(&config, Arc::new(ProcessExecutor)).await?;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod gate;
pub mod hypertext;
pub mod packager;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod validation;
pub mod validator;

pub use archive::{archive_all, archive_unit, ArchiveInfo};
pub use config::BuildConfig;
pub use error::PackagingError;
pub use gate::{BuildGate, BuildVerdict};
pub use hypertext::{HypertextStage, HypertextStatus};
pub use packager::ArtifactPackager;
pub use pipeline::{BuildOutcome, BuildPipeline, BuildResult};
pub use report::{render_build_summary, render_unit_report, write_build_summary, write_unit_report};
pub use runner::{ExampleExecutor, Execution, ProcessExecutor};
pub use validation::{classify, ValidationResult};
pub use validator::{ExampleOutcome, ExampleValidator};
