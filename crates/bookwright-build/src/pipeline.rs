//! Build orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use bookwright_core::{discover_units, load_unit, ContentUnit, UnitId, ALL_EXAMPLES_ARCHIVE};
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::archive::{archive_all, archive_unit, ArchiveInfo};
use crate::config::BuildConfig;
use crate::gate::BuildGate;
use crate::hypertext::{HypertextStage, HypertextStatus};
use crate::packager::ArtifactPackager;
use crate::report::{write_build_summary, write_unit_report};
use crate::runner::ExampleExecutor;
use crate::validator::{ExampleOutcome, ExampleValidator};

/// Result of processing one content unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    pub id: UnitId,

    /// `None` when the unit failed to load.
    pub title: Option<String>,

    /// Source file the unit was loaded from.
    pub source: PathBuf,

    pub success: bool,

    /// First error that stopped processing of this unit.
    pub error: Option<String>,

    /// Per-example outcomes; `None` when validation was not requested or
    /// the unit never loaded.
    pub outcomes: Option<Vec<ExampleOutcome>>,

    /// The unit's example archive, once packaged.
    pub archive: Option<ArchiveInfo>,
}

impl BuildResult {
    /// Empty, unsuccessful result for `id`.
    pub fn new(id: UnitId, source: PathBuf) -> Self {
        Self {
            id,
            title: None,
            source,
            success: false,
            error: None,
            outcomes: None,
            archive: None,
        }
    }

    /// Result for a unit that could not be processed at all.
    fn failed(source: PathBuf, error: impl std::fmt::Display) -> Self {
        let mut result = Self::new(unresolved_id(&source), source);
        result.error = Some(error.to_string());
        result
    }

    /// Number of examples that passed validation.
    pub fn passed_count(&self) -> usize {
        self.count(ExampleOutcome::passed)
    }

    /// Number of examples that failed validation.
    pub fn failed_count(&self) -> usize {
        self.count(ExampleOutcome::failed)
    }

    /// Number of examples skipped for lack of expected output.
    pub fn skipped_count(&self) -> usize {
        self.count(ExampleOutcome::skipped)
    }

    fn count(&self, predicate: impl Fn(&ExampleOutcome) -> bool) -> usize {
        self.outcomes
            .as_ref()
            .map_or(0, |outcomes| outcomes.iter().filter(|o| predicate(o)).count())
    }
}

/// Result of a complete build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub build_id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Per-unit results in discovery order.
    pub results: Vec<BuildResult>,

    /// The whole-build archive, if it was written.
    pub archive: Option<ArchiveInfo>,

    /// Why the whole-build archive could not be written.
    pub archive_error: Option<String>,

    pub summary_path: Option<PathBuf>,

    pub hypertext: HypertextStatus,

    /// Gate verdict; see [`BuildGate::evaluate`].
    pub success: bool,
}

impl BuildOutcome {
    /// Fresh outcome over `results`; not yet evaluated.
    pub fn new(results: Vec<BuildResult>) -> Self {
        Self {
            build_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 0,
            results,
            archive: None,
            archive_error: None,
            summary_path: None,
            hypertext: HypertextStatus::Skipped,
            success: false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }

    pub fn successful_units(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed_units(&self) -> usize {
        self.results.len() - self.successful_units()
    }
}

/// Processes a single unit: load, validate, page, package, archive.
struct UnitProcessor {
    validator: Option<ExampleValidator>,
    packager: ArtifactPackager,
}

impl UnitProcessor {
    fn new(config: &BuildConfig, executor: Arc<dyn ExampleExecutor>) -> Self {
        let validator = config
            .validate
            .then(|| ExampleValidator::new(executor, config.interpreter.as_str(), config.timeout()));
        Self {
            validator,
            packager: ArtifactPackager::new(config.output_dir.clone(), config.program_name()),
        }
    }

    async fn process(&self, source: PathBuf) -> BuildResult {
        info!(source = %source.display(), "Processing unit");

        // Nothing is packaged for a unit that does not load.
        let unit = match load_unit(&source) {
            Ok(unit) => unit,
            Err(e) => {
                error!(source = %source.display(), error = %e, "Failed to load unit");
                return BuildResult::failed(source, e);
            }
        };

        let mut result = BuildResult::new(unit.id.clone(), source);
        result.title = Some(unit.title.clone());

        if let Some(validator) = &self.validator {
            result.outcomes = Some(validator.validate_unit(&unit).await);
        }

        match self.write_artifacts(&unit) {
            Ok(archive) => result.archive = Some(archive),
            Err(e) => {
                error!(unit = %unit.id, error = %e, "Failed to package unit");
                result.error = Some(e.to_string());
            }
        }

        result.success = result.error.is_none() && result.failed_count() == 0;
        if result.success {
            info!(unit = %unit.id, "Unit completed");
        } else {
            warn!(unit = %unit.id, failed_examples = result.failed_count(), "Unit failed");
        }
        result
    }

    fn write_artifacts(&self, unit: &ContentUnit) -> crate::error::Result<ArchiveInfo> {
        self.packager.write_page(unit)?;
        let unit_dir = self.packager.package(unit)?;
        archive_unit(&unit_dir)
    }
}

/// Build orchestrator.
pub struct BuildPipeline;

impl BuildPipeline {
    /// Run a complete build.
    ///
    /// Unit failures are recorded in the outcome, never raised. `Err` means
    /// the build could not run at all: no units discovered, the output root
    /// could not be created, or the summary could not be written.
    pub async fn run(config: &BuildConfig, executor: Arc<dyn ExampleExecutor>) -> anyhow::Result<BuildOutcome> {
        let start = Instant::now();

        let sources = discover_units(&config.source_dir)?;
        info!(
            units = sources.len(),
            source_dir = %config.source_dir.display(),
            jobs = config.effective_jobs(),
            "Starting build"
        );

        std::fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("failed to create output directory {}", config.output_dir.display()))?;

        let processor = Arc::new(UnitProcessor::new(config, executor));
        let mut results = Self::process_units(processor, sources, config.effective_jobs()).await?;

        if config.validate {
            for result in &mut results {
                if let Err(e) = write_unit_report(&config.output_dir, result) {
                    error!(unit = %result.id, error = %e, "Failed to write test report");
                    result.error.get_or_insert_with(|| e.to_string());
                    result.success = false;
                }
            }
        }

        let mut outcome = BuildOutcome::new(results);

        let archive_path = config.output_dir.join(ALL_EXAMPLES_ARCHIVE);
        match archive_all(&config.code_dir(), &archive_path) {
            Ok(archive) => outcome.archive = Some(archive),
            Err(e) => {
                error!(error = %e, "Failed to write whole-build archive");
                outcome.archive_error = Some(e.to_string());
            }
        }

        let summary = write_build_summary(&config.output_dir, &outcome.results, outcome.archive.as_ref())
            .context("failed to write build summary")?;
        outcome.summary_path = Some(summary);

        if config.hypertext {
            outcome.hypertext = HypertextStage::new(config.hypertext_command.clone())
                .run(&config.output_dir, &config.docs_dir)
                .await;
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;

        let verdict = BuildGate::evaluate(&outcome);
        outcome.success = verdict.passed;
        if verdict.passed {
            info!(build_id = %outcome.build_id, "{}", verdict.message);
        } else {
            warn!(build_id = %outcome.build_id, violations = verdict.violations.len(), "{}", verdict.message);
        }

        Ok(outcome)
    }

    /// Process one unit file on its own: page, package, archive, and when
    /// validating, its test report. No summary or whole-build archive.
    pub async fn run_unit(
        config: &BuildConfig,
        executor: Arc<dyn ExampleExecutor>,
        source: &Path,
    ) -> anyhow::Result<BuildResult> {
        std::fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("failed to create output directory {}", config.output_dir.display()))?;

        let processor = UnitProcessor::new(config, executor);
        let mut result = processor.process(source.to_path_buf()).await;

        if config.validate {
            if let Err(e) = write_unit_report(&config.output_dir, &result) {
                result.error.get_or_insert_with(|| e.to_string());
                result.success = false;
            }
        }
        Ok(result)
    }

    /// Run units through a pool of at most `jobs` concurrent tasks.
    ///
    /// Permits are taken in discovery order before each spawn, so `jobs == 1`
    /// processes units strictly one after another. Results come back in
    /// discovery order regardless of completion order.
    async fn process_units(
        processor: Arc<UnitProcessor>,
        sources: Vec<PathBuf>,
        jobs: usize,
    ) -> anyhow::Result<Vec<BuildResult>> {
        let semaphore = Arc::new(Semaphore::new(jobs));
        let mut tasks: Vec<(PathBuf, JoinHandle<BuildResult>)> = Vec::with_capacity(sources.len());

        for source in sources {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("unit worker pool closed")?;
            let processor = Arc::clone(&processor);
            let task_source = source.clone();

            let task = tokio::spawn(async move {
                let result = processor.process(task_source).await;
                drop(permit);
                result
            });
            tasks.push((source, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (source, task) in tasks {
            match task.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(source = %source.display(), error = %e, "Unit task failed");
                    results.push(BuildResult::failed(source, format!("unit task failed: {}", e)));
                }
            }
        }
        Ok(results)
    }
}

/// Identity recorded for a unit whose header could not be read.
fn unresolved_id(source: &Path) -> UnitId {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source.display().to_string());
    UnitId::unresolved(stem)
}
