//! bookwright - book example validation and packaging
//!
//! ## Commands
//!
//! - `build`: validate, package and summarize every chapter and appendix
//! - `unit`: process a single chapter or appendix file

use anyhow::{Context, Result};
use bookwright_build::{
    BuildConfig, BuildGate, BuildOutcome, BuildPipeline, BuildResult, HypertextStatus, ProcessExecutor,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "bookwright")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate, package and report on book examples", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by `build` and `unit`.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Output directory for pages, examples and reports
    #[arg(long, env = "BOOKWRIGHT_OUTPUT_DIR", default_value = "new_way")]
    output_dir: PathBuf,

    /// Interpreter used to run examples
    #[arg(long, env = "BOOKWRIGHT_INTERPRETER", default_value = "computo")]
    interpreter: String,

    /// Run every example and write test reports
    #[arg(long, env = "BOOKWRIGHT_VALIDATE")]
    validate: bool,

    /// Per-example timeout in seconds
    #[arg(long, env = "BOOKWRIGHT_TIMEOUT_SECS", default_value_t = bookwright_build::config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every chapter and appendix in the source directory
    Build {
        /// Directory holding ch*.toml and appendix*.toml sources
        #[arg(long, env = "BOOKWRIGHT_SOURCE_DIR", default_value = "book-source")]
        source_dir: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Skip hypertext generation
        #[arg(long, env = "BOOKWRIGHT_NO_HTML")]
        no_html: bool,

        /// Hypertext converter command; --input-dir and --output-dir are appended
        #[arg(long, env = "BOOKWRIGHT_HTML_COMMAND", default_value = "python3 scripts/generate_html.py")]
        html_command: String,

        /// Destination for generated hypertext
        #[arg(long, env = "BOOKWRIGHT_DOCS_DIR", default_value = "docs")]
        docs_dir: PathBuf,

        /// Units processed concurrently
        #[arg(short, long, env = "BOOKWRIGHT_JOBS", default_value_t = 1)]
        jobs: usize,
    },

    /// Process a single chapter or appendix file
    Unit {
        /// Path to the unit source (TOML)
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

impl Commands {
    fn config(&self) -> BuildConfig {
        match self {
            Commands::Build {
                source_dir,
                output,
                no_html,
                html_command,
                docs_dir,
                jobs,
            } => {
                let mut config = output
                    .config(source_dir.clone())
                    .with_jobs(*jobs);
                config.hypertext = !no_html;
                config.hypertext_command = html_command.split_whitespace().map(str::to_string).collect();
                config.docs_dir = docs_dir.clone();
                config
            }
            Commands::Unit { file, output } => {
                let source_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
                output.config(source_dir).without_hypertext()
            }
        }
    }
}

impl OutputArgs {
    fn config(&self, source_dir: PathBuf) -> BuildConfig {
        BuildConfig::new(source_dir, self.output_dir.clone())
            .with_interpreter(self.interpreter.clone())
            .with_validation(self.validate)
            .with_timeout_secs(self.timeout_secs)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bookwright_core::init_tracing(cli.json, level);

    let config = cli.command.config();
    match &cli.command {
        Commands::Build { .. } => cmd_build(&config).await,
        Commands::Unit { file, .. } => cmd_unit(&config, file).await,
    }
}

async fn cmd_build(config: &BuildConfig) -> Result<()> {
    info!(
        source_dir = %config.source_dir.display(),
        output_dir = %config.output_dir.display(),
        validate = config.validate,
        "Building book"
    );

    let outcome = BuildPipeline::run(config, Arc::new(ProcessExecutor))
        .await
        .context("Build failed to run")?;

    print_outcome(&outcome);

    let verdict = BuildGate::evaluate(&outcome);
    println!("Gate: {}", if verdict.passed { "✓ PASSED" } else { "✗ FAILED" });
    if !verdict.violations.is_empty() {
        println!("Violations:");
        for violation in &verdict.violations {
            println!("  - {}", violation);
        }
    }

    if outcome.success {
        println!("\n✓ Build completed successfully!");
        Ok(())
    } else {
        anyhow::bail!("Build completed with errors")
    }
}

async fn cmd_unit(config: &BuildConfig, file: &Path) -> Result<()> {
    let result = BuildPipeline::run_unit(config, Arc::new(ProcessExecutor), file)
        .await
        .with_context(|| format!("Failed to process {}", file.display()))?;

    print_unit(&result);

    if result.success {
        Ok(())
    } else {
        anyhow::bail!("{} failed", result.id.label())
    }
}

fn print_outcome(outcome: &BuildOutcome) {
    println!("Build ID: {}", outcome.build_id);
    println!("Status: {}", if outcome.success { "✓ PASSED" } else { "✗ FAILED" });
    println!("Duration: {}ms", outcome.duration_ms);
    println!();

    for result in &outcome.results {
        print_unit(result);
    }

    println!();
    println!(
        "Summary: {}/{} units succeeded",
        outcome.successful_units(),
        outcome.results.len()
    );
    if let Some(archive) = &outcome.archive {
        println!("Archive: {} ({} files)", archive.path.display(), archive.members.len());
    }
    if let Some(path) = &outcome.summary_path {
        println!("Build summary: {}", path.display());
    }
    match &outcome.hypertext {
        HypertextStatus::Skipped => {}
        HypertextStatus::Succeeded => println!("Hypertext: ✓ generated"),
        HypertextStatus::Failed { exit_code, stderr } => {
            println!("Hypertext: ✗ failed (exit code {})", exit_code);
            if !stderr.trim().is_empty() {
                println!("{}", stderr.trim_end());
            }
        }
    }
}

fn print_unit(result: &BuildResult) {
    let status = if result.success { "✓" } else { "✗" };
    let title = result.title.as_deref().unwrap_or("");
    let mut line = format!("  {} {}", status, result.id.label());
    if !title.is_empty() {
        line.push_str(&format!(": {}", title));
    }
    if let Some(error) = &result.error {
        line.push_str(&format!(" (error: {})", error));
    } else if result.outcomes.is_some() {
        line.push_str(&format!(
            " ({}/{} examples passed",
            result.passed_count(),
            result.passed_count() + result.failed_count()
        ));
        if result.skipped_count() > 0 {
            line.push_str(&format!(", {} skipped", result.skipped_count()));
        }
        line.push(')');
    }
    println!("{}", line);
}
