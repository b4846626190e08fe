//! Integration tests for the build pipeline with a fake interpreter.

use async_trait::async_trait;
use bookwright_build::{
    BuildConfig, BuildGate, BuildPipeline, ExampleExecutor, Execution, HypertextStatus, ProcessExecutor,
    ValidationResult,
};
use bookwright_core::Invocation;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Evaluates a tiny script language: `{"op": "add", "args": [..]}` sums its
/// arguments, `{"op": "input"}` echoes the input document, `{"op": "slow"}`
/// times out, `{"op": "crash"}` panics, anything else exits 1.
#[derive(Default)]
struct FakeInterpreter {
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl ExampleExecutor for FakeInterpreter {
    async fn execute(&self, invocation: &Invocation, limit: Duration) -> std::io::Result<Execution> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;

        let script: Value = serde_json::from_str(&std::fs::read_to_string(&invocation.script)?)?;
        let input = match &invocation.input {
            Some(path) => std::fs::read_to_string(path)?,
            None => "null".to_string(),
        };

        let execution = match script["op"].as_str() {
            Some("add") => {
                let sum: i64 = script["args"]
                    .as_array()
                    .map(|args| args.iter().filter_map(Value::as_i64).sum())
                    .unwrap_or(0);
                completed(0, &sum.to_string(), "")
            }
            Some("input") => completed(0, &input, ""),
            Some("slow") => Execution::TimedOut { limit },
            Some("crash") => panic!("interpreter crashed"),
            Some(other) => completed(1, "", &format!("unknown operator: {}", other)),
            None => completed(1, "", "missing op"),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(execution)
    }
}

fn completed(exit_code: i32, stdout: &str, stderr: &str) -> Execution {
    Execution::Completed {
        exit_code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        duration_ms: 1,
    }
}

fn chapter(number: u32, title: &str, examples: &str) -> String {
    format!(
        "[chapter]\nnumber = {}\ntitle = \"{}\"\n\n[chapter.learning_objectives]\nsummary = \"Objectives.\"\n\n{}",
        number, title, examples
    )
}

fn appendix(letter: &str, title: &str, examples: &str) -> String {
    format!("[appendix]\nletter = \"{}\"\ntitle = \"{}\"\n\n{}", letter, title, examples)
}

fn example(name: &str, script: &str, expected: Option<&str>) -> String {
    let mut toml = format!(
        "[[examples]]\nname = \"{}\"\ndescription = \"{} example\"\nscript = '{}'\n",
        name, name, script
    );
    if let Some(expected) = expected {
        toml.push_str(&format!("expected = {}\n", expected));
    }
    toml.push('\n');
    toml
}

const ADD_TWO: &str = r#"{"op": "add", "args": [1, 2]}"#;
const BAD_OP: &str = r#"{"op": "frobnicate"}"#;
const CRASH: &str = r#"{"op": "crash"}"#;

struct Book {
    dir: TempDir,
}

impl Book {
    fn new(files: &[(&str, String)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        for (name, contents) in files {
            std::fs::write(dir.path().join("src").join(name), contents).unwrap();
        }
        Self { dir }
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn config(&self) -> BuildConfig {
        BuildConfig::new(self.dir.path().join("src"), self.out())
            .with_validation(true)
            .without_hypertext()
    }

    fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.out().join(relative)).unwrap()
    }
}

fn example_dirs(section_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(section_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_passing_and_failing_example() {
    let examples = example("add_two", ADD_TWO, Some("3")) + &example("bad_op", BAD_OP, Some("0"));
    let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);

    let outcome = BuildPipeline::run(&book.config(), Arc::new(FakeInterpreter::default()))
        .await
        .expect("build failed to run");

    assert!(!outcome.success);
    assert_eq!(outcome.exit_code(), 1);

    let unit = &outcome.results[0];
    assert!(!unit.success);
    assert!(unit.error.is_none());
    assert_eq!(unit.passed_count(), 1);
    assert_eq!(unit.failed_count(), 1);

    let outcomes = unit.outcomes.as_ref().unwrap();
    assert!(outcomes[0].passed());
    match outcomes[1].result.as_ref().unwrap() {
        ValidationResult::ProcessFailure { exit_code, stderr, .. } => {
            assert_eq!(*exit_code, 1);
            assert!(stderr.contains("unknown operator"));
        }
        other => panic!("unexpected {:?}", other),
    }

    let report = book.read("ch01_test_report.md");
    assert!(report.contains("- **Total Examples**: 2\n"));
    assert!(report.contains("### bad_op"));
    assert!(report.contains("unknown operator: frobnicate"));

    // Packaging does not depend on validation.
    let section = book.out().join("code/ch01_intro/general");
    assert_eq!(example_dirs(&section), vec!["add_two", "bad_op"]);
    assert!(book.out().join("code/ch01_intro_examples.zip").exists());
    assert!(book.out().join("01_intro.md").exists());

    let summary = book.read("build_summary.md");
    assert!(summary.contains("- **FAIL** Chapter 1: Intro - Examples: 1/2\n"));

    let verdict = BuildGate::evaluate(&outcome);
    assert_eq!(verdict.violations, vec!["Chapter 1 has 1 failing example(s)".to_string()]);
}

#[tokio::test]
async fn test_one_mismatch_among_many() {
    let mut examples = String::new();
    for i in 0..4 {
        let expected = if i == 2 { "99" } else { "3" };
        examples.push_str(&example(&format!("sum_{}", i), ADD_TWO, Some(expected)));
    }
    let book = Book::new(&[("ch03_sums.toml", chapter(3, "Sums", &examples))]);

    let outcome = BuildPipeline::run(&book.config(), Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    let unit = &outcome.results[0];
    let outcomes = unit.outcomes.as_ref().unwrap();
    assert_eq!(outcomes.len(), 4);
    assert_eq!(unit.failed_count(), 1);
    assert_eq!(unit.passed_count(), 3);
    assert_eq!(unit.passed_count() + unit.failed_count(), outcomes.len());
    assert_eq!(outcomes[2].result.as_ref().unwrap().kind(), "mismatch");

    assert_eq!(example_dirs(&book.out().join("code/ch03_sums/general")).len(), 4);
    let report = book.read("ch03_test_report.md");
    assert!(report.contains("**Expected**: `99`"));
    assert!(report.contains("**Actual**: `3`"));
}

#[tokio::test]
async fn test_units_ordered_chapters_then_appendices() {
    let ex = example("add_two", ADD_TWO, Some("3"));
    let book = Book::new(&[
        ("ch02_second.toml", chapter(2, "Second", &ex)),
        ("appendix_b_more.toml", appendix("B", "More", &ex)),
        ("ch01_first.toml", chapter(1, "First", &ex)),
        ("appendix_a_extra.toml", appendix("a", "Extra", &ex)),
        ("notes.toml", chapter(9, "Ignored", &ex)),
    ]);

    let outcome = BuildPipeline::run(&book.config(), Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    let labels: Vec<String> = outcome.results.iter().map(|r| r.id.label()).collect();
    assert_eq!(labels, vec!["Chapter 1", "Chapter 2", "Appendix A", "Appendix B"]);
    assert!(outcome.success);
    assert_eq!(outcome.exit_code(), 0);

    let summary = book.read("build_summary.md");
    let positions: Vec<usize> = ["Chapter 1:", "Chapter 2:", "Appendix A:", "Appendix B:"]
        .iter()
        .map(|label| summary.find(label).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(summary.contains("- **Total Examples**: 4\n"));

    assert!(book.out().join("appendix_a_extra.md").exists());
    assert!(book.out().join("appendix_a_test_report.md").exists());
    assert!(book.out().join("code/appendix_b_more/general/add_two/run.sh").exists());
}

#[tokio::test]
async fn test_no_units_is_an_error() {
    let book = Book::new(&[("readme.txt", "nothing here".to_string())]);
    let executor = Arc::new(FakeInterpreter::default());

    let result = BuildPipeline::run(&book.config(), executor.clone()).await;
    assert!(result.is_err());
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert!(!book.out().join("build_summary.md").exists());
}

#[tokio::test]
async fn test_broken_unit_does_not_stop_build() {
    let ex = example("add_two", ADD_TWO, Some("3"));
    let book = Book::new(&[
        ("ch01_ok.toml", chapter(1, "Ok", &ex)),
        ("ch02_broken.toml", "[chapter\nnumber = ".to_string()),
        ("ch03_ok.toml", chapter(3, "Also Ok", &ex)),
    ]);

    let outcome = BuildPipeline::run(&book.config(), Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.results[0].success);
    assert!(outcome.results[2].success);

    let broken = &outcome.results[1];
    assert!(!broken.success);
    assert_eq!(broken.id.label(), "ch02_broken");
    assert!(broken.error.is_some());
    assert!(broken.outcomes.is_none());
    assert!(!outcome.success);

    let summary = book.read("build_summary.md");
    assert!(summary.contains("- **Successful**: 2\n"));
    assert!(summary.contains("- **FAIL** ch02_broken - Error:"));

    let archive = outcome.archive.as_ref().unwrap();
    assert!(archive.members.iter().all(|m| !m.contains("broken")));
    assert!(archive.members.contains(&"code/ch03_also_ok/general/add_two/script.json".to_string()));
}

#[tokio::test]
async fn test_packaging_failure_fails_only_that_unit() {
    let ex = example("add_two", ADD_TWO, Some("3"));
    let book = Book::new(&[
        ("ch01_intro.toml", chapter(1, "Intro", &ex)),
        ("ch02_next.toml", chapter(2, "Next", &ex)),
    ]);
    // A plain file where the unit's example directory belongs.
    std::fs::create_dir_all(book.out().join("code")).unwrap();
    std::fs::write(book.out().join("code/ch01_intro"), "not a directory").unwrap();

    let outcome = BuildPipeline::run(&book.config(), Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    assert!(!outcome.success);
    let blocked = &outcome.results[0];
    assert!(!blocked.success);
    assert_eq!(blocked.title.as_deref(), Some("Intro"));
    assert!(blocked.error.as_ref().unwrap().contains("ch01_intro"));
    assert!(blocked.archive.is_none());
    // Validation already ran, so its outcomes are kept.
    assert_eq!(blocked.outcomes.as_ref().unwrap().len(), 1);
    assert_eq!(blocked.passed_count(), 1);

    assert!(outcome.results[1].success);
    assert!(book.out().join("code/ch02_next/general/add_two/run.sh").exists());

    let summary = book.read("build_summary.md");
    assert!(summary.contains("- **FAIL** Chapter 1: Intro - Error: failed to write "));
    assert!(summary.contains("- **PASS** Chapter 2: Next - Examples: 1/1\n"));
}

#[tokio::test]
async fn test_colliding_example_names_fail_the_unit() {
    let examples = example("Add Two", ADD_TWO, Some("3")) + &example("add_two", ADD_TWO, Some("3"));
    let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);

    let outcome = BuildPipeline::run(&book.config(), Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    let unit = &outcome.results[0];
    assert!(!unit.success);
    assert!(unit.error.as_ref().unwrap().starts_with("two examples share directory"));
    assert!(!book.out().join("code/ch01_intro").exists());
}

#[tokio::test]
async fn test_panicking_unit_does_not_stop_build() {
    let ok = example("add_two", ADD_TWO, Some("3"));
    let book = Book::new(&[
        ("ch01_ok.toml", chapter(1, "Ok", &ok)),
        ("ch02_crash.toml", chapter(2, "Crash", &example("boom", CRASH, Some("0")))),
        ("ch03_ok.toml", chapter(3, "Also Ok", &ok)),
    ]);

    let outcome = BuildPipeline::run(&book.config().with_jobs(2), Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.results[0].success);
    assert!(outcome.results[2].success);

    let crashed = &outcome.results[1];
    assert!(!crashed.success);
    assert_eq!(crashed.id.label(), "ch02_crash");
    assert!(crashed.error.as_ref().unwrap().starts_with("unit task failed: "));
    assert!(crashed.outcomes.is_none());

    let summary = book.read("build_summary.md");
    assert!(summary.contains("- **FAIL** ch02_crash - Error: unit task failed"));
}

#[tokio::test]
async fn test_rebuild_is_reproducible() {
    let examples = example("add_two", ADD_TWO, Some("3"))
        + &example("echo", r#"{"op": "input"}"#, Some("{ b = [1, 2], a = 1 }"))
        + "input = { a = 1, b = [1, 2] }\n";
    let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);
    let config = book.config();

    let first = BuildPipeline::run(&config, Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();
    let page = book.read("01_intro.md");
    let report = book.read("ch01_test_report.md");
    let summary = book.read("build_summary.md");

    let second = BuildPipeline::run(&config, Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    assert!(first.success);
    assert_ne!(first.build_id, second.build_id);
    assert_eq!(book.read("01_intro.md"), page);
    assert_eq!(book.read("ch01_test_report.md"), report);
    assert_eq!(book.read("build_summary.md"), summary);
    assert_eq!(first.archive, second.archive);
    assert_eq!(first.results[0].archive, second.results[0].archive);
}

#[tokio::test]
async fn test_without_validation() {
    let examples = example("bad_op", BAD_OP, Some("0"));
    let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);
    let executor = Arc::new(FakeInterpreter::default());

    let outcome = BuildPipeline::run(&book.config().with_validation(false), executor.clone())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert!(!book.out().join("ch01_test_report.md").exists());
    assert!(!book.read("build_summary.md").contains("## Example Validation"));
    assert!(book.out().join("code/ch01_intro/general/bad_op/expected.json").exists());
}

#[tokio::test]
async fn test_unverifiable_examples_are_skipped() {
    let examples = example("add_two", ADD_TWO, Some("3")) + &example("explore", BAD_OP, None);
    let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);
    let executor = Arc::new(FakeInterpreter::default());

    let outcome = BuildPipeline::run(&book.config(), executor.clone()).await.unwrap();

    assert!(outcome.success);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.results[0].skipped_count(), 1);
    assert!(!book
        .out()
        .join("code/ch01_intro/general/explore/expected.json")
        .exists());
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let examples = example("slow", r#"{"op": "slow"}"#, Some("1"));
    let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);

    let outcome = BuildPipeline::run(&book.config(), Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    let result = outcome.results[0].outcomes.as_ref().unwrap()[0].result.clone().unwrap();
    assert_eq!(result.kind(), "timeout");
    assert!(book.read("ch01_test_report.md").contains("timed out after 30 seconds"));
}

#[tokio::test]
async fn test_single_job_is_sequential() {
    let ex = example("a", ADD_TWO, Some("3")) + &example("b", ADD_TWO, Some("3"));
    let files: Vec<(String, String)> = (1..=4)
        .map(|n| (format!("ch{:02}_unit.toml", n), chapter(n, "Unit", &ex)))
        .collect();
    let files: Vec<(&str, String)> = files.iter().map(|(n, c)| (n.as_str(), c.clone())).collect();
    let book = Book::new(&files);

    let executor = Arc::new(FakeInterpreter::default());
    BuildPipeline::run(&book.config().with_jobs(1), executor.clone())
        .await
        .unwrap();
    assert_eq!(executor.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_jobs_keep_discovery_order() {
    let ex = example("a", ADD_TWO, Some("3"));
    let files: Vec<(String, String)> = (1..=6)
        .map(|n| (format!("ch{:02}_unit.toml", n), chapter(n, &format!("Unit {}", n), &ex)))
        .collect();
    let files: Vec<(&str, String)> = files.iter().map(|(n, c)| (n.as_str(), c.clone())).collect();
    let book = Book::new(&files);

    let executor = Arc::new(FakeInterpreter::default());
    let outcome = BuildPipeline::run(&book.config().with_jobs(3), executor.clone())
        .await
        .unwrap();

    let labels: Vec<String> = outcome.results.iter().map(|r| r.id.label()).collect();
    let expected: Vec<String> = (1..=6).map(|n| format!("Chapter {}", n)).collect();
    assert_eq!(labels, expected);
    assert!(executor.max_active.load(Ordering::SeqCst) <= 3);
    assert!(outcome.success);
}

#[tokio::test]
async fn test_hypertext_failure_fails_build() {
    let ex = example("add_two", ADD_TWO, Some("3"));
    let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &ex))]);
    let mut config = book.config();
    config.hypertext = true;
    config.hypertext_command = vec!["bookwright-no-such-converter".to_string()];

    let outcome = BuildPipeline::run(&config, Arc::new(FakeInterpreter::default()))
        .await
        .unwrap();

    assert!(outcome.results[0].success);
    assert!(matches!(outcome.hypertext, HypertextStatus::Failed { .. }));
    assert!(!outcome.success);
    assert!(book.out().join("build_summary.md").exists());
}

#[tokio::test]
async fn test_run_single_unit() {
    let examples = example("add_two", ADD_TWO, Some("3"));
    let book = Book::new(&[("ch05_solo.toml", chapter(5, "Solo", &examples))]);

    let result = BuildPipeline::run_unit(
        &book.config(),
        Arc::new(FakeInterpreter::default()),
        &book.dir.path().join("src/ch05_solo.toml"),
    )
    .await
    .unwrap();

    assert!(result.success);
    assert!(book.out().join("05_solo.md").exists());
    assert!(book.out().join("ch05_test_report.md").exists());
    assert!(!book.out().join("build_summary.md").exists());
    assert!(!book.out().join("download_all_examples.zip").exists());
}

#[cfg(unix)]
mod real_process {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Writes an executable shell script standing in for the interpreter.
    fn interpreter(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-interpreter");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_script_interpreter_round_trip() {
        // Prints the script back, so the expected output is the script itself.
        let examples = example("identity", r#"{"a": [1, 2]}"#, Some("{ a = [1, 2] }"));
        let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);
        let program = interpreter(book.dir.path(), "cat \"$1\"");

        let config = book.config().with_interpreter(program);
        let outcome = BuildPipeline::run(&config, Arc::new(ProcessExecutor)).await.unwrap();

        assert!(outcome.success, "{:?}", outcome.results[0].outcomes);
        // Runners name the interpreter by file name only.
        let sh = book.read("code/ch01_intro/general/identity/run.sh");
        assert!(sh.contains("\nfake-interpreter script.json\n"));
    }

    #[tokio::test]
    async fn test_hung_interpreter_times_out() {
        let examples = example("hang", ADD_TWO, Some("3"));
        let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);
        let program = interpreter(book.dir.path(), "exec sleep 10");

        let config = book.config().with_interpreter(program).with_timeout_secs(1);
        let start = std::time::Instant::now();
        let outcome = BuildPipeline::run(&config, Arc::new(ProcessExecutor)).await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(8));
        let result = outcome.results[0].outcomes.as_ref().unwrap()[0].result.clone().unwrap();
        assert!(matches!(result, ValidationResult::Timeout { .. }));
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_missing_interpreter_fails_each_example() {
        let examples = example("a", ADD_TWO, Some("3")) + &example("b", ADD_TWO, Some("3"));
        let book = Book::new(&[("ch01_intro.toml", chapter(1, "Intro", &examples))]);

        let config = book.config().with_interpreter("/nonexistent/computo");
        let outcome = BuildPipeline::run(&config, Arc::new(ProcessExecutor)).await.unwrap();

        let unit = &outcome.results[0];
        assert_eq!(unit.failed_count(), 2);
        for outcome in unit.outcomes.as_ref().unwrap() {
            assert!(matches!(
                outcome.result,
                Some(ValidationResult::ProcessFailure { exit_code: -1, .. })
            ));
        }
        assert!(book.out().join("code/ch01_intro/general/b/run.bat").exists());
    }
}
