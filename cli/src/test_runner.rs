use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::time::Instant;

use interpreter::{Interpreter, RecordingChannel, RunError, RunReport, Timing};

/// The `[scenario]` table of a `.test.toml` file. The program itself is the
/// `[[blocks]]` array of the same file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Run against a channel that reports itself disconnected.
    #[serde(default)]
    pub disconnected: bool,

    /// Cancel the run once this many commands have been published.
    #[serde(default)]
    pub cancel_after: Option<usize>,

    /// Timing overrides. Missing fields keep their defaults.
    #[serde(default)]
    pub timing: Timing,

    /// Exact published commands, in their display form (`arm:wave`,
    /// `drive:0.20,0.00`).
    #[serde(default)]
    pub expect_commands: Option<Vec<String>>,

    #[serde(default)]
    pub expect_count: Option<usize>,

    /// `completed` or `cancelled`.
    #[serde(default)]
    pub expect_outcome: Option<String>,

    #[serde(default)]
    pub expect_interlocks: Option<usize>,

    /// Simulated wall time from start to finish.
    #[serde(default)]
    pub expect_elapsed_ms: Option<u64>,

    #[serde(default)]
    pub elapsed_tolerance_ms: Option<u64>,

    /// The run must fail to start with an error containing this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If true, the program is expected to be rejected by the parser.
    #[serde(default)]
    pub expect_parse_error: bool,
}

const DEFAULT_TOLERANCE_MS: u64 = 10;
const SCENARIO_SUFFIX: &str = ".test.toml";

#[derive(Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    scenario: Scenario,
}

fn parse_scenario(content: &str) -> Result<Scenario, String> {
    toml::from_str::<ScenarioFile>(content)
        .map(|file| file.scenario)
        .map_err(|e| format!("scenario error: {}", e.message()))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(SCENARIO_SUFFIX))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match evaluate(path) {
        Ok((description, None)) => (description, TestOutcome::Pass),
        Ok((description, Some(reason))) => (description, TestOutcome::Fail(reason)),
        Err(reason) => (None, TestOutcome::Fail(reason)),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Returns the description and the first failed expectation, if any.
fn evaluate(path: &Path) -> Result<(Option<String>, Option<String>), String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read file: {}", e))?;
    let scenario = parse_scenario(&content)?;
    let description = scenario.description.clone();

    let parse_result = botblocks::parser::Parser::new(content, 0).parse();
    if scenario.expect_parse_error {
        let failure = match parse_result {
            Err(_) => None,
            Ok(_) => Some("expected parse error, but parsing succeeded".to_string()),
        };
        return Ok((description, failure));
    }
    let program = match parse_result {
        Ok(p) => p,
        Err(e) => return Ok((description, Some(format!("unexpected parse error: {}", e)))),
    };

    scenario
        .timing
        .validate()
        .map_err(|e| format!("scenario error: {}", e))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|e| format!("cannot start runtime: {}", e))?;

    let channel = Arc::new(RecordingChannel::with_connection(!scenario.disconnected));
    let interpreter = Interpreter::new(channel.clone()).with_timing(scenario.timing.clone());

    let result = runtime.block_on(async {
        let start = Instant::now();
        let handle = interpreter.run(&program)?;
        if let Some(count) = scenario.cancel_after {
            channel.cancel_after(count, handle.cancellation_token());
        }
        let report = handle.wait().await?;
        Ok::<_, RunError>((report, start.elapsed().as_millis() as u64))
    });

    let commands: Vec<String> = channel.commands().iter().map(|c| c.to_string()).collect();
    Ok((description, check_run(&scenario, result, &commands)))
}

fn check_run(
    scenario: &Scenario,
    result: Result<(RunReport, u64), RunError>,
    commands: &[String],
) -> Option<String> {
    let (report, elapsed_ms) = match (&scenario.expect_error, result) {
        (Some(expected), Err(e)) => {
            let message = e.to_string();
            return if message.contains(expected.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected, message
                ))
            };
        }
        (Some(expected), Ok(_)) => {
            return Some(format!(
                "expected error containing \"{}\", but the run started",
                expected
            ));
        }
        (None, Err(e)) => return Some(format!("unexpected run error: {}", e)),
        (None, Ok(pair)) => pair,
    };

    if let Some(expected) = &scenario.expect_commands {
        if expected.as_slice() != commands {
            return Some(format!(
                "command mismatch\n  expected: [{}]\n  actual:   [{}]",
                expected.join(", "),
                commands.join(", ")
            ));
        }
    }

    if let Some(expected) = scenario.expect_count {
        if expected != commands.len() {
            return Some(format!(
                "expected {} command(s), got {}",
                expected,
                commands.len()
            ));
        }
    }

    if let Some(expected) = &scenario.expect_outcome {
        if *expected != report.outcome.to_string() {
            return Some(format!(
                "expected outcome {}, got {}",
                expected, report.outcome
            ));
        }
    }

    if let Some(expected) = scenario.expect_interlocks {
        if expected != report.interlocks {
            return Some(format!(
                "expected {} safety interlock(s), got {}",
                expected, report.interlocks
            ));
        }
    }

    if let Some(expected) = scenario.expect_elapsed_ms {
        let tolerance = scenario.elapsed_tolerance_ms.unwrap_or(DEFAULT_TOLERANCE_MS);
        if expected.abs_diff(elapsed_ms) > tolerance {
            return Some(format!(
                "expected to finish after {}ms (±{}ms), took {}ms",
                expected, tolerance, elapsed_ms
            ));
        }
    }

    None
}

/// Discover scenario files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(SCENARIO_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", SCENARIO_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

fn paint(s: &str, code: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, s)
    }
}

fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }
    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = selected.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&prefix) {
                selected.insert(cat.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

/// Run every scenario under `path` (or a single file).
/// If `categories` is non-empty, only scenarios in those categories run.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let groups: Vec<(Option<String>, Vec<PathBuf>)> = if path.is_file() {
        vec![(None, vec![path.to_path_buf()])]
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", SCENARIO_SUFFIX, path.display());
            return 1;
        }
        let selected = select_categories(&all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
            .into_iter()
            .map(|(cat, files)| (Some(category_label(cat).to_string()), files.to_vec()))
            .collect()
    };

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (header, files) in &groups {
        if let Some(header) = header {
            eprintln!();
            eprintln!("{}", paint(header, "1", no_color));
        }
        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", "32", no_color),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
