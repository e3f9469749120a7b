mod common;
mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use common::scenario::{expand_scenarios, get_scenario, list_scenarios};
use common::{JsonPlayerStorage, split_csv};
use logic::{Execution, LogicTester, ScenarioResult, SessionRunner, resolve_seed_inputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestMode {
    /// Tick sessions in a tight loop (fast)
    Logic,
    /// Drive sessions through the real-time scheduler
    Realtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "derby-tester", version)]
#[command(about = "Automated QA runner for Derby - seeded race sessions and betting policies")]
struct Args {
    /// Execution mode: logic (fast) or realtime (scheduler driven)
    #[arg(long, value_enum, default_value_t = TestMode::Logic)]
    mode: TestMode,

    /// Scenarios to run (comma-separated, `all` for the whole catalog)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Tick period in milliseconds for realtime mode
    #[arg(long, default_value_t = 5)]
    tick_ms: u64,

    /// Directory to persist final player records as JSON
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

impl Args {
    fn execution(&self) -> Execution {
        match self.mode {
            TestMode::Logic => Execution::Logic,
            TestMode::Realtime => Execution::Realtime {
                period: Duration::from_millis(self.tick_ms.max(1)),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(split_csv(&args.scenarios));
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let storage = match &args.save_dir {
        Some(dir) => JsonPlayerStorage::new(dir)
            .with_context(|| format!("preparing save directory {}", dir.display()))?,
        None => JsonPlayerStorage::disabled(),
    };
    let tester = LogicTester::new(SessionRunner::new(storage), args.verbose);

    let results = run_scenarios(&args, &scenarios, &seeds, &tester).await;

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:20} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🏇 Derby Automated Tester".bright_cyan().bold());
    println!("{}", "==========================".cyan());
}

async fn run_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    tester: &LogicTester,
) -> Vec<ScenarioResult> {
    let execution = args.execution();
    let heading = match execution {
        Execution::Logic => "🧠 Running Logic Tests",
        Execution::Realtime { .. } => "⏱️  Running Realtime Tests",
    };
    println!("{}", heading.bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut results = Vec::new();
    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(
                tester
                    .run_scenario(&scenario, seeds, args.iterations, execution)
                    .await,
            );
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }
    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => logic::reports::generate_json_report(&mut output_target, results)?,
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Derby Race Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        ReportFormat::Csv => logic::reports::generate_csv_report(&mut output_target, results)?,
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "derby-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn base_args() -> Args {
        Args::parse_from(["derby-tester"])
    }

    #[test]
    fn defaults_match_documented_flags() {
        let args = base_args();
        assert_eq!(args.mode, TestMode::Logic);
        assert_eq!(args.scenarios, "smoke");
        assert_eq!(args.seeds, "1337");
        assert_eq!(args.iterations, 10);
        assert_eq!(args.report, ReportFormat::Console);
        assert_eq!(args.execution(), Execution::Logic);
    }

    #[test]
    fn realtime_mode_uses_tick_ms() {
        let args = Args::parse_from(["derby-tester", "--mode", "realtime", "--tick-ms", "0"]);
        assert_eq!(
            args.execution(),
            Execution::Realtime {
                period: Duration::from_millis(1)
            }
        );
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let path = temp_path("list");
        let mut args = base_args();
        args.list_scenarios = true;
        args.output = Some(path.clone());
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("favorite-ledger"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[tokio::test]
    async fn run_scenarios_skips_unknown_names() {
        let mut args = base_args();
        args.iterations = 1;
        let tester = LogicTester::new(SessionRunner::ephemeral(), false);
        let scenarios = vec!["nope".to_string(), "smoke".to_string()];
        let results = run_scenarios(&args, &scenarios, &[7], &tester).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
    }

    #[test]
    fn write_reports_emits_csv_for_empty_results() {
        let path = temp_path("csv");
        let mut args = base_args();
        args.report = ReportFormat::Csv;
        args.output = Some(path.clone());
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("scenario,seed,mode"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let path = temp_path("md");
        let mut args = base_args();
        args.report = ReportFormat::Markdown;
        args.output = Some(path.clone());
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("_No scenarios executed._"));
        std::fs::remove_file(path).ok();
    }
}
