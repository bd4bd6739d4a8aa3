//! Command-line interface for codewatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::ProgressBar;

use crate::config::WatchConfig;
use crate::detect::{Finding, Severity};
use crate::engine::{AnalysisEngine, AnalysisResult, HealthState, Summary};
use crate::logging::TracingLog;
use crate::monitor::Monitor;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Starter configuration written by `codewatch init`.
const STARTER_CONFIG: &str = r#"# codewatch configuration

max_line_length: 88
max_complexity: 10

# Directory names skipped during the walk
excluded_dirs:
  - .git
  - __pycache__
  - .mypy_cache
  - node_modules
  - venv
  - .venv
  - target

# Only files with these extensions are analyzed
file_extensions:
  - py

# Glob patterns (relative to the project root) to exclude
exclude_patterns: []

# Seconds between scans in monitor mode
scan_interval: 30

analysis:
  syntax_check: true
  code_quality: true
  performance: true
  # Flag possibly undefined names and attribute access on None
  runtime_checks: false

reports:
  dir: reports
  keep_count: 10
"#;

/// Static analysis and continuous monitoring for Python projects.
///
/// Codewatch scans a source tree for syntax errors, code quality problems,
/// and common performance pitfalls, and can keep watching on an interval.
/// Every run is persisted as a timestamped JSON report.
#[derive(Parser)]
#[command(name = "codewatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the project once and print the findings
    Scan(ScanArgs),
    /// Re-analyze the project on an interval until interrupted
    Monitor(MonitorArgs),
    /// Run an analysis and print where the report was stored
    Report(ReportArgs),
    /// Show engine health and the latest stored report
    Status(StatusArgs),
    /// Write a starter codewatch.yaml
    Init(InitArgs),
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Project root to analyze
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Path to configuration YAML (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Emit the raw analysis result as JSON
    #[arg(long)]
    pub json: bool,

    /// Only print the final status line
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the monitor command.
#[derive(Parser)]
pub struct MonitorArgs {
    /// Project root to watch
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Path to configuration YAML (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seconds between scans (default: scan_interval from the config)
    #[arg(short, long)]
    pub interval: Option<u64>,
}

/// Arguments for the report command.
#[derive(Parser)]
pub struct ReportArgs {
    /// Project root to analyze
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Path to configuration YAML (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the status command.
#[derive(Parser)]
pub struct StatusArgs {
    /// Project root to inspect
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Path to configuration YAML (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "codewatch.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Resolve the root, load the config, and assemble an engine.
fn build_engine(path: &Path, config: Option<&Path>) -> anyhow::Result<AnalysisEngine> {
    let root = path
        .canonicalize()
        .with_context(|| format!("cannot access path {:?}", path))?;
    let config = WatchConfig::load(config, &root)?;
    AnalysisEngine::new(root, config, Arc::new(TracingLog))
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    let engine = match build_engine(&args.path, args.config.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let spinner = (!args.json && !args.quiet).then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("analyzing {}", engine.root().display()));
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    });

    let result = engine.run_once();

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if args.quiet {
        print_verdict(&result.summary);
    } else {
        print_result(&engine, &result);
    }

    if result.summary.critical_issues > 0 {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the monitor command. Blocks until Ctrl-C.
pub fn run_monitor(args: &MonitorArgs) -> anyhow::Result<i32> {
    let engine = match build_engine(&args.path, args.config.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let interval = match args.interval {
        Some(0) => {
            eprintln!("Error: --interval must be at least 1 second");
            return Ok(EXIT_ERROR);
        }
        Some(secs) => Duration::from_secs(secs),
        None => engine.config().interval(),
    };

    let engine = Arc::new(engine);
    let monitor = Monitor::new(Arc::clone(&engine), Arc::new(TracingLog));

    println!(
        "Watching {} every {}s (press Ctrl-C to stop)",
        engine.root().display(),
        interval.as_secs()
    );
    monitor.start(interval);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let _ = tokio::signal::ctrl_c().await;
    });

    println!();
    monitor.stop();

    let stats = engine.statistics();
    let watched = stats
        .uptime()
        .map(|d| format!(" over {}s", d.num_seconds()))
        .unwrap_or_default();
    println!(
        "Stopped after {} scan(s){}: {} error(s), {} warning(s), {} performance issue(s)",
        stats.scans_completed,
        watched,
        stats.errors_detected,
        stats.warnings_detected,
        stats.performance_issues_detected
    );

    Ok(EXIT_SUCCESS)
}

/// Run the report command.
pub fn run_report(args: &ReportArgs) -> anyhow::Result<i32> {
    let engine = match build_engine(&args.path, args.config.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let result = engine.run_once();

    let handle = match engine.reports().latest() {
        Some(handle) => handle,
        None => {
            eprintln!("Error: analysis finished but no report was stored");
            return Ok(EXIT_ERROR);
        }
    };

    println!();
    print!("  {}", "Report: ".dimmed());
    println!("{}", handle.path.display());
    print!("  {}", "Files analyzed: ".dimmed());
    println!("{}", result.summary.files_analyzed);
    println!();
    print_verdict(&result.summary);

    Ok(EXIT_SUCCESS)
}

/// Run the status command.
pub fn run_status(args: &StatusArgs) -> anyhow::Result<i32> {
    let engine = match build_engine(&args.path, args.config.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let health = engine.health();
    println!();
    print!("  {}", "Status: ".dimmed());
    match health.status {
        HealthState::Healthy => println!("{}", "HEALTHY".green()),
        HealthState::IssuesDetected => println!("{}", "ISSUES_DETECTED".red()),
    }
    print!("  {}", "Monitoring: ".dimmed());
    println!(
        "{}",
        if health.monitoring_active {
            "active"
        } else {
            "inactive"
        }
    );

    match engine.reports().latest() {
        Some(handle) => {
            print!("  {}", "Latest report: ".dimmed());
            println!("{}", handle.path.display());
            if let Ok(document) = engine.reports().load(&handle) {
                print!("  {}", "Generated: ".dimmed());
                println!(
                    "{}",
                    document.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
                print!("  {}", "Last results: ".dimmed());
                println!(
                    "{} error(s), {} warning(s), {} performance issue(s)",
                    document.summary.total_errors,
                    document.summary.total_warnings,
                    document.summary.total_performance_issues
                );
            }
        }
        None => {
            println!("  {}", "No stored reports".dimmed());
        }
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite it");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, STARTER_CONFIG) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to fit your project", args.output.display());
    println!("  2. Run: codewatch scan --path .");

    Ok(EXIT_SUCCESS)
}

fn print_result(engine: &AnalysisEngine, result: &AnalysisResult) {
    println!();
    print!("{}", "codewatch".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Project: ".dimmed());
    println!("{}", engine.root().display());
    print!("  {}", "Files analyzed: ".dimmed());
    println!("{}", result.summary.files_analyzed);
    print!("  {}", "Structure: ".dimmed());
    println!(
        "{} file(s), {} line(s), {} over 500 lines",
        result.structure.total_files,
        result.structure.total_lines,
        result.structure.large_files.len()
    );
    for dir in &result.structure.missing_init_dirs {
        println!("    {}", format!("missing __init__.py: {}", dir).dimmed());
    }
    println!();

    print_findings("Errors", &result.errors);
    print_findings("Warnings", &result.warnings);
    print_findings("Performance", &result.performance_issues);

    if !result.summary.recommendations.is_empty() {
        println!("  {}", "Recommendations:".bold());
        for recommendation in &result.summary.recommendations {
            println!("    - {}", recommendation);
        }
        println!();
    }

    print_verdict(&result.summary);
}

fn print_findings(label: &str, findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }

    println!("  {} ({}):", label.bold(), findings.len());
    println!();

    for finding in findings {
        print_severity(finding.severity);
        print!("{}", format!("{:<22}", finding.kind.as_str()).dimmed());
        print!("{}", finding.file);
        if finding.line > 0 {
            print!("{}", format!(":{}", finding.line).dimmed());
            if let Some(column) = finding.column {
                print!("{}", format!(":{}", column).dimmed());
            }
        }
        println!();
        println!("            {}", finding.message);
        if let Some(suggestion) = &finding.suggestion {
            println!("            {}", format!("hint: {}", suggestion).dimmed());
        }
        println!();
    }
}

fn print_severity(severity: Severity) {
    match severity {
        Severity::Critical => print!("    {} ", "CRIT ".red().bold()),
        Severity::High => print!("    {} ", "HIGH ".red()),
        Severity::Medium => print!("    {} ", "MED  ".yellow()),
        Severity::Low => print!("    {} ", "LOW  ".dimmed()),
    }
}

fn print_verdict(summary: &Summary) {
    let total =
        summary.total_errors + summary.total_warnings + summary.total_performance_issues;
    if summary.critical_issues > 0 {
        print!("  {}", "✗ FAIL".red());
        println!(
            "  {} critical issue(s) among {} finding(s)",
            summary.critical_issues, total
        );
    } else if total > 0 {
        print!("  {}", "✓ PASS".green());
        println!(
            "  {} error(s), {} warning(s), {} performance issue(s)",
            summary.total_errors, summary.total_warnings, summary.total_performance_issues
        );
    } else {
        print!("  {}", "✓ PASS".green());
        println!("  no issues found");
    }
}
