//! Analysis orchestration: one engine per watched project.
//!
//! The engine owns the scanner, the enabled detectors, the report store,
//! and the cumulative run statistics. Faults stay contained: a file that
//! cannot be read or a detector that errors becomes a finding on that file,
//! and a failure at the run boundary (report persistence) becomes a single
//! engine-level finding on a result that is still returned.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::WatchConfig;
use crate::detect::{
    Detector, Finding, FindingCategory, FindingKind, PerformanceDetector, QualityDetector,
    Severity, SourceFile, SyntaxDetector,
};
use crate::logging::EventLog;
use crate::parser::parse_source;
use crate::report::{ReportDocument, ReportStore};
use crate::scanner::{ProjectScanner, StructureOverview};

/// Everything one run produced, partitioned by detector category.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub timestamp: DateTime<Utc>,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub performance_issues: Vec<Finding>,
    pub structure: StructureOverview,
    pub summary: Summary,
}

/// Counters and recommendations derived from one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub files_analyzed: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_performance_issues: usize,
    /// CRITICAL findings, counted over the errors partition.
    pub critical_issues: usize,
    /// HIGH findings, counted over the errors partition.
    pub high_priority_issues: usize,
    pub recommendations: Vec<String>,
}

impl Summary {
    pub fn compute(
        files_analyzed: usize,
        errors: &[Finding],
        warnings: &[Finding],
        performance_issues: &[Finding],
    ) -> Self {
        let critical_issues = errors
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count();
        let high_priority_issues = errors
            .iter()
            .filter(|f| f.severity == Severity::High)
            .count();

        let mut recommendations = Vec::new();
        if critical_issues > 0 {
            recommendations.push("Address critical errors immediately".to_string());
        }
        if performance_issues.len() > 5 {
            recommendations.push(
                "Consider performance optimizations for detected inefficiencies".to_string(),
            );
        }
        if warnings.len() > 20 {
            recommendations.push("Review and fix code quality warnings".to_string());
        }

        Self {
            files_analyzed,
            total_errors: errors.len(),
            total_warnings: warnings.len(),
            total_performance_issues: performance_issues.len(),
            critical_issues,
            high_priority_issues,
            recommendations,
        }
    }
}

/// Cumulative counters across the engine's lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    pub scans_completed: u64,
    pub files_analyzed: u64,
    pub errors_detected: u64,
    pub warnings_detected: u64,
    pub performance_issues_detected: u64,
    pub critical_issues: u64,
    pub last_scan: Option<DateTime<Utc>>,
    pub monitoring_active: bool,
    /// When monitoring last went active; survives `stop()` for reporting.
    pub started_at: Option<DateTime<Utc>>,
}

impl RunStatistics {
    /// Time since monitoring last went active.
    pub fn uptime(&self) -> Option<chrono::Duration> {
        self.started_at.map(|started| Utc::now() - started)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthState {
    Healthy,
    IssuesDetected,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "HEALTHY",
            HealthState::IssuesDetected => "ISSUES_DETECTED",
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Condensed view for the `status` command and embedders.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub monitoring_active: bool,
    pub last_scan: Option<DateTime<Utc>>,
    pub critical_issues: u64,
    pub warnings: u64,
}

#[derive(Default)]
struct FilePartitions {
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
    performance: Vec<Finding>,
}

/// Orchestrates enumerate → parse → detect over a project root.
pub struct AnalysisEngine {
    config: WatchConfig,
    scanner: ProjectScanner,
    detectors: Vec<Box<dyn Detector>>,
    reports: ReportStore,
    stats: Mutex<RunStatistics>,
    log: Arc<dyn EventLog>,
}

impl AnalysisEngine {
    pub fn new(
        root: impl Into<PathBuf>,
        config: WatchConfig,
        log: Arc<dyn EventLog>,
    ) -> anyhow::Result<Self> {
        let root = root.into();
        let scanner = ProjectScanner::new(&root, &config)?;
        let reports_dir = if config.reports.dir.is_absolute() {
            config.reports.dir.clone()
        } else {
            root.join(&config.reports.dir)
        };
        let reports = ReportStore::new(reports_dir, Arc::clone(&log));
        let detectors = build_detectors(&config);
        Ok(Self {
            config,
            scanner,
            detectors,
            reports,
            stats: Mutex::new(RunStatistics::default()),
            log,
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn reports(&self) -> &ReportStore {
        &self.reports
    }

    pub fn root(&self) -> &Path {
        self.scanner.root()
    }

    /// Analyze every file the scanner yields.
    pub fn run_once(&self) -> AnalysisResult {
        let files: Vec<PathBuf> = self.scanner.files().collect();
        self.run(files, "full")
    }

    /// Analyze only files modified after `since`.
    pub fn run_incremental(&self, since: SystemTime) -> AnalysisResult {
        let files: Vec<PathBuf> = self.scanner.files_modified_since(since).collect();
        self.run(files, "incremental")
    }

    fn run(&self, files: Vec<PathBuf>, analysis_type: &str) -> AnalysisResult {
        let timestamp = Utc::now();
        self.log.info(&format!(
            "{} analysis of {} file(s) under {}",
            analysis_type,
            files.len(),
            self.scanner.root().display()
        ));

        // Parallel per file; collect preserves enumeration order.
        let per_file: Vec<FilePartitions> = files
            .par_iter()
            .map(|path| self.analyze_file(path))
            .collect();

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut performance_issues = Vec::new();
        for partitions in per_file {
            errors.extend(partitions.errors);
            warnings.extend(partitions.warnings);
            performance_issues.extend(partitions.performance);
        }

        let structure = self.scanner.structure();
        let summary = Summary::compute(files.len(), &errors, &warnings, &performance_issues);
        let mut result = AnalysisResult {
            timestamp,
            errors,
            warnings,
            performance_issues,
            structure,
            summary,
        };

        self.publish_statistics(&result);

        let document = ReportDocument::from_result(&result, analysis_type);
        match self.reports.persist(&document) {
            Ok(handle) => {
                let removed = self.reports.prune(self.config.reports.keep_count);
                if removed > 0 {
                    self.log
                        .debug(&format!("pruned {removed} old report(s) after {}", handle.id));
                }
            }
            Err(err) => {
                self.log.error(&format!("failed to persist report: {err}"));
                result.errors.push(Finding::new(
                    FindingKind::EngineError,
                    format!("Analysis failed: {err}"),
                    "unknown",
                    0,
                    Severity::High,
                ));
                result.summary = Summary::compute(
                    result.summary.files_analyzed,
                    &result.errors,
                    &result.warnings,
                    &result.performance_issues,
                );
            }
        }

        result
    }

    /// Read, parse once, and run each enabled detector. Findings land in
    /// the partition the detector's category names. A detector error turns
    /// into a finding and skips the detectors that remain for this file.
    fn analyze_file(&self, path: &Path) -> FilePartitions {
        let mut partitions = FilePartitions::default();
        let display = path.display().to_string();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                partitions.errors.push(Finding::new(
                    FindingKind::FileAnalysisError,
                    format!("Could not analyze file: {err}"),
                    display,
                    0,
                    Severity::Medium,
                ));
                return partitions;
            }
        };

        let source = SourceFile::new(path, content);
        let parse = parse_source(path, &source.content);

        for detector in &self.detectors {
            match detector.analyze(&source, &parse) {
                Ok(findings) => {
                    let bucket = match detector.category() {
                        FindingCategory::Errors => &mut partitions.errors,
                        FindingCategory::Warnings => &mut partitions.warnings,
                        FindingCategory::Performance => &mut partitions.performance,
                    };
                    bucket.extend(findings);
                }
                Err(err) => {
                    self.log.warn(&format!(
                        "detector {} failed on {}: {}",
                        detector.name(),
                        display,
                        err
                    ));
                    partitions.errors.push(Finding::new(
                        FindingKind::FileAnalysisError,
                        format!("Could not analyze file: {err}"),
                        display.clone(),
                        0,
                        Severity::Medium,
                    ));
                    break;
                }
            }
        }

        partitions
    }

    /// One lock, all counters.
    fn publish_statistics(&self, result: &AnalysisResult) {
        let mut stats = self.stats.lock().unwrap();
        stats.scans_completed += 1;
        stats.files_analyzed += result.summary.files_analyzed as u64;
        stats.errors_detected += result.summary.total_errors as u64;
        stats.warnings_detected += result.summary.total_warnings as u64;
        stats.performance_issues_detected += result.summary.total_performance_issues as u64;
        stats.critical_issues += result.summary.critical_issues as u64;
        stats.last_scan = Some(result.timestamp);
    }

    /// Snapshot of the cumulative statistics.
    pub fn statistics(&self) -> RunStatistics {
        self.stats.lock().unwrap().clone()
    }

    pub fn health(&self) -> HealthStatus {
        let stats = self.statistics();
        let status = if stats.errors_detected == 0 {
            HealthState::Healthy
        } else {
            HealthState::IssuesDetected
        };
        HealthStatus {
            status,
            monitoring_active: stats.monitoring_active,
            last_scan: stats.last_scan,
            critical_issues: stats.critical_issues,
            warnings: stats.warnings_detected,
        }
    }

    /// Called by the scheduler on start/stop.
    pub fn mark_monitoring(&self, active: bool) {
        let mut stats = self.stats.lock().unwrap();
        stats.monitoring_active = active;
        if active {
            stats.started_at = Some(Utc::now());
        }
    }
}

fn build_detectors(config: &WatchConfig) -> Vec<Box<dyn Detector>> {
    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();
    if config.analysis.syntax_check {
        detectors.push(Box::new(SyntaxDetector::new(config.analysis.runtime_checks)));
    }
    if config.analysis.code_quality {
        detectors.push(Box::new(QualityDetector::new(
            config.max_line_length,
            config.max_complexity,
        )));
    }
    if config.analysis.performance {
        detectors.push(Box::new(PerformanceDetector::new()));
    }
    detectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use tempfile::TempDir;

    const CLEAN: &str = "\
def greet(name):
    \"\"\"Say hello.\"\"\"
    return name
";

    fn long_line_file() -> String {
        format!(
            "def fill():\n    \"\"\"Fill.\"\"\"\n    text = \"{}\"\n    return text\n",
            "x".repeat(110)
        )
    }

    const RANGE_LEN: &str = "\
def run(items):
    \"\"\"Run.\"\"\"
    for i in range(len(items)):
        print(items[i])
";

    fn engine(dir: &TempDir, config: WatchConfig) -> AnalysisEngine {
        AnalysisEngine::new(dir.path(), config, Arc::new(MemoryLog::new())).unwrap()
    }

    fn default_engine(dir: &TempDir) -> AnalysisEngine {
        engine(dir, WatchConfig::default())
    }

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn findings_land_in_their_detectors_partition() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", CLEAN);
        write(&dir, "b.py", &long_line_file());
        write(&dir, "c.py", RANGE_LEN);

        let result = default_engine(&dir).run_once();

        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, FindingKind::LineTooLong);
        assert!(result.warnings[0].file.ends_with("b.py"));
        assert_eq!(result.performance_issues.len(), 1);
        assert_eq!(
            result.performance_issues[0].kind,
            FindingKind::InefficientLoop
        );
        assert!(result.performance_issues[0].file.ends_with("c.py"));

        assert_eq!(result.summary.files_analyzed, 3);
        assert_eq!(result.summary.total_errors, 0);
        assert_eq!(result.summary.total_warnings, 1);
        assert_eq!(result.summary.total_performance_issues, 1);
        assert_eq!(result.structure.total_files, 3);
    }

    #[test]
    fn broken_file_yields_one_critical_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.py", "def broken(:\n    pass\n");

        let result = default_engine(&dir).run_once();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, FindingKind::SyntaxError);
        assert_eq!(result.errors[0].severity, Severity::Critical);
        assert_eq!(result.summary.critical_issues, 1);
        assert!(result
            .summary
            .recommendations
            .contains(&"Address critical errors immediately".to_string()));
    }

    #[test]
    fn unreadable_file_becomes_file_analysis_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.py"), [0xff, 0xfe, 0x00, 0x01]).unwrap();

        let result = default_engine(&dir).run_once();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, FindingKind::FileAnalysisError);
        assert_eq!(result.errors[0].severity, Severity::Medium);
        assert_eq!(result.errors[0].line, 0);
        assert!(result.errors[0].message.starts_with("Could not analyze file:"));
    }

    #[test]
    fn repeat_runs_produce_identical_findings() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", CLEAN);
        write(&dir, "b.py", &long_line_file());
        write(&dir, "c.py", RANGE_LEN);
        let engine = default_engine(&dir);

        let first = engine.run_once();
        let second = engine.run_once();

        assert_eq!(first.errors, second.errors);
        assert_eq!(first.warnings, second.warnings);
        assert_eq!(first.performance_issues, second.performance_issues);
    }

    #[test]
    fn statistics_accumulate_across_runs() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.py", &long_line_file());
        let engine = default_engine(&dir);

        engine.run_once();
        engine.run_once();

        let stats = engine.statistics();
        assert_eq!(stats.scans_completed, 2);
        assert_eq!(stats.files_analyzed, 2);
        assert_eq!(stats.warnings_detected, 2);
        assert_eq!(stats.errors_detected, 0);
        assert!(stats.last_scan.is_some());
    }

    #[test]
    fn health_reflects_cumulative_errors() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", CLEAN);
        let engine = default_engine(&dir);
        engine.run_once();
        assert_eq!(engine.health().status, HealthState::Healthy);

        write(&dir, "broken.py", "def broken(:\n");
        engine.run_once();
        let health = engine.health();
        assert_eq!(health.status, HealthState::IssuesDetected);
        assert_eq!(health.critical_issues, 1);
    }

    #[test]
    fn monitoring_flag_toggles_and_start_time_survives_stop() {
        let dir = TempDir::new().unwrap();
        let engine = default_engine(&dir);
        assert!(!engine.health().monitoring_active);
        assert!(engine.statistics().uptime().is_none());

        engine.mark_monitoring(true);
        assert!(engine.health().monitoring_active);
        assert!(engine.statistics().started_at.is_some());

        engine.mark_monitoring(false);
        assert!(!engine.health().monitoring_active);
        let stats = engine.statistics();
        assert!(stats.started_at.is_some());
        assert!(stats.uptime().is_some());
    }

    #[test]
    fn incremental_runs_filter_by_mtime() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", CLEAN);
        let engine = default_engine(&dir);

        let future = SystemTime::now() + std::time::Duration::from_secs(3600);
        let result = engine.run_incremental(future);
        assert_eq!(result.summary.files_analyzed, 0);

        let long_ago = SystemTime::now() - std::time::Duration::from_secs(3600);
        let result = engine.run_incremental(long_ago);
        assert_eq!(result.summary.files_analyzed, 1);
    }

    #[test]
    fn disabled_detectors_stay_silent() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.py", &long_line_file());
        write(&dir, "c.py", RANGE_LEN);

        let mut config = WatchConfig::default();
        config.analysis.code_quality = false;
        config.analysis.performance = false;
        let result = engine(&dir, config).run_once();

        assert!(result.warnings.is_empty());
        assert!(result.performance_issues.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn runs_persist_reports() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", CLEAN);
        let engine = default_engine(&dir);
        engine.run_once();
        let latest = engine.reports().latest().expect("a stored report");
        let document = engine.reports().load(&latest).unwrap();
        assert_eq!(document.metadata.analysis_type, "full");
        assert_eq!(document.summary.files_analyzed, 1);
    }

    #[test]
    fn persist_failure_becomes_engine_error_finding() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", CLEAN);
        // A file where the reports directory should go.
        fs::write(dir.path().join("reports"), "occupied").unwrap();

        let log = Arc::new(MemoryLog::new());
        let engine =
            AnalysisEngine::new(dir.path(), WatchConfig::default(), log.clone()).unwrap();
        let result = engine.run_once();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, FindingKind::EngineError);
        assert_eq!(result.errors[0].severity, Severity::High);
        assert_eq!(result.errors[0].file, "unknown");
        assert!(result.errors[0].message.starts_with("Analysis failed:"));
        assert_eq!(result.summary.total_errors, 1);
        assert_eq!(result.summary.high_priority_issues, 1);
        assert!(log.contains("failed to persist report"));
    }

    #[test]
    fn runtime_checks_are_opt_in() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", "def f():\n    \"\"\"F.\"\"\"\n    return missing\n");

        let result = default_engine(&dir).run_once();
        assert!(result.errors.is_empty());

        let mut config = WatchConfig::default();
        config.analysis.runtime_checks = true;
        let result = engine(&dir, config).run_once();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, FindingKind::UndefinedVariable);
    }
}
