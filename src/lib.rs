//! Codewatch - static analysis and continuous monitoring for Python projects.
//!
//! Codewatch scans a Python source tree for syntax errors, code quality
//! problems, and common performance pitfalls. It can run once or keep
//! watching on an interval, and every run is persisted as a timestamped
//! JSON report.
//!
//! # Architecture
//!
//! Analysis is AST-based via tree-sitter:
//!
//! - `parser`: Python parsing and lowering to a compact syntax tree
//! - `detect`: Detectors that turn source plus tree into findings
//! - `scanner`: File enumeration with exclusions and extension filters
//! - `engine`: Orchestration, summaries, and run statistics
//! - `monitor`: Interval scheduling on a worker thread
//! - `report`: Timestamped JSON report storage with pruning
//! - `config`: YAML configuration with discovery and validation
//!
//! # Adding a Detector
//!
//! Implement the `Detector` trait in `src/detect/` and register it in
//! `engine::build_detectors`. The detector's category decides which result
//! partition its findings land in.

pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod logging;
pub mod monitor;
pub mod parser;
pub mod report;
pub mod scanner;

pub use config::WatchConfig;
pub use detect::{Detector, Finding, FindingCategory, FindingKind, Severity};
pub use engine::{AnalysisEngine, AnalysisResult, HealthStatus, RunStatistics, Summary};
pub use monitor::{Monitor, MonitoringState};
pub use parser::{parse_source, ParseFailure, ParseOutcome, SyntaxTree};
pub use report::{ReportDocument, ReportHandle, ReportStore};
pub use scanner::{ProjectScanner, StructureOverview};
