//! Detection module: the checks that turn parsed files into findings.

mod performance;
mod quality;
mod syntax;
mod types;

pub use performance::PerformanceDetector;
pub use quality::QualityDetector;
pub use syntax::{analyze_traceback, SyntaxDetector, TracebackReport};
pub use types::{Finding, FindingCategory, FindingKind, Severity, SourceFile};

use crate::parser::ParseOutcome;

/// A single analysis pass over one file.
///
/// Detectors are stateless between files and shared across worker threads,
/// so implementations hold configuration only. Findings come back in source
/// order (pre-order over the tree) and land in the partition named by
/// [`Detector::category`], whatever their severity.
pub trait Detector: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Result partition this detector's findings belong to.
    fn category(&self) -> FindingCategory;

    /// Inspect one file. `parse` is shared across detectors so the file is
    /// parsed once per run.
    fn analyze(&self, source: &SourceFile, parse: &ParseOutcome) -> anyhow::Result<Vec<Finding>>;
}
