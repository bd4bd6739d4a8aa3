//! Report documents and the on-disk report store.
//!
//! Every completed run becomes one pretty-printed JSON file under the
//! configured reports directory, named `report_<YYYYmmdd_HHMMSS>.json` so
//! lexical order equals chronological order. The store never fails a run:
//! persistence errors surface to the caller, prune failures are logged and
//! skipped.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detect::{Finding, Severity};
use crate::engine::{AnalysisResult, Summary};
use crate::logging::EventLog;
use crate::scanner::StructureOverview;

const REPORT_PREFIX: &str = "report_";
const REPORT_SUFFIX: &str = ".json";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A persisted report document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub metadata: ReportMetadata,
    pub summary: Summary,
    pub issues: IssueSet,
    pub structure: StructureOverview,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub generator_version: String,
    /// "full" or "incremental".
    pub analysis_type: String,
}

/// Findings partitioned the same way the run partitions them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueSet {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub performance_issues: Vec<Finding>,
}

/// A prioritized remediation entry derived from the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Severity,
    pub category: String,
    pub message: String,
    pub action: String,
}

impl ReportDocument {
    pub fn from_result(result: &AnalysisResult, analysis_type: &str) -> Self {
        Self {
            metadata: ReportMetadata {
                generated_at: result.timestamp,
                generator_version: env!("CARGO_PKG_VERSION").to_string(),
                analysis_type: analysis_type.to_string(),
            },
            summary: result.summary.clone(),
            issues: IssueSet {
                errors: result.errors.clone(),
                warnings: result.warnings.clone(),
                performance_issues: result.performance_issues.clone(),
            },
            structure: result.structure.clone(),
            recommendations: recommendations(&result.summary),
        }
    }
}

/// Remediation entries keyed off the summary counters.
pub fn recommendations(summary: &Summary) -> Vec<Recommendation> {
    let mut entries = Vec::new();
    if summary.critical_issues > 0 {
        entries.push(Recommendation {
            priority: Severity::High,
            category: "errors".to_string(),
            message: format!("{} critical error(s) found", summary.critical_issues),
            action: "Fix critical errors before deployment".to_string(),
        });
    }
    if summary.total_warnings > 20 {
        entries.push(Recommendation {
            priority: Severity::Medium,
            category: "code_quality".to_string(),
            message: format!("{} warnings accumulated", summary.total_warnings),
            action: "Schedule a code quality review".to_string(),
        });
    }
    if summary.total_performance_issues > 5 {
        entries.push(Recommendation {
            priority: Severity::Medium,
            category: "performance".to_string(),
            message: format!(
                "{} performance issue(s) found",
                summary.total_performance_issues
            ),
            action: "Profile and optimize the flagged code paths".to_string(),
        });
    }
    entries
}

/// Name and location of one stored report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHandle {
    /// File stem, e.g. `report_20260825_101500`.
    pub id: String,
    pub path: PathBuf,
}

/// Directory-backed report storage.
pub struct ReportStore {
    dir: PathBuf,
    log: Arc<dyn EventLog>,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>, log: Arc<dyn EventLog>) -> Self {
        Self {
            dir: dir.into(),
            log,
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Serialize `document` into the store. Reports generated within the
    /// same second share a name; the newer write wins.
    pub fn persist(&self, document: &ReportDocument) -> anyhow::Result<ReportHandle> {
        fs::create_dir_all(&self.dir)?;
        let id = format!(
            "{REPORT_PREFIX}{}",
            document.metadata.generated_at.format(TIMESTAMP_FORMAT)
        );
        let path = self.dir.join(format!("{id}{REPORT_SUFFIX}"));
        let json = serde_json::to_string_pretty(document)?;
        fs::write(&path, json)?;
        self.log.debug(&format!("wrote report {}", path.display()));
        Ok(ReportHandle { id, path })
    }

    /// All stored reports, newest first. A missing directory is an empty
    /// store, not an error.
    pub fn handles(&self) -> Vec<ReportHandle> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut handles: Vec<ReportHandle> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let name = path.file_name()?.to_str()?;
                if !name.starts_with(REPORT_PREFIX) || !name.ends_with(REPORT_SUFFIX) {
                    return None;
                }
                Some(ReportHandle {
                    id: name.trim_end_matches(REPORT_SUFFIX).to_string(),
                    path: path.clone(),
                })
            })
            .collect();
        // Zero-padded timestamps make lexical order chronological.
        handles.sort_by(|a, b| b.id.cmp(&a.id));
        handles
    }

    pub fn latest(&self) -> Option<ReportHandle> {
        self.handles().into_iter().next()
    }

    /// Delete everything but the `keep_count` newest reports. Returns how
    /// many files were removed.
    pub fn prune(&self, keep_count: usize) -> usize {
        let mut removed = 0;
        for handle in self.handles().into_iter().skip(keep_count) {
            match fs::remove_file(&handle.path) {
                Ok(()) => removed += 1,
                Err(err) => {
                    self.log.warn(&format!(
                        "could not remove old report {}: {}",
                        handle.path.display(),
                        err
                    ));
                }
            }
        }
        removed
    }

    /// Read a stored report back.
    pub fn load(&self, handle: &ReportHandle) -> anyhow::Result<ReportDocument> {
        let content = fs::read_to_string(&handle.path)?;
        let document: ReportDocument = serde_json::from_str(&content)?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ReportStore {
        ReportStore::new(dir.path().join("reports"), Arc::new(MemoryLog::new()))
    }

    fn document_at(hour: u32) -> ReportDocument {
        ReportDocument {
            metadata: ReportMetadata {
                generated_at: Utc.with_ymd_and_hms(2026, 8, 25, hour, 0, 0).unwrap(),
                generator_version: env!("CARGO_PKG_VERSION").to_string(),
                analysis_type: "full".to_string(),
            },
            summary: Summary::default(),
            issues: IssueSet::default(),
            structure: StructureOverview::default(),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn persist_writes_timestamped_json() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let handle = store.persist(&document_at(9)).unwrap();
        assert_eq!(handle.id, "report_20260825_090000");
        assert!(handle.path.is_file());
        let loaded = store.load(&handle).unwrap();
        assert_eq!(loaded.metadata.analysis_type, "full");
        assert_eq!(
            loaded.metadata.generated_at,
            Utc.with_ymd_and_hms(2026, 8, 25, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn latest_returns_newest_by_id() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.persist(&document_at(8)).unwrap();
        store.persist(&document_at(12)).unwrap();
        store.persist(&document_at(10)).unwrap();
        let latest = store.latest().unwrap();
        assert_eq!(latest.id, "report_20260825_120000");
    }

    #[test]
    fn latest_is_none_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).latest().is_none());
    }

    #[test]
    fn prune_keeps_the_newest_reports() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for hour in 6..11 {
            store.persist(&document_at(hour)).unwrap();
        }
        let removed = store.prune(2);
        assert_eq!(removed, 3);
        let remaining = store.handles();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].id, "report_20260825_100000");
        assert_eq!(remaining[1].id, "report_20260825_090000");
    }

    #[test]
    fn prune_on_missing_directory_removes_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store(&dir).prune(3), 0);
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.persist(&document_at(9)).unwrap();
        fs::write(store.dir().join("notes.txt"), "hello").unwrap();
        fs::write(store.dir().join("report_bad.log"), "nope").unwrap();
        assert_eq!(store.handles().len(), 1);
    }

    #[test]
    fn recommendations_follow_summary_thresholds() {
        let mut summary = Summary::default();
        assert!(recommendations(&summary).is_empty());

        // Warning counts below the cutoff raise nothing.
        summary.total_warnings = 15;
        assert!(recommendations(&summary).is_empty());

        summary.critical_issues = 2;
        summary.total_warnings = 21;
        summary.total_performance_issues = 6;
        let entries = recommendations(&summary);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].priority, Severity::High);
        assert_eq!(entries[0].category, "errors");
        assert_eq!(entries[1].category, "code_quality");
        assert_eq!(entries[2].category, "performance");

        summary.total_warnings = 20;
        summary.total_performance_issues = 5;
        summary.critical_issues = 0;
        assert!(recommendations(&summary).is_empty());
    }
}
