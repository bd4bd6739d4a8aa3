//! Configuration schema for a watched project.
//!
//! Loaded from `codewatch.yaml` (or `.codewatch.yaml`) at the project root;
//! every field has a default so an absent file means default behavior.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// Config file names probed at the project root, in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["codewatch.yaml", ".codewatch.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Longest acceptable line, in characters (default: 88).
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Cyclomatic complexity ceiling; findings start strictly above it
    /// (default: 10).
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,
    /// Directory names pruned from the walk wherever they appear.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
    /// File extensions to analyze (default: `py`).
    #[serde(default = "default_file_extensions")]
    pub file_extensions: Vec<String>,
    /// Glob patterns excluding individual paths (e.g. `**/migrations/**`).
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Seconds between monitoring scans (default: 30).
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    #[serde(default)]
    pub analysis: AnalysisToggles,
    #[serde(default)]
    pub reports: ReportsConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
            max_complexity: default_max_complexity(),
            excluded_dirs: default_excluded_dirs(),
            file_extensions: default_file_extensions(),
            exclude_patterns: Vec::new(),
            scan_interval: default_scan_interval(),
            analysis: AnalysisToggles::default(),
            reports: ReportsConfig::default(),
        }
    }
}

/// Which detectors run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisToggles {
    /// Parse failures and parse-time errors (default: true).
    #[serde(default = "default_true")]
    pub syntax_check: bool,
    /// Line length, complexity, docstrings, naming (default: true).
    #[serde(default = "default_true")]
    pub code_quality: bool,
    /// Loop and import anti-patterns (default: true).
    #[serde(default = "default_true")]
    pub performance: bool,
    /// Possibly-undefined names and None-attribute access. Heuristic, so
    /// off by default.
    #[serde(default)]
    pub runtime_checks: bool,
}

impl Default for AnalysisToggles {
    fn default() -> Self {
        Self {
            syntax_check: true,
            code_quality: true,
            performance: true,
            runtime_checks: false,
        }
    }
}

/// Where reports land and how many stay.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportsConfig {
    /// Directory for report files, relative to the project root unless
    /// absolute (default: `reports`).
    #[serde(default = "default_reports_dir")]
    pub dir: PathBuf,
    /// Newest reports kept by pruning (default: 10).
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: default_reports_dir(),
            keep_count: default_keep_count(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_line_length() -> usize {
    88
}

fn default_max_complexity() -> usize {
    10
}

fn default_excluded_dirs() -> Vec<String> {
    [
        ".git",
        "__pycache__",
        ".mypy_cache",
        "node_modules",
        "venv",
        ".venv",
        "target",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_file_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_scan_interval() -> u64 {
    30
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_keep_count() -> usize {
    10
}

impl WatchConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: WatchConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Probe the project root for a config file; absent means defaults.
    pub fn discover(root: &Path) -> anyhow::Result<Self> {
        for name in DEFAULT_CONFIG_NAMES {
            let candidate = root.join(name);
            if candidate.is_file() {
                return Self::parse_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    /// Load from an explicit path if given, otherwise discover under `root`.
    /// An explicit path that does not exist is an error; discovery is not.
    pub fn load(explicit: Option<&Path>, root: &Path) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => {
                let config = Self::parse_file(path)
                    .map_err(|e| anyhow::anyhow!("reading config {}: {}", path.display(), e))?;
                config.validate()?;
                Ok(config)
            }
            None => {
                let config = Self::discover(root)?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Check the config for values that cannot work.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_line_length == 0 {
            anyhow::bail!("max_line_length must be at least 1");
        }
        if self.scan_interval == 0 {
            anyhow::bail!("scan_interval must be at least 1 second");
        }
        if self.file_extensions.is_empty() {
            anyhow::bail!("file_extensions must list at least one extension");
        }
        for pattern in &self.exclude_patterns {
            Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?;
        }
        Ok(())
    }

    /// Extensions lowercased with any leading dot stripped, ready for
    /// comparison against `Path::extension`.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.file_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect()
    }

    /// Scan interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    /// Compile `exclude_patterns` into a single matcher.
    pub fn exclude_globs(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }
}
