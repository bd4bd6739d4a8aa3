//! Core types for analysis findings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity levels for findings, ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Closed set of finding kinds, one per check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    SyntaxError,
    ParseError,
    UndefinedVariable,
    AttributeOnNone,
    LineTooLong,
    HighComplexity,
    MissingDocstring,
    NamingConvention,
    InefficientLoop,
    ImportInFunction,
    StringConcatInLoop,
    /// A file could not be read or analyzed.
    FileAnalysisError,
    /// The run itself fell over (report persistence and the like).
    EngineError,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::SyntaxError => "SYNTAX_ERROR",
            FindingKind::ParseError => "PARSE_ERROR",
            FindingKind::UndefinedVariable => "UNDEFINED_VARIABLE",
            FindingKind::AttributeOnNone => "ATTRIBUTE_ON_NONE",
            FindingKind::LineTooLong => "LINE_TOO_LONG",
            FindingKind::HighComplexity => "HIGH_COMPLEXITY",
            FindingKind::MissingDocstring => "MISSING_DOCSTRING",
            FindingKind::NamingConvention => "NAMING_CONVENTION",
            FindingKind::InefficientLoop => "INEFFICIENT_LOOP",
            FindingKind::ImportInFunction => "IMPORT_IN_FUNCTION",
            FindingKind::StringConcatInLoop => "STRING_CONCAT_IN_LOOP",
            FindingKind::FileAnalysisError => "FILE_ANALYSIS_ERROR",
            FindingKind::EngineError => "ENGINE_ERROR",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which result partition a detector's findings land in. Partition
/// membership follows the detector, never the severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingCategory {
    Errors,
    Warnings,
    Performance,
}

impl FindingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::Errors => "errors",
            FindingCategory::Warnings => "warnings",
            FindingCategory::Performance => "performance",
        }
    }
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub message: String,
    pub file: String,
    /// 1-based; 0 when no line applies (unreadable file, engine fault).
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    pub fn new(
        kind: FindingKind,
        message: impl Into<String>,
        file: impl Into<String>,
        line: usize,
        severity: Severity,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            file: file.into(),
            line,
            column: None,
            severity,
            suggestion: None,
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// A source file handed to detectors: path plus full content.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Path as reported in findings.
    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_round_trips_through_str() {
        for severity in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            let parsed: Severity = severity.as_str().parse().unwrap();
            assert_eq!(parsed, severity);
        }
    }

    #[test]
    fn finding_kind_serializes_upper_snake() {
        let json = serde_json::to_string(&FindingKind::LineTooLong).unwrap();
        assert_eq!(json, "\"LINE_TOO_LONG\"");
        let json = serde_json::to_string(&FindingKind::SyntaxError).unwrap();
        assert_eq!(json, "\"SYNTAX_ERROR\"");
    }

    #[test]
    fn finding_omits_empty_optionals() {
        let finding = Finding::new(
            FindingKind::MissingDocstring,
            "Function \"f\" is missing a docstring",
            "app.py",
            3,
            Severity::Low,
        );
        let json = serde_json::to_string(&finding).unwrap();
        assert!(!json.contains("column"));
        assert!(!json.contains("suggestion"));
        assert!(json.contains("\"type\":\"MISSING_DOCSTRING\""));
    }

    #[test]
    fn builder_attaches_column_and_suggestion() {
        let finding = Finding::new(
            FindingKind::SyntaxError,
            "Syntax error: invalid syntax",
            "bad.py",
            2,
            Severity::Critical,
        )
        .with_column(5)
        .with_suggestion("Check for missing colons, parentheses, or brackets");
        assert_eq!(finding.column, Some(5));
        assert!(finding.suggestion.is_some());
    }
}
