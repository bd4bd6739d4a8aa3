//! Code-quality detector: line length, cyclomatic complexity, docstrings,
//! naming conventions.

use lazy_static::lazy_static;
use regex::Regex;

use crate::parser::{NodeKind, ParseOutcome, SyntaxNode, SyntaxTree};

use super::types::{Finding, FindingCategory, FindingKind, Severity, SourceFile};
use super::Detector;

lazy_static! {
    static ref SNAKE_CASE: Regex = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
    static ref PASCAL_CASE: Regex = Regex::new(r"^[A-Z][A-Za-z0-9]*$").unwrap();
}

/// Detector for style and maintainability warnings.
pub struct QualityDetector {
    max_line_length: usize,
    max_complexity: usize,
}

impl QualityDetector {
    pub fn new(max_line_length: usize, max_complexity: usize) -> Self {
        Self {
            max_line_length,
            max_complexity,
        }
    }
}

impl Detector for QualityDetector {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn category(&self) -> FindingCategory {
        FindingCategory::Warnings
    }

    fn analyze(&self, source: &SourceFile, parse: &ParseOutcome) -> anyhow::Result<Vec<Finding>> {
        // A file that does not parse is the syntax detector's to report.
        let Some(tree) = parse.tree() else {
            return Ok(Vec::new());
        };
        let file = source.display_path();
        let mut findings = Vec::new();
        self.check_line_lengths(&source.content, &file, &mut findings);
        self.check_definitions(&tree.root, &file, &mut findings);
        findings.extend(check_unused_imports(tree, &file));
        Ok(findings)
    }
}

impl QualityDetector {
    fn check_line_lengths(&self, content: &str, file: &str, findings: &mut Vec<Finding>) {
        for (index, line) in content.lines().enumerate() {
            let width = line.chars().count();
            if width > self.max_line_length {
                findings.push(Finding::new(
                    FindingKind::LineTooLong,
                    format!(
                        "Line too long ({} > {} characters)",
                        width, self.max_line_length
                    ),
                    file,
                    index + 1,
                    Severity::Low,
                ));
            }
        }
    }

    /// Pre-order walk; per definition the order is complexity, docstring,
    /// naming, then its body.
    fn check_definitions(&self, node: &SyntaxNode, file: &str, findings: &mut Vec<Finding>) {
        match &node.kind {
            NodeKind::FunctionDef {
                name,
                has_docstring,
                ..
            } => {
                let complexity = cyclomatic_complexity(node);
                if complexity > self.max_complexity {
                    findings.push(Finding::new(
                        FindingKind::HighComplexity,
                        format!("Function \"{name}\" has high complexity ({complexity})"),
                        file,
                        node.span.start_line,
                        Severity::Medium,
                    ));
                }
                if !has_docstring {
                    findings.push(Finding::new(
                        FindingKind::MissingDocstring,
                        format!("Function \"{name}\" is missing a docstring"),
                        file,
                        node.span.start_line,
                        Severity::Low,
                    ));
                }
                if !SNAKE_CASE.is_match(name) {
                    findings.push(Finding::new(
                        FindingKind::NamingConvention,
                        format!("Function \"{name}\" should use snake_case naming"),
                        file,
                        node.span.start_line,
                        Severity::Low,
                    ));
                }
            }
            NodeKind::ClassDef {
                name,
                has_docstring,
            } => {
                if !has_docstring {
                    findings.push(Finding::new(
                        FindingKind::MissingDocstring,
                        format!("Class \"{name}\" is missing a docstring"),
                        file,
                        node.span.start_line,
                        Severity::Low,
                    ));
                }
                if !PASCAL_CASE.is_match(name) {
                    findings.push(Finding::new(
                        FindingKind::NamingConvention,
                        format!("Class \"{name}\" should use PascalCase naming"),
                        file,
                        node.span.start_line,
                        Severity::Low,
                    ));
                }
            }
            _ => {}
        }
        for child in &node.children {
            self.check_definitions(child, file, findings);
        }
    }
}

/// 1 + decision points + extra boolean operands, over the whole subtree
/// (nested definitions included).
fn cyclomatic_complexity(node: &SyntaxNode) -> usize {
    let mut complexity = 1;
    for descendant in node.preorder() {
        if descendant.is_decision_point() {
            complexity += 1;
        }
        if let NodeKind::BoolOp { operands } = descendant.kind {
            complexity += operands.saturating_sub(1);
        }
    }
    complexity
}

/// Unused-import check. Collects the imported names but reports nothing:
/// without cross-module usage data, single-file "unused" verdicts are
/// wrong often enough (re-exports, __all__, side-effect imports) that the
/// check ships disabled.
fn check_unused_imports(tree: &SyntaxTree, _file: &str) -> Vec<Finding> {
    let mut imported: Vec<&str> = Vec::new();
    for node in tree.preorder() {
        if let NodeKind::Import { names, .. } = &node.kind {
            imported.extend(names.iter().map(String::as_str));
        }
    }
    let _ = imported;
    Vec::new()
}
