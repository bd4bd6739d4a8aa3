//! Performance detector: `range(len(...))` loops, imports inside functions,
//! `+=` accumulation in loop bodies.

use crate::parser::{NodeKind, ParseOutcome, SyntaxNode};

use super::types::{Finding, FindingCategory, FindingKind, Severity, SourceFile};
use super::Detector;

/// Detector for common Python performance anti-patterns.
///
/// The `+=`-in-loop check is deliberately conservative: operand types are
/// not inspected, so numeric accumulators are flagged alongside string
/// concatenation. Each offending node is reported once, however deeply the
/// loops nest.
pub struct PerformanceDetector;

impl PerformanceDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PerformanceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PerformanceDetector {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn category(&self) -> FindingCategory {
        FindingCategory::Performance
    }

    fn analyze(&self, source: &SourceFile, parse: &ParseOutcome) -> anyhow::Result<Vec<Finding>> {
        let Some(tree) = parse.tree() else {
            return Ok(Vec::new());
        };
        let file = source.display_path();
        let mut findings = Vec::new();
        for child in &tree.root.children {
            visit(child, &file, 0, 0, &mut findings);
        }
        Ok(findings)
    }
}

fn visit(
    node: &SyntaxNode,
    file: &str,
    loop_depth: usize,
    fn_depth: usize,
    findings: &mut Vec<Finding>,
) {
    match &node.kind {
        NodeKind::For { iter_calls, .. } => {
            if iter_calls.len() >= 2 && iter_calls[0] == "range" && iter_calls[1] == "len" {
                findings.push(
                    Finding::new(
                        FindingKind::InefficientLoop,
                        "Consider using enumerate() instead of range(len())",
                        file,
                        node.span.start_line,
                        Severity::Low,
                    )
                    .with_suggestion("Use: for i, item in enumerate(sequence)"),
                );
            }
            for child in &node.children {
                visit(child, file, loop_depth + 1, fn_depth, findings);
            }
        }
        NodeKind::While => {
            for child in &node.children {
                visit(child, file, loop_depth + 1, fn_depth, findings);
            }
        }
        // A def statement in a loop runs per iteration; its body does not.
        NodeKind::FunctionDef { .. } => {
            for child in &node.children {
                visit(child, file, 0, fn_depth + 1, findings);
            }
        }
        NodeKind::Import { .. } => {
            if fn_depth > 0 {
                findings.push(
                    Finding::new(
                        FindingKind::ImportInFunction,
                        "Import inside function may impact performance",
                        file,
                        node.span.start_line,
                        Severity::Low,
                    )
                    .with_suggestion("Move import to module level if possible"),
                );
            }
        }
        NodeKind::AugAssign { op } => {
            if op == "+=" && loop_depth > 0 {
                findings.push(
                    Finding::new(
                        FindingKind::StringConcatInLoop,
                        "String concatenation in loop can be inefficient",
                        file,
                        node.span.start_line,
                        Severity::Medium,
                    )
                    .with_suggestion("Consider using list.append() and join()"),
                );
            }
            for child in &node.children {
                visit(child, file, loop_depth, fn_depth, findings);
            }
        }
        _ => {
            for child in &node.children {
                visit(child, file, loop_depth, fn_depth, findings);
            }
        }
    }
}
