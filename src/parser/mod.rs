//! Source parsing front door.
//!
//! Turns file content into a lowered [`SyntaxTree`] or a structured
//! [`ParseFailure`]. Parsing never panics on malformed input and is
//! deterministic: identical content yields structurally identical trees.

use std::path::Path;

use thiserror::Error;

pub mod python;
pub mod tree;

pub use tree::{NodeKind, Preorder, Span, SyntaxNode, SyntaxTree};

/// Why a file could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// Malformed source: unbalanced brackets, unterminated strings, bad
    /// indentation. Carries the first offending location.
    #[error("{message} (line {line}, column {column})")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    /// The parser itself failed; not attributable to a source location.
    #[error("parser failure: {0}")]
    Internal(String),
}

/// Outcome of parsing one file.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(SyntaxTree),
    Failed(ParseFailure),
}

impl ParseOutcome {
    /// The lowered tree, if parsing succeeded.
    pub fn tree(&self) -> Option<&SyntaxTree> {
        match self {
            ParseOutcome::Parsed(tree) => Some(tree),
            ParseOutcome::Failed(_) => None,
        }
    }
}

/// Parse file content, dispatching on the file extension.
///
/// The scanner's extension allow-list keeps unsupported files out of the
/// pipeline; an extension that slips through anyway surfaces as an internal
/// failure rather than a panic.
pub fn parse_source(path: &Path, content: &str) -> ParseOutcome {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "py" => python::parse(content),
        other => ParseOutcome::Failed(ParseFailure::Internal(format!(
            "no parser registered for extension '{other}'"
        ))),
    }
}
