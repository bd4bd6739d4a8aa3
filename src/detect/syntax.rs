//! Syntax detector: parse failures, plus optional runtime-hazard checks
//! (possibly-undefined names, attribute access on a literal `None`).
//!
//! Also home to [`analyze_traceback`], which triages a pasted Python
//! traceback into the same severity vocabulary the detectors use.

use std::collections::HashSet;

use lazy_static::lazy_static;
use phf::{phf_set, Set};
use regex::Regex;
use serde::Serialize;

use crate::parser::{NodeKind, ParseFailure, ParseOutcome, SyntaxNode, SyntaxTree};

use super::types::{Finding, FindingCategory, FindingKind, Severity, SourceFile};
use super::Detector;

/// Suggestion lookup for parse-failure messages, checked in order against
/// the lowercased message.
const SYNTAX_SUGGESTIONS: &[(&str, &str)] = &[
    (
        "unexpected end of input",
        "Check for unclosed parentheses, brackets, or quotes",
    ),
    (
        "unexpected eof",
        "Check for unclosed parentheses, brackets, or quotes",
    ),
    (
        "invalid syntax",
        "Check for missing colons, parentheses, or brackets",
    ),
    (
        "unindent",
        "Fix indentation to match the outer indentation level",
    ),
    (
        "indentation",
        "Use consistent indentation of 4 spaces per level",
    ),
];

const FALLBACK_SUGGESTION: &str = "Review the syntax around the indicated line";

/// Callables that can inject names into a scope at runtime. A scope that
/// invokes one of these stops reporting undefined names.
const DYNAMIC_SCOPE_CALLS: &[&str] = &["eval", "exec", "globals", "locals", "vars", "__import__"];

/// Names always in scope: builtins plus module-level dunders.
static PYTHON_BUILTINS: Set<&'static str> = phf_set! {
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool",
    "breakpoint", "bytearray", "bytes", "callable", "chr", "classmethod",
    "compile", "complex", "copyright", "credits", "delattr", "dict", "dir",
    "divmod", "enumerate", "eval", "exec", "exit", "filter", "float",
    "format", "frozenset", "getattr", "globals", "hasattr", "hash", "help",
    "hex", "id", "input", "int", "isinstance", "issubclass", "iter", "len",
    "license", "list", "locals", "map", "max", "memoryview", "min", "next",
    "object", "oct", "open", "ord", "pow", "print", "property", "quit",
    "range", "repr", "reversed", "round", "set", "setattr", "slice",
    "sorted", "staticmethod", "str", "sum", "super", "tuple", "type",
    "vars", "zip",
    "Ellipsis", "NotImplemented", "__import__", "__debug__",
    "__name__", "__file__", "__doc__", "__package__", "__spec__",
    "__loader__", "__builtins__",
    "ArithmeticError", "AssertionError", "AttributeError", "BaseException",
    "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError",
    "BufferError", "BytesWarning", "ChildProcessError",
    "ConnectionAbortedError", "ConnectionError", "ConnectionRefusedError",
    "ConnectionResetError", "DeprecationWarning", "EOFError",
    "EncodingWarning", "EnvironmentError", "Exception", "ExceptionGroup",
    "FileExistsError", "FileNotFoundError", "FloatingPointError",
    "FutureWarning", "GeneratorExit", "IOError", "ImportError",
    "ImportWarning", "IndentationError", "IndexError", "InterruptedError",
    "IsADirectoryError", "KeyError", "KeyboardInterrupt", "LookupError",
    "MemoryError", "ModuleNotFoundError", "NameError",
    "NotADirectoryError", "NotImplementedError", "OSError",
    "OverflowError", "PendingDeprecationWarning", "PermissionError",
    "ProcessLookupError", "RecursionError", "ReferenceError",
    "ResourceWarning", "RuntimeError", "RuntimeWarning",
    "StopAsyncIteration", "StopIteration", "SyntaxError", "SyntaxWarning",
    "SystemError", "SystemExit", "TabError", "TimeoutError", "TypeError",
    "UnboundLocalError", "UnicodeDecodeError", "UnicodeEncodeError",
    "UnicodeError", "UnicodeTranslateError", "UnicodeWarning",
    "UserWarning", "ValueError", "Warning", "ZeroDivisionError",
};

/// Detector for files that fail to parse, with optional runtime checks on
/// files that do parse.
pub struct SyntaxDetector {
    runtime_checks: bool,
}

impl SyntaxDetector {
    pub fn new(runtime_checks: bool) -> Self {
        Self { runtime_checks }
    }
}

impl Detector for SyntaxDetector {
    fn name(&self) -> &'static str {
        "syntax"
    }

    fn category(&self) -> FindingCategory {
        FindingCategory::Errors
    }

    fn analyze(&self, source: &SourceFile, parse: &ParseOutcome) -> anyhow::Result<Vec<Finding>> {
        let file = source.display_path();
        match parse {
            ParseOutcome::Failed(ParseFailure::Syntax {
                message,
                line,
                column,
            }) => Ok(vec![Finding::new(
                FindingKind::SyntaxError,
                format!("Syntax error: {message}"),
                file,
                *line,
                Severity::Critical,
            )
            .with_column(*column)
            .with_suggestion(suggest(message))]),
            ParseOutcome::Failed(ParseFailure::Internal(message)) => Ok(vec![Finding::new(
                FindingKind::ParseError,
                format!("Failed to parse file: {message}"),
                file,
                0,
                Severity::High,
            )]),
            ParseOutcome::Parsed(tree) => {
                if self.runtime_checks {
                    Ok(check_runtime_hazards(tree, &file))
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }
}

fn suggest(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    SYNTAX_SUGGESTIONS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, suggestion)| *suggestion)
        .unwrap_or(FALLBACK_SUGGESTION)
}

#[derive(Default)]
struct Scope {
    bindings: HashSet<String>,
    /// Set when the scope wildcard-imports or calls eval/exec and friends.
    /// Names in such a scope can come from anywhere, so nothing is reported.
    unresolvable: bool,
}

struct ScopeChecker {
    file: String,
    scopes: Vec<Scope>,
    findings: Vec<Finding>,
}

/// Walk the tree with a scope chain, flagging name loads that no enclosing
/// scope binds and attribute access on a literal `None`.
///
/// Bindings are hoisted per scope (Python resolves module-level functions
/// called before their definition), so this reports "possibly undefined"
/// rather than use-before-assignment.
fn check_runtime_hazards(tree: &SyntaxTree, file: &str) -> Vec<Finding> {
    let mut checker = ScopeChecker {
        file: file.to_string(),
        scopes: Vec::new(),
        findings: Vec::new(),
    };
    checker.enter_region(&tree.root.children, &[]);
    checker.findings
}

impl ScopeChecker {
    fn enter_region(&mut self, children: &[SyntaxNode], params: &[String]) {
        let mut scope = Scope::default();
        for param in params {
            scope.bindings.insert(param.clone());
        }
        for child in children {
            collect_bindings(child, &mut scope);
        }
        self.scopes.push(scope);
        for child in children {
            self.visit(child);
        }
        self.scopes.pop();
    }

    fn visit(&mut self, node: &SyntaxNode) {
        match &node.kind {
            NodeKind::FunctionDef { params, .. } => {
                self.enter_region(&node.children, params);
            }
            NodeKind::ClassDef { .. } => {
                self.enter_region(&node.children, &[]);
            }
            NodeKind::Name { id } => {
                if !self.resolved(id) {
                    self.findings.push(
                        Finding::new(
                            FindingKind::UndefinedVariable,
                            format!("Possibly undefined variable \"{id}\""),
                            self.file.clone(),
                            node.span.start_line,
                            Severity::Medium,
                        )
                        .with_suggestion("Define the variable before use or check for typos"),
                    );
                }
            }
            NodeKind::Attribute {
                name,
                object_is_none,
            } => {
                if *object_is_none {
                    self.findings.push(
                        Finding::new(
                            FindingKind::AttributeOnNone,
                            format!("Attribute access \"{name}\" on None"),
                            self.file.clone(),
                            node.span.start_line,
                            Severity::High,
                        )
                        .with_suggestion("Add a None check before accessing attributes"),
                    );
                }
                for child in &node.children {
                    self.visit(child);
                }
            }
            _ => {
                for child in &node.children {
                    self.visit(child);
                }
            }
        }
    }

    fn resolved(&self, id: &str) -> bool {
        if PYTHON_BUILTINS.contains(id) {
            return true;
        }
        self.scopes
            .iter()
            .rev()
            .any(|scope| scope.unresolvable || scope.bindings.contains(id))
    }
}

/// Gather every name `node` binds into `scope`, stopping at nested function
/// and class bodies (those are their own scopes).
fn collect_bindings(node: &SyntaxNode, scope: &mut Scope) {
    match &node.kind {
        NodeKind::FunctionDef { name, .. } | NodeKind::ClassDef { name, .. } => {
            scope.bindings.insert(name.clone());
        }
        NodeKind::Assign { targets } | NodeKind::For { targets, .. } => {
            for target in targets {
                scope.bindings.insert(target.clone());
            }
            for child in &node.children {
                collect_bindings(child, scope);
            }
        }
        NodeKind::Binding { names } => {
            for name in names {
                scope.bindings.insert(name.clone());
            }
            for child in &node.children {
                collect_bindings(child, scope);
            }
        }
        NodeKind::Import { names, is_wildcard } => {
            for name in names {
                scope.bindings.insert(name.clone());
            }
            if *is_wildcard {
                scope.unresolvable = true;
            }
        }
        NodeKind::Call {
            callee: Some(callee),
        } => {
            if DYNAMIC_SCOPE_CALLS.contains(&callee.as_str()) {
                scope.unresolvable = true;
            }
            for child in &node.children {
                collect_bindings(child, scope);
            }
        }
        _ => {
            for child in &node.children {
                collect_bindings(child, scope);
            }
        }
    }
}

lazy_static! {
    static ref TRACE_LOCATION: Regex = Regex::new(r#"File "([^"]+)", line (\d+)"#).unwrap();
}

/// Triage result for a pasted traceback.
#[derive(Debug, Clone, Serialize)]
pub struct TracebackReport {
    pub error_type: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub suggestions: Vec<String>,
    pub severity: Severity,
}

/// Pull the failing frame and the exception line out of a Python traceback.
///
/// The innermost frame is the last `File "...", line N` match; the exception
/// itself is the last non-empty line, split on the first `: `.
pub fn analyze_traceback(trace: &str) -> TracebackReport {
    let location = TRACE_LOCATION.captures_iter(trace).last();
    let (file, line) = match location {
        Some(caps) => (
            Some(caps[1].to_string()),
            caps[2].parse::<usize>().ok(),
        ),
        None => (None, None),
    };

    let exception_line = trace
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let (error_type, error_message) = match exception_line.split_once(": ") {
        Some((kind, message)) => (kind.trim().to_string(), message.trim().to_string()),
        None => (exception_line.to_string(), String::new()),
    };

    TracebackReport {
        suggestions: suggestions_for(&error_type),
        error_type,
        error_message,
        file,
        line,
        severity: Severity::High,
    }
}

fn suggestions_for(error_type: &str) -> Vec<String> {
    let tips: &[&str] = match error_type {
        "NameError" => &[
            "Check the variable name for typos",
            "Ensure the variable is defined before use",
        ],
        "AttributeError" => &[
            "Check the object type before attribute access",
            "Add a None check if the value can be None",
        ],
        "ImportError" | "ModuleNotFoundError" => &[
            "Verify the module is installed",
            "Check the import path for typos",
        ],
        "IndentationError" | "TabError" => &["Use consistent indentation of 4 spaces per level"],
        "SyntaxError" => &["Check for missing colons, parentheses, or brackets"],
        "TypeError" => &["Check argument types at the call site"],
        "KeyError" => &["Use .get() with a default or check key membership first"],
        _ => &["Read the traceback from the bottom up; the last frame is where it raised"],
    };
    tips.iter().map(|tip| tip.to_string()).collect()
}
