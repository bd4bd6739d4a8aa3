//! Tagged syntax tree produced by the parser.
//!
//! The raw tree-sitter CST is lowered into a closed set of node kinds so
//! detectors dispatch with ordinary pattern matching instead of comparing
//! node-kind strings. Constructs with no analysis value are flattened away;
//! their children are spliced into the parent node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Closed set of node kinds the detectors understand.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Module root.
    Module,
    /// `def` (sync or async); methods and nested functions included.
    FunctionDef {
        name: String,
        params: Vec<String>,
        has_docstring: bool,
    },
    /// `class` definition.
    ClassDef { name: String, has_docstring: bool },
    /// `if` or `elif` branch.
    Branch,
    /// `while` loop.
    While,
    /// `for` loop. `iter_calls` is the single-argument call chain of the
    /// iterable, outermost first: `range(len(xs))` lowers to `["range", "len"]`.
    For {
        targets: Vec<String>,
        iter_calls: Vec<String>,
    },
    /// One `except` clause of a `try`.
    ExceptClause,
    /// Binary `and` / `or` expression.
    BoolOp { operands: usize },
    /// Call expression. `callee` is set only for plain-identifier callees.
    Call { callee: Option<String> },
    /// Attribute access. `object_is_none` when the receiver is the literal `None`.
    Attribute { name: String, object_is_none: bool },
    /// Identifier in load position.
    Name { id: String },
    /// `import` / `from ... import` statement; `names` are the bound names.
    Import { names: Vec<String>, is_wildcard: bool },
    /// Assignment statement; `targets` are the plainly-named bound targets.
    Assign { targets: Vec<String> },
    /// Augmented assignment (`+=`, `-=`, ...); `op` is the operator token.
    AugAssign { op: String },
    /// Other name-binding constructs: `with`/`except` aliases, comprehension
    /// and walrus targets, lambda parameters, `global`/`nonlocal` lists.
    Binding { names: Vec<String> },
    /// String, number, bool, `None`, or `...` literal.
    Literal,
}

/// One node of the lowered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Iterate over this node and all descendants in pre-order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    /// Whether this node is a branch point for complexity counting.
    pub fn is_decision_point(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Branch | NodeKind::While | NodeKind::For { .. } | NodeKind::ExceptClause
        )
    }
}

/// Pre-order traversal over a [`SyntaxNode`] subtree.
pub struct Preorder<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A successfully parsed and lowered source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub root: SyntaxNode,
}

impl SyntaxTree {
    /// Iterate over every node in pre-order, root first.
    pub fn preorder(&self) -> Preorder<'_> {
        self.root.preorder()
    }

    /// Total number of lowered nodes.
    pub fn node_count(&self) -> usize {
        self.preorder().count()
    }
}
