//! Python parser: tree-sitter CST lowered into the tagged tree.
//!
//! The lowering keeps only the constructs detectors care about and splices
//! everything else away. Name loads survive as [`NodeKind::Name`]; name
//! *bindings* (assignment targets, parameters, aliases) are recorded on their
//! owning nodes instead, so a plain `Name` downstream always means a use.

use once_cell::sync::Lazy;
use tree_sitter::{Language, Node, Parser};

use super::tree::{NodeKind, Span, SyntaxNode, SyntaxTree};
use super::{ParseFailure, ParseOutcome};

/// Static storage for the Python grammar.
static PYTHON: Lazy<Language> = Lazy::new(|| tree_sitter_python::LANGUAGE.into());

/// Parse Python source into a lowered tree.
pub fn parse(source: &str) -> ParseOutcome {
    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&PYTHON) {
        return ParseOutcome::Failed(ParseFailure::Internal(format!(
            "loading Python grammar: {err}"
        )));
    }
    let Some(cst) = parser.parse(source, None) else {
        return ParseOutcome::Failed(ParseFailure::Internal(
            "tree-sitter produced no tree".to_string(),
        ));
    };
    let root = cst.root_node();
    if root.has_error() {
        return ParseOutcome::Failed(syntax_failure(root, source));
    }
    ParseOutcome::Parsed(SyntaxTree {
        root: lower_module(root, source),
    })
}

fn text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Locate the first ERROR or MISSING node and describe it.
fn syntax_failure(root: Node, source: &str) -> ParseFailure {
    let Some(node) = find_error(root) else {
        return ParseFailure::Syntax {
            message: "invalid syntax".to_string(),
            line: 0,
            column: 0,
        };
    };
    let span = Span::from_node(node);
    // An error that swallows the rest of the file is almost always an
    // unclosed bracket or string; anything recovered mid-file is not.
    let message = if node.end_byte() >= source.trim_end().len() {
        "unexpected end of input".to_string()
    } else {
        "invalid syntax".to_string()
    };
    ParseFailure::Syntax {
        message,
        line: span.start_line,
        column: span.start_col,
    }
}

/// Depth-first search for the leftmost ERROR or MISSING node, descending only
/// into subtrees that actually contain an error.
fn find_error(root: Node) -> Option<Node> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn lower_module(root: Node, source: &str) -> SyntaxNode {
    let mut children = Vec::new();
    lower_children(root, source, &mut children);
    SyntaxNode {
        kind: NodeKind::Module,
        span: Span::from_node(root),
        children,
    }
}

/// Lower every named child of `node` into `out`.
fn lower_children(node: Node, source: &str, out: &mut Vec<SyntaxNode>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        lower_into(child, source, out);
    }
}

/// Lower every named child except the ones with the given node ids.
fn lower_children_except(node: Node, skip: &[usize], source: &str, out: &mut Vec<SyntaxNode>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if skip.contains(&child.id()) {
            continue;
        }
        lower_into(child, source, out);
    }
}

/// Lower one CST node: emit a tagged node for the kinds detectors understand,
/// flatten everything else into the parent.
fn lower_into(node: Node, source: &str, out: &mut Vec<SyntaxNode>) {
    let span = Span::from_node(node);
    match node.kind() {
        "comment" => {}

        "function_definition" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, source).to_string())
                .unwrap_or_default();
            let mut params = Vec::new();
            if let Some(parameters) = node.child_by_field_name("parameters") {
                param_names(parameters, source, &mut params);
            }
            let has_docstring = node
                .child_by_field_name("body")
                .map(body_has_docstring)
                .unwrap_or(false);
            let mut children = Vec::new();
            if let Some(body) = node.child_by_field_name("body") {
                lower_children(body, source, &mut children);
            }
            out.push(SyntaxNode {
                kind: NodeKind::FunctionDef {
                    name,
                    params,
                    has_docstring,
                },
                span,
                children,
            });
        }

        "class_definition" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, source).to_string())
                .unwrap_or_default();
            let has_docstring = node
                .child_by_field_name("body")
                .map(body_has_docstring)
                .unwrap_or(false);
            let mut children = Vec::new();
            if let Some(superclasses) = node.child_by_field_name("superclasses") {
                lower_children(superclasses, source, &mut children);
            }
            if let Some(body) = node.child_by_field_name("body") {
                lower_children(body, source, &mut children);
            }
            out.push(SyntaxNode {
                kind: NodeKind::ClassDef {
                    name,
                    has_docstring,
                },
                span,
                children,
            });
        }

        "if_statement" | "elif_clause" => {
            let mut children = Vec::new();
            lower_children(node, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::Branch,
                span,
                children,
            });
        }

        "while_statement" => {
            let mut children = Vec::new();
            lower_children(node, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::While,
                span,
                children,
            });
        }

        "for_statement" => {
            let left = node.child_by_field_name("left");
            let mut targets = Vec::new();
            if let Some(left) = left {
                pattern_names(left, source, &mut targets);
            }
            let iter_calls = node
                .child_by_field_name("right")
                .map(|right| call_chain(right, source))
                .unwrap_or_default();
            let skip: Vec<usize> = left.map(|l| l.id()).into_iter().collect();
            let mut children = Vec::new();
            lower_children_except(node, &skip, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::For {
                    targets,
                    iter_calls,
                },
                span,
                children,
            });
        }

        "except_clause" | "except_group_clause" => {
            let mut children = Vec::new();
            lower_children(node, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::ExceptClause,
                span,
                children,
            });
        }

        "boolean_operator" => {
            let mut children = Vec::new();
            lower_children(node, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::BoolOp { operands: 2 },
                span,
                children,
            });
        }

        "call" => {
            let callee = node.child_by_field_name("function").and_then(|f| {
                (f.kind() == "identifier").then(|| text(f, source).to_string())
            });
            let mut children = Vec::new();
            lower_children(node, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::Call { callee },
                span,
                children,
            });
        }

        // `f(x=1)`: the keyword name is not a variable use.
        "keyword_argument" => {
            if let Some(value) = node.child_by_field_name("value") {
                lower_into(value, source, out);
            }
        }

        "attribute" => {
            let name = node
                .child_by_field_name("attribute")
                .map(|a| text(a, source).to_string())
                .unwrap_or_default();
            let object = node.child_by_field_name("object");
            let object_is_none = object.map(|o| o.kind() == "none").unwrap_or(false);
            let mut children = Vec::new();
            if let Some(object) = object {
                lower_into(object, source, &mut children);
            }
            out.push(SyntaxNode {
                kind: NodeKind::Attribute {
                    name,
                    object_is_none,
                },
                span,
                children,
            });
        }

        "identifier" => {
            out.push(SyntaxNode {
                kind: NodeKind::Name {
                    id: text(node, source).to_string(),
                },
                span,
                children: Vec::new(),
            });
        }

        "import_statement" => {
            let mut names = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    // `import a.b` binds `a`
                    "dotted_name" => {
                        if let Some(first) = text(child, source).split('.').next() {
                            names.push(first.to_string());
                        }
                    }
                    "aliased_import" => {
                        if let Some(alias) = child.child_by_field_name("alias") {
                            names.push(text(alias, source).to_string());
                        }
                    }
                    _ => {}
                }
            }
            out.push(SyntaxNode {
                kind: NodeKind::Import {
                    names,
                    is_wildcard: false,
                },
                span,
                children: Vec::new(),
            });
        }

        "import_from_statement" | "future_import_statement" => {
            let mut names = Vec::new();
            let mut is_wildcard = false;
            let mut cursor = node.walk();
            for child in node.children_by_field_name("name", &mut cursor) {
                match child.kind() {
                    "dotted_name" | "identifier" => {
                        names.push(text(child, source).to_string());
                    }
                    "aliased_import" => {
                        if let Some(alias) = child.child_by_field_name("alias") {
                            names.push(text(alias, source).to_string());
                        }
                    }
                    _ => {}
                }
            }
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "wildcard_import" {
                    is_wildcard = true;
                }
            }
            out.push(SyntaxNode {
                kind: NodeKind::Import { names, is_wildcard },
                span,
                children: Vec::new(),
            });
        }

        "assignment" => {
            let left = node.child_by_field_name("left");
            let mut targets = Vec::new();
            if let Some(left) = left {
                pattern_names(left, source, &mut targets);
            }
            let skip: Vec<usize> = left.map(|l| l.id()).into_iter().collect();
            let mut children = Vec::new();
            lower_children_except(node, &skip, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::Assign { targets },
                span,
                children,
            });
        }

        "augmented_assignment" => {
            let op = node
                .child_by_field_name("operator")
                .map(|o| text(o, source).to_string())
                .unwrap_or_default();
            let skip: Vec<usize> = node
                .child_by_field_name("left")
                .map(|l| l.id())
                .into_iter()
                .collect();
            let mut children = Vec::new();
            lower_children_except(node, &skip, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::AugAssign { op },
                span,
                children,
            });
        }

        // `(y := value)`
        "named_expression" => {
            let mut names = Vec::new();
            if let Some(name) = node.child_by_field_name("name") {
                identifier_names(name, source, &mut names);
            }
            let mut children = Vec::new();
            if let Some(value) = node.child_by_field_name("value") {
                lower_into(value, source, &mut children);
            }
            out.push(SyntaxNode {
                kind: NodeKind::Binding { names },
                span,
                children,
            });
        }

        // `expr as alias` in `with` and `except`
        "as_pattern" => {
            let alias = node.child_by_field_name("alias");
            let mut names = Vec::new();
            if let Some(alias) = alias {
                identifier_names(alias, source, &mut names);
            }
            let skip: Vec<usize> = alias.map(|a| a.id()).into_iter().collect();
            let mut children = Vec::new();
            lower_children_except(node, &skip, source, &mut children);
            out.push(SyntaxNode {
                kind: NodeKind::Binding { names },
                span,
                children,
            });
        }

        // `for x in xs` inside a comprehension
        "for_in_clause" => {
            let mut names = Vec::new();
            if let Some(left) = node.child_by_field_name("left") {
                pattern_names(left, source, &mut names);
            }
            let mut children = Vec::new();
            if let Some(right) = node.child_by_field_name("right") {
                lower_into(right, source, &mut children);
            }
            out.push(SyntaxNode {
                kind: NodeKind::Binding { names },
                span,
                children,
            });
        }

        // Lambda parameters leak into the enclosing scope on purpose: the
        // symbol table stays a conservative superset.
        "lambda" => {
            let mut names = Vec::new();
            if let Some(parameters) = node.child_by_field_name("parameters") {
                param_names(parameters, source, &mut names);
            }
            let mut children = Vec::new();
            if let Some(body) = node.child_by_field_name("body") {
                lower_into(body, source, &mut children);
            }
            out.push(SyntaxNode {
                kind: NodeKind::Binding { names },
                span,
                children,
            });
        }

        "global_statement" | "nonlocal_statement" => {
            let mut names = Vec::new();
            identifier_names(node, source, &mut names);
            out.push(SyntaxNode {
                kind: NodeKind::Binding { names },
                span,
                children: Vec::new(),
            });
        }

        // Literal leaves. String interpolations are deliberately not
        // descended into; the symbol table treats them as opaque.
        "string" | "concatenated_string" | "integer" | "float" | "true" | "false" | "none"
        | "ellipsis" => {
            out.push(SyntaxNode {
                kind: NodeKind::Literal,
                span,
                children: Vec::new(),
            });
        }

        _ => lower_children(node, source, out),
    }
}

/// First statement of a block is a bare string literal.
fn body_has_docstring(body: Node) -> bool {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    let Some(first) = first else { return false };
    if first.kind() != "expression_statement" {
        return false;
    }
    first
        .named_child(0)
        .map(|expr| expr.kind() == "string" || expr.kind() == "concatenated_string")
        .unwrap_or(false)
}

/// Collect plainly-named targets out of an assignment or loop pattern.
/// Attribute and subscript targets bind nothing.
fn pattern_names(node: Node, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" => out.push(text(node, source).to_string()),
        "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                pattern_names(child, source, out);
            }
        }
        _ => {}
    }
}

/// Collect every identifier under `node` (used for alias and global lists).
fn identifier_names(node: Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "identifier" {
        out.push(text(node, source).to_string());
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        identifier_names(child, source, out);
    }
}

/// Collect parameter names from a `parameters` node, skipping defaults,
/// annotations, and the `/` / `*` separators.
fn param_names(parameters: Node, source: &str, out: &mut Vec<String>) {
    let mut cursor = parameters.walk();
    for child in parameters.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push(text(child, source).to_string()),
            "typed_parameter" => {
                if let Some(inner) = child.named_child(0) {
                    pattern_names(inner, source, out);
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = child.child_by_field_name("name") {
                    pattern_names(name, source, out);
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                if let Some(inner) = child.named_child(0) {
                    pattern_names(inner, source, out);
                }
            }
            _ => {}
        }
    }
}

/// Nested single-argument call chain with plain-identifier callees,
/// outermost first. Stops at the first non-call argument or multi-argument
/// call, so `range(0, len(x))` yields just `["range"]`.
fn call_chain(node: Node, source: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = node;
    loop {
        if current.kind() != "call" {
            break;
        }
        let Some(function) = current.child_by_field_name("function") else {
            break;
        };
        if function.kind() != "identifier" {
            break;
        }
        chain.push(text(function, source).to_string());
        let Some(arguments) = current.child_by_field_name("arguments") else {
            break;
        };
        let mut cursor = arguments.walk();
        let args: Vec<Node> = arguments
            .named_children(&mut cursor)
            .filter(|arg| arg.kind() != "comment")
            .collect();
        if args.len() != 1 {
            break;
        }
        current = args[0];
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> SyntaxTree {
        match parse(source) {
            ParseOutcome::Parsed(tree) => tree,
            ParseOutcome::Failed(failure) => panic!("expected parse, got {failure:?}"),
        }
    }

    fn parse_err(source: &str) -> ParseFailure {
        match parse(source) {
            ParseOutcome::Failed(failure) => failure,
            ParseOutcome::Parsed(_) => panic!("expected failure for {source:?}"),
        }
    }

    #[test]
    fn lowers_function_with_params_and_docstring() {
        let tree = parse_ok(
            r#"
def greet(name, count=1, *args, **kwargs):
    """Say hello."""
    return name * count
"#,
        );
        let func = tree
            .preorder()
            .find_map(|n| match &n.kind {
                NodeKind::FunctionDef {
                    name,
                    params,
                    has_docstring,
                } => Some((name.clone(), params.clone(), *has_docstring)),
                _ => None,
            })
            .expect("function node");
        assert_eq!(func.0, "greet");
        assert_eq!(func.1, vec!["name", "count", "args", "kwargs"]);
        assert!(func.2);
    }

    #[test]
    fn function_without_docstring_is_marked() {
        let tree = parse_ok("def f():\n    return 1\n");
        let has_docstring = tree
            .preorder()
            .find_map(|n| match &n.kind {
                NodeKind::FunctionDef { has_docstring, .. } => Some(*has_docstring),
                _ => None,
            })
            .unwrap();
        assert!(!has_docstring);
    }

    #[test]
    fn lowers_class_with_methods() {
        let tree = parse_ok(
            r#"
class Greeter(Base):
    """Greets."""

    def hello(self):
        pass
"#,
        );
        let class = tree
            .preorder()
            .find(|n| matches!(n.kind, NodeKind::ClassDef { .. }))
            .expect("class node");
        match &class.kind {
            NodeKind::ClassDef {
                name,
                has_docstring,
            } => {
                assert_eq!(name, "Greeter");
                assert!(has_docstring);
            }
            _ => unreachable!(),
        }
        // Base class reference and the method live under the class node.
        assert!(class
            .preorder()
            .any(|n| n.kind == NodeKind::Name { id: "Base".into() }));
        assert!(class
            .preorder()
            .any(|n| matches!(&n.kind, NodeKind::FunctionDef { name, .. } if name == "hello")));
    }

    #[test]
    fn for_loop_captures_targets_and_iter_chain() {
        let tree = parse_ok("for i in range(len(items)):\n    print(items[i])\n");
        let (targets, iter_calls) = tree
            .preorder()
            .find_map(|n| match &n.kind {
                NodeKind::For {
                    targets,
                    iter_calls,
                } => Some((targets.clone(), iter_calls.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(targets, vec!["i"]);
        assert_eq!(iter_calls, vec!["range", "len"]);
    }

    #[test]
    fn multi_argument_range_breaks_the_chain() {
        let tree = parse_ok("for i in range(0, len(items)):\n    pass\n");
        let iter_calls = tree
            .preorder()
            .find_map(|n| match &n.kind {
                NodeKind::For { iter_calls, .. } => Some(iter_calls.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(iter_calls, vec!["range"]);
    }

    #[test]
    fn elif_chains_lower_to_stacked_branches() {
        let tree = parse_ok(
            "if a:\n    pass\nelif b:\n    pass\nelif c:\n    pass\nelse:\n    pass\n",
        );
        let branches = tree
            .preorder()
            .filter(|n| matches!(n.kind, NodeKind::Branch))
            .count();
        assert_eq!(branches, 3);
    }

    #[test]
    fn chained_boolean_operators_count_once_each() {
        let tree = parse_ok("x = a and b and c or d\n");
        let bool_ops = tree
            .preorder()
            .filter(|n| matches!(n.kind, NodeKind::BoolOp { .. }))
            .count();
        assert_eq!(bool_ops, 3);
    }

    #[test]
    fn imports_bind_first_component_or_alias() {
        let tree = parse_ok("import os.path\nimport numpy as np\nfrom json import dumps\n");
        let imports: Vec<(Vec<String>, bool)> = tree
            .preorder()
            .filter_map(|n| match &n.kind {
                NodeKind::Import { names, is_wildcard } => {
                    Some((names.clone(), *is_wildcard))
                }
                _ => None,
            })
            .collect();
        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].0, vec!["os"]);
        assert_eq!(imports[1].0, vec!["np"]);
        assert_eq!(imports[2].0, vec!["dumps"]);
    }

    #[test]
    fn wildcard_import_is_flagged() {
        let tree = parse_ok("from os.path import *\n");
        let is_wildcard = tree
            .preorder()
            .find_map(|n| match &n.kind {
                NodeKind::Import { is_wildcard, .. } => Some(*is_wildcard),
                _ => None,
            })
            .unwrap();
        assert!(is_wildcard);
    }

    #[test]
    fn assignment_targets_do_not_become_name_loads() {
        let tree = parse_ok("total = count\n");
        let assigns: Vec<Vec<String>> = tree
            .preorder()
            .filter_map(|n| match &n.kind {
                NodeKind::Assign { targets } => Some(targets.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(assigns, vec![vec!["total".to_string()]]);
        let names: Vec<String> = tree
            .preorder()
            .filter_map(|n| match &n.kind {
                NodeKind::Name { id } => Some(id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["count"]);
    }

    #[test]
    fn tuple_unpacking_collects_all_targets() {
        let tree = parse_ok("a, (b, c) = values\n");
        let targets = tree
            .preorder()
            .find_map(|n| match &n.kind {
                NodeKind::Assign { targets } => Some(targets.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(targets, vec!["a", "b", "c"]);
    }

    #[test]
    fn augmented_assignment_keeps_operator_text() {
        let tree = parse_ok("x += 1\ny -= 2\n");
        let ops: Vec<String> = tree
            .preorder()
            .filter_map(|n| match &n.kind {
                NodeKind::AugAssign { op } => Some(op.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ops, vec!["+=", "-="]);
    }

    #[test]
    fn attribute_on_none_literal_is_marked() {
        let tree = parse_ok("value = None.real\n");
        let attr = tree
            .preorder()
            .find_map(|n| match &n.kind {
                NodeKind::Attribute {
                    name,
                    object_is_none,
                } => Some((name.clone(), *object_is_none)),
                _ => None,
            })
            .unwrap();
        assert_eq!(attr.0, "real");
        assert!(attr.1);
    }

    #[test]
    fn comprehension_and_walrus_targets_become_bindings() {
        let tree = parse_ok("squares = [n * n for n in numbers]\nif (m := fetch()):\n    pass\n");
        let bound: Vec<String> = tree
            .preorder()
            .filter_map(|n| match &n.kind {
                NodeKind::Binding { names } => Some(names.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert!(bound.contains(&"n".to_string()));
        assert!(bound.contains(&"m".to_string()));
    }

    #[test]
    fn with_alias_binds_through_as_pattern() {
        let tree = parse_ok("with open(path) as handle:\n    handle.read()\n");
        let bound: Vec<String> = tree
            .preorder()
            .filter_map(|n| match &n.kind {
                NodeKind::Binding { names } => Some(names.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(bound, vec!["handle"]);
    }

    #[test]
    fn unbalanced_bracket_fails_with_location() {
        let failure = parse_err("values = [1, 2, 3\n");
        match failure {
            ParseFailure::Syntax { message, line, .. } => {
                assert_eq!(message, "unexpected end of input");
                assert!(line >= 1);
            }
            other => panic!("expected syntax failure, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_fails() {
        let failure = parse_err("message = \"never closed\n");
        assert!(matches!(failure, ParseFailure::Syntax { .. }));
    }

    #[test]
    fn parse_is_deterministic() {
        let source = "def f(a, b):\n    if a and b:\n        return a\n    return b\n";
        let first = parse_ok(source);
        let second = parse_ok(source);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_source_parses_to_a_bare_module() {
        let tree = parse_ok("");
        assert_eq!(tree.root.kind, NodeKind::Module);
        assert!(tree.root.children.is_empty());
    }
}
