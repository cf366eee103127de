/*!
# Syntax Helpers

Small queries over tree-sitter-java nodes shared by rule predicates and
guards: statement navigation, name resolution within a compilation unit and
modifier inspection. Resolution is syntactic only; callers treat a `None`
as "unknown" and abstain.
*/

use std::collections::BTreeSet;

use tree_sitter::Node;

use super::SourceUnit;
use crate::edit::Span;

/// Node kinds that introduce a method-like scope for locals
pub const CALLABLE_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
    "static_initializer",
];

/// Parents whose children form a statement list
pub const STATEMENT_LISTS: &[&str] = &["block", "constructor_body", "switch_block_statement_group"];

/// Whether `node` sits directly in a statement list
pub fn in_statement_list(node: Node<'_>) -> bool {
    node.parent()
        .is_some_and(|p| STATEMENT_LISTS.contains(&p.kind()))
}

pub fn is_comment(node: Node<'_>) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment")
}

/// Named children, comments excluded
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|n| !is_comment(*n))
        .collect();
    children
}

/// All children (named or not) of the given kind
pub fn children_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .children(&mut cursor)
        .filter(|n| n.kind() == kind)
        .collect();
    children
}

pub fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    children_of_kind(node, kind).into_iter().next()
}

/// Every child stored under `field`
pub fn field_all<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node.children_by_field_name(field, &mut cursor).collect();
    children
}

/// Statements of a body: a block's statements or the single statement
pub fn statements(node: Node<'_>) -> Vec<Node<'_>> {
    if node.kind() == "block" {
        named_children(node)
    } else {
        vec![node]
    }
}

/// Unwrap any number of parentheses
pub fn strip_parens(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while current.kind() == "parenthesized_expression" {
        match named_children(current).first() {
            Some(inner) => current = *inner,
            None => break,
        }
    }
    current
}

/// Next named sibling that is not a comment
pub fn next_statement(node: Node<'_>) -> Option<Node<'_>> {
    let mut next = node.next_named_sibling();
    while let Some(sibling) = next {
        if !is_comment(sibling) {
            return Some(sibling);
        }
        next = sibling.next_named_sibling();
    }
    None
}

/// Previous named sibling that is not a comment
pub fn prev_statement(node: Node<'_>) -> Option<Node<'_>> {
    let mut prev = node.prev_named_sibling();
    while let Some(sibling) = prev {
        if !is_comment(sibling) {
            return Some(sibling);
        }
        prev = sibling.prev_named_sibling();
    }
    None
}

/// Siblings after `node` in the same parent, comments excluded
pub fn following_statements(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut next = next_statement(node);
    while let Some(sibling) = next {
        out.push(sibling);
        next = next_statement(sibling);
    }
    out
}

/// `node` and all of its descendants in pre-order
pub fn descendants(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    'walk: loop {
        out.push(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.node() == node {
                break 'walk;
            }
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
    out
}

pub fn contains_kind(node: Node<'_>, kinds: &[&str]) -> bool {
    descendants(node).iter().any(|n| kinds.contains(&n.kind()))
}

/// Closest strict ancestor whose kind is in `kinds`
pub fn ancestor<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if kinds.contains(&parent.kind()) {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

pub fn enclosing_callable(node: Node<'_>) -> Option<Node<'_>> {
    ancestor(node, CALLABLE_KINDS)
}

/// Whether `node` is the child stored under `field` of its parent
pub fn is_field_of_parent(node: Node<'_>, field: &str) -> bool {
    node.parent()
        .and_then(|p| p.child_by_field_name(field))
        .is_some_and(|n| n == node)
}

/// Whether an identifier denotes a variable use rather than a declaration,
/// a member name, a label or part of a package name
pub fn is_reference(node: Node<'_>) -> bool {
    if node.kind() != "identifier" {
        return false;
    }
    let Some(parent) = node.parent() else {
        return true;
    };
    match parent.kind() {
        "method_invocation" => !is_field_of_parent(node, "name"),
        "field_access" => !is_field_of_parent(node, "field"),
        "variable_declarator"
        | "formal_parameter"
        | "catch_formal_parameter"
        | "enhanced_for_statement"
        | "resource"
        | "method_declaration"
        | "constructor_declaration"
        | "class_declaration"
        | "interface_declaration"
        | "enum_declaration"
        | "record_declaration"
        | "annotation_type_declaration"
        | "enum_constant" => !is_field_of_parent(node, "name"),
        "lambda_expression" => !is_field_of_parent(node, "parameters"),
        "inferred_parameters"
        | "scoped_identifier"
        | "marker_annotation"
        | "annotation"
        | "element_value_pair"
        | "labeled_statement"
        | "break_statement"
        | "continue_statement"
        | "import_declaration"
        | "package_declaration" => false,
        _ => true,
    }
}

/// Uses of the variable `name` under `node`
pub fn references<'t>(node: Node<'t>, unit: &SourceUnit, name: &str) -> Vec<Node<'t>> {
    descendants(node)
        .into_iter()
        .filter(|n| is_reference(*n) && unit.text_of(*n) == name)
        .collect()
}

/// Names of all variables used under `node`
pub fn referenced_names(node: Node<'_>, unit: &SourceUnit) -> BTreeSet<String> {
    descendants(node)
        .into_iter()
        .filter(|n| is_reference(*n))
        .map(|n| unit.text_of(n).to_string())
        .collect()
}

/// Variable written by an assignment or update: `x` or `this.x`
pub fn target_name<'u>(node: Node<'_>, unit: &'u SourceUnit) -> Option<&'u str> {
    let node = strip_parens(node);
    match node.kind() {
        "identifier" => Some(unit.text_of(node)),
        "field_access" => {
            let object = node.child_by_field_name("object")?;
            let field = node.child_by_field_name("field")?;
            (object.kind() == "this").then(|| unit.text_of(field))
        }
        _ => None,
    }
}

/// Assignment and update expressions under `node`, with their targets
pub fn writes<'t>(node: Node<'t>) -> Vec<(Node<'t>, Node<'t>)> {
    descendants(node)
        .into_iter()
        .filter_map(|n| match n.kind() {
            "assignment_expression" => n.child_by_field_name("left").map(|t| (n, t)),
            "update_expression" => named_children(n).first().map(|t| (n, *t)),
            _ => None,
        })
        .collect()
}

/// Names of variables written anywhere under `node`
pub fn assigned_names(node: Node<'_>, unit: &SourceUnit) -> BTreeSet<String> {
    writes(node)
        .into_iter()
        .filter_map(|(_, target)| target_name(target, unit))
        .map(str::to_string)
        .collect()
}

/// Name node introduced by a declaring node, if it declares one
fn declared_name(node: Node<'_>) -> Vec<Node<'_>> {
    match node.kind() {
        "variable_declarator"
        | "formal_parameter"
        | "spread_parameter"
        | "catch_formal_parameter"
        | "enhanced_for_statement"
        | "resource" => node
            .child_by_field_name("name")
            .or_else(|| {
                // spread parameters nest their declarator
                child_of_kind(node, "variable_declarator").and_then(|d| d.child_by_field_name("name"))
            })
            .into_iter()
            .collect(),
        "lambda_expression" => node
            .child_by_field_name("parameters")
            .filter(|p| p.kind() == "identifier")
            .into_iter()
            .collect(),
        "inferred_parameters" => named_children(node),
        _ => Vec::new(),
    }
}

/// Names declared under `node`, skipping anything inside `exclude`
pub fn declared_names(node: Node<'_>, unit: &SourceUnit, exclude: Option<Span>) -> BTreeSet<String> {
    descendants(node)
        .into_iter()
        .filter(|n| exclude.map_or(true, |span| !span.contains(&Span::of(*n))))
        .flat_map(declared_name)
        .filter(|n| n.kind() == "identifier")
        .map(|n| unit.text_of(n).to_string())
        .collect()
}

/// Whether `name` is a local or parameter of the callable around `node`
pub fn is_local(name: &str, node: Node<'_>, unit: &SourceUnit) -> bool {
    enclosing_callable(node).is_some_and(|scope| declared_names(scope, unit, None).contains(name))
}

/// Declared type of the variable `name` visible at `at`
///
/// Locals and parameters of the enclosing callable are searched first (the
/// last declaration before `at` wins), then fields of enclosing classes.
/// Declarators with C-style array dimensions resolve to `None`.
pub fn declared_type<'t>(name: &str, at: Node<'t>, unit: &SourceUnit) -> Option<Node<'t>> {
    if let Some(scope) = enclosing_callable(at) {
        let mut found = None;
        for node in descendants(scope) {
            if node.start_byte() >= at.start_byte() {
                break;
            }
            let names = declared_name(node);
            if !names.iter().any(|n| unit.text_of(*n) == name) {
                continue;
            }
            found = Some(declaration_type(node));
        }
        if let Some(ty) = found {
            return ty;
        }
    }
    field_type(name, at, unit)
}

/// Declared type of the field `name` of a class enclosing `at`
pub fn field_type<'t>(name: &str, at: Node<'t>, unit: &SourceUnit) -> Option<Node<'t>> {
    let mut current = ancestor(at, &["class_body"]);
    while let Some(body) = current {
        for field in children_of_kind(body, "field_declaration") {
            for declarator in field_all(field, "declarator") {
                let matches = declarator
                    .child_by_field_name("name")
                    .is_some_and(|n| unit.text_of(n) == name);
                if matches {
                    return declaration_type(declarator);
                }
            }
        }
        current = ancestor(body, &["class_body"]);
    }
    None
}

fn declaration_type(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "variable_declarator" => {
            if node.child_by_field_name("dimensions").is_some() {
                return None;
            }
            node.parent()?.child_by_field_name("type")
        }
        "formal_parameter" => {
            if node.child_by_field_name("dimensions").is_some() {
                return None;
            }
            node.child_by_field_name("type")
        }
        "enhanced_for_statement" | "resource" => node.child_by_field_name("type"),
        _ => None,
    }
}

/// Simple name of a type: generics and qualification removed, array
/// brackets kept
pub fn simple_type_name(text: &str) -> &str {
    let text = text.trim();
    let (base, suffix) = match (text.find('<'), text.rfind('>')) {
        (Some(open), Some(close)) if open < close => (&text[..open], &text[close + 1..]),
        _ => (text, ""),
    };
    // List<String>[] is an array
    if suffix.trim_start().starts_with('[') {
        return "[]";
    }
    base.rsplit('.').next().unwrap_or(base).trim()
}

/// Text with every whitespace character removed
pub fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Words of a declaration's modifier list: keywords verbatim, annotations
/// as their source text
pub fn modifier_words<'u>(node: Node<'_>, unit: &'u SourceUnit) -> Vec<&'u str> {
    let Some(modifiers) = child_of_kind(node, "modifiers") else {
        return Vec::new();
    };
    let mut cursor = modifiers.walk();
    let words = modifiers
        .children(&mut cursor)
        .filter(|n| !is_comment(*n))
        .map(|n| unit.text_of(n))
        .collect();
    words
}

pub fn has_modifier(node: Node<'_>, unit: &SourceUnit, word: &str) -> bool {
    modifier_words(node, unit).contains(&word)
}

pub fn is_annotation(word: &str) -> bool {
    word.starts_with('@')
}

/// Remove up to `columns` leading blanks from every line after the first
pub fn dedent_tail(text: &str, columns: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            let blanks = line
                .bytes()
                .take(columns)
                .take_while(|b| *b == b' ' || *b == b'\t')
                .count();
            out.push_str(&line[blanks..]);
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Whether `node` contains a string literal spanning several lines
pub fn contains_text_block(node: Node<'_>, unit: &SourceUnit) -> bool {
    descendants(node)
        .into_iter()
        .any(|n| n.kind() == "string_literal" && unit.text_of(n).starts_with("\"\"\""))
}
