/*!
# Concatenated Lines to Text Blocks

A `+` chain of string literals, one line of text per literal, becomes a
text block. Every content line gets the same indentation so that the
compiler strips exactly what was added.
*/

use tree_sitter::Node;

use super::{ensure, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::Edit;
use crate::matcher::MatchInstance;
use crate::parser::SourceUnit;
use crate::version::VersionTag;

pub(super) fn rule() -> Rule {
    Rule::new(
        "concat-to-text-block",
        Category::TextBlock,
        VersionTag::Java16,
        "multi-line concatenation of string literals becomes a text block",
        &["binary_expression"],
        predicate,
        guard,
        rewrite,
    )
}

fn is_concat(node: Node<'_>, unit: &SourceUnit) -> bool {
    node.kind() == "binary_expression"
        && node
            .child_by_field_name("operator")
            .is_some_and(|op| unit.text_of(op) == "+")
}

/// Operands of a left-nested `+` chain, left to right
fn operands<'t>(node: Node<'t>, unit: &SourceUnit) -> Vec<Node<'t>> {
    let mut rights = Vec::new();
    let mut current = node;
    while is_concat(current, unit) {
        match (current.child_by_field_name("left"), current.child_by_field_name("right")) {
            (Some(left), Some(right)) => {
                rights.push(right);
                current = left;
            }
            _ => return Vec::new(),
        }
    }
    rights.push(current);
    rights.reverse();
    rights
}

/// Contents of plain (non text block) string literals
fn literal_contents<'u>(leaves: &[Node<'_>], unit: &'u SourceUnit) -> Option<Vec<&'u str>> {
    leaves
        .iter()
        .map(|leaf| {
            let text = unit.text_of(*leaf);
            let plain = leaf.kind() == "string_literal" && !text.starts_with("\"\"\"") && text.len() >= 2;
            plain.then(|| &text[1..text.len() - 1])
        })
        .collect()
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    if !is_concat(node, unit) || node.parent().is_some_and(|p| is_concat(p, unit)) {
        return None;
    }
    let leaves = operands(node, unit);
    if leaves.len() < 3 || literal_contents(&leaves, unit).is_none() {
        return None;
    }
    if node.start_position().row == node.end_position().row {
        return None;
    }
    Some(Captures::new(node))
}

fn contents<'u>(m: &MatchInstance, unit: &'u SourceUnit) -> Result<(Vec<&'u str>, String), Abstain> {
    let node = m.anchor(unit)?;
    let leaves = operands(node, unit);
    let contents = literal_contents(&leaves, unit).ok_or_else(|| Abstain::new("operand is not a string literal"))?;
    let indent = unit.indent_at(leaves[1].start_byte()).to_string();
    Ok((contents, indent))
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let (contents, _) = contents(m, unit)?;
    let (last, lines) = contents
        .split_last()
        .ok_or_else(|| Abstain::new("empty concatenation"))?;

    ensure(
        lines.iter().all(|c| c.ends_with("\\n")),
        "a literal other than the last does not end a line",
    )?;
    for content in &contents {
        ensure(!content.contains("\\\\"), "literal contains an escaped backslash")?;
        ensure(!content.contains("\\\"\\\"\\\""), "literal contains a text block delimiter")?;
        let line = content.strip_suffix("\\n").unwrap_or(content);
        ensure(
            !line.ends_with(' ') && !line.ends_with('\t') && !line.ends_with("\\t"),
            "line ends with whitespace the text block would strip",
        )?;
    }

    if !last.ends_with("\\n") {
        let anchored = contents
            .iter()
            .map(|c| c.strip_suffix("\\n").unwrap_or(c))
            .any(|line| !line.is_empty() && !line.starts_with([' ', '\t']));
        ensure(anchored, "every line starts with whitespace")?;
    }
    Ok(())
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let (contents, indent) = contents(m, unit)?;
    let mut text = String::from("\"\"\"\n");
    let mut closed_line = false;
    for (i, content) in contents.iter().enumerate() {
        let (line, newline) = match content.strip_suffix("\\n") {
            Some(line) => (line, true),
            None => (*content, false),
        };
        if !line.is_empty() {
            text.push_str(&indent);
            text.push_str(line);
        }
        if newline {
            text.push('\n');
        }
        closed_line = newline && i == contents.len() - 1;
    }
    if closed_line {
        text.push_str(&indent);
    }
    text.push_str("\"\"\"");
    Ok(Rewrite::single(Edit::replace(m.span, text)))
}
