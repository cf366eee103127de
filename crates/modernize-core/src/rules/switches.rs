/*!
# Returning Switch Statements

A statement switch whose every group is a single `return` is a switch
expression under a single `return`.
*/

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::Edit;
use crate::matcher::MatchInstance;
use crate::parser::syntax::{children_of_kind, in_statement_list, named_children};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

const PATTERN_LABELS: &[&str] = &["pattern", "type_pattern", "record_pattern", "guard"];

pub(super) fn rule() -> Rule {
    Rule::new(
        "switch-return-to-expression",
        Category::SwitchExpression,
        VersionTag::Java14,
        "switch statement returning from every case becomes a returned switch expression",
        &["switch_expression"],
        predicate,
        guard,
        rewrite,
    )
}

/// Statements of a group, labels excluded
fn group_statements(group: Node<'_>) -> Vec<Node<'_>> {
    named_children(group)
        .into_iter()
        .filter(|n| n.kind() != "switch_label")
        .collect()
}

/// Labels and statements of each arm, stacked fall-through labels folded
/// into the group that finally has statements
fn folded_groups(body: Node<'_>) -> Option<Vec<(Vec<Node<'_>>, Vec<Node<'_>>)>> {
    let mut folded = Vec::new();
    let mut pending = Vec::new();
    for group in children_of_kind(body, "switch_block_statement_group") {
        pending.extend(children_of_kind(group, "switch_label"));
        let statements = group_statements(group);
        if !statements.is_empty() {
            folded.push((std::mem::take(&mut pending), statements));
        }
    }
    (pending.is_empty() && !folded.is_empty()).then_some(folded)
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    if !in_statement_list(node) {
        return None;
    }
    let body = node.child_by_field_name("body")?;
    if !children_of_kind(body, "switch_rule").is_empty() {
        return None;
    }
    let all_return = folded_groups(body)?
        .iter()
        .all(|(_, statements)| statements.last().is_some_and(|s| s.kind() == "return_statement"));
    if !all_return {
        return None;
    }
    Some(Captures::new(node).bind("condition", node.child_by_field_name("condition")?, unit))
}

/// Label expressions of an arm, `None` for the default arm
fn arm_labels(labels: &[Node<'_>], unit: &SourceUnit) -> Result<Option<Vec<String>>, Abstain> {
    let mut expressions = Vec::new();
    let mut default = false;
    for label in labels {
        let values = named_children(*label);
        ensure(
            !values.iter().any(|v| PATTERN_LABELS.contains(&v.kind())),
            "case label is a pattern",
        )?;
        if values.is_empty() {
            default = true;
        }
        expressions.extend(values.iter().map(|v| unit.text_of(*v).to_string()));
    }
    if default {
        ensure(expressions.is_empty(), "default shares a group with case labels")?;
        return Ok(None);
    }
    Ok(Some(expressions))
}

fn arms<'u>(node: Node<'_>, unit: &'u SourceUnit) -> Result<Vec<(Option<Vec<String>>, &'u str)>, Abstain> {
    let body = require(node.child_by_field_name("body"), "switch has no body")?;
    let groups = require(folded_groups(body), "switch has a dangling label")?;
    let mut arms = Vec::new();
    for (labels, statements) in groups {
        let [ret] = statements.as_slice() else {
            return Err(Abstain::new("case group does more than return"));
        };
        let value = require(named_children(*ret).first().copied(), "case returns no value")?;
        arms.push((arm_labels(&labels, unit)?, unit.text_of(value)));
    }
    Ok(arms)
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let arms = arms(m.anchor(unit)?, unit)?;
    ensure(
        arms.iter().any(|(labels, _)| labels.is_none()),
        "switch has no default",
    )?;
    Ok(())
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let node = m.anchor(unit)?;
    let base = unit.indent_at(node.start_byte());
    let body = require(node.child_by_field_name("body"), "switch has no body")?;
    let first = require(
        children_of_kind(body, "switch_block_statement_group").first().copied(),
        "switch has no cases",
    )?;
    let case_indent = unit.indent_at(first.start_byte());

    let mut text = format!("return switch {} {{\n", m.text("condition")?);
    for (labels, value) in arms(node, unit)? {
        let head = match labels {
            Some(labels) => format!("case {}", labels.join(", ")),
            None => "default".to_string(),
        };
        text.push_str(&format!("{case_indent}{head} -> {value};\n"));
    }
    text.push_str(&format!("{base}}};"));
    Ok(Rewrite::single(Edit::replace(m.span, text)))
}

#[cfg(test)]
mod tests {
    use crate::rules::testing::{assert_untouched, run_rule};
    use pretty_assertions::assert_eq;

    #[test]
    fn returning_cases_become_arms() {
        let source = r#"class Days {
    String name(int day) {
        switch (day) {
            case 1:
                return "Mon";
            case 6:
            case 7:
                return "Weekend";
            default:
                return "Other";
        }
    }
}
"#;
        let outcome = run_rule("switch-return-to-expression", source);
        assert_eq!(outcome.transformations.len(), 1);
        assert_eq!(outcome.transformations[0].lines_saved, 4);
        assert_eq!(
            outcome.rewritten.unwrap(),
            r#"class Days {
    String name(int day) {
        return switch (day) {
            case 1 -> "Mon";
            case 6, 7 -> "Weekend";
            default -> "Other";
        };
    }
}
"#
        );
    }

    #[test]
    fn missing_default_is_left_alone() {
        let outcome = run_rule(
            "switch-return-to-expression",
            r#"class A {
    int f(int k) {
        switch (k) {
            case 1: return 10;
            case 2: return 20;
        }
        return 0;
    }
}
"#,
        );
        assert!(outcome.transformations.is_empty());
        assert_eq!(outcome.abstentions[0].reason, "switch has no default");
    }

    #[test]
    fn side_effects_in_a_case_are_left_alone() {
        assert_untouched(
            "switch-return-to-expression",
            r#"class A {
    int f(int k) {
        switch (k) {
            case 1:
                log(k);
                return 10;
            default:
                return 0;
        }
    }
}
"#,
        );
    }

    #[test]
    fn merged_default_is_left_alone() {
        assert_untouched(
            "switch-return-to-expression",
            r#"class A {
    int f(int k) {
        switch (k) {
            case 1:
            default:
                return 0;
        }
    }
}
"#,
        );
    }

    #[test]
    fn stacked_labels_share_one_arm() {
        let source = r#"class Sizes {
    String size(int n) {
        switch (n) {
            case 0:
                return "none";
            case 2:
            case 3:
            case 4:
                return "few";
            default:
                return "many";
        }
    }
}
"#;
        let text = run_rule("switch-return-to-expression", source).rewritten.unwrap();
        assert_eq!(
            text,
            r#"class Sizes {
    String size(int n) {
        return switch (n) {
            case 0 -> "none";
            case 2, 3, 4 -> "few";
            default -> "many";
        };
    }
}
"#
        );
    }

    #[test]
    fn trailing_labels_are_left_alone() {
        assert_untouched(
            "switch-return-to-expression",
            r#"class A {
    int f(int k) {
        switch (k) {
            case 1:
                return 10;
            default:
                return 0;
            case 2:
        }
    }
}
"#,
        );
    }
}
