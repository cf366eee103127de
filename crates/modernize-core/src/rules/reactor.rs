/*!
# Reactor Operator Simplification

`.flatMap(v -> Mono.just(e))` wraps a synchronous value only to unwrap it
again; `.map(v -> e)` does the same without the inner publisher.
*/

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::{Edit, Span};
use crate::matcher::MatchInstance;
use crate::parser::syntax::{named_children, simple_type_name, strip_parens};
use crate::parser::SourceUnit;
use crate::version::{FrameworkTag, VersionTag};

pub(super) fn rule() -> Rule {
    Rule::new(
        "flatmap-just-to-map",
        Category::ReactorOperator,
        VersionTag::Java8,
        "flatMap returning Mono.just becomes map",
        &["method_invocation"],
        predicate,
        guard,
        rewrite,
    )
    .for_framework(FrameworkTag::Reactor)
}

/// `Mono.just(...)` call in a lambda's expression body
fn wrapped_value<'t>(lambda: Node<'t>, unit: &SourceUnit) -> Option<Node<'t>> {
    let body = strip_parens(lambda.child_by_field_name("body")?);
    if body.kind() != "method_invocation" {
        return None;
    }
    let object = body.child_by_field_name("object")?;
    let name = body.child_by_field_name("name")?;
    (simple_type_name(unit.text_of(object)) == "Mono" && unit.text_of(name) == "just").then_some(body)
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let name = node.child_by_field_name("name")?;
    if unit.text_of(name) != "flatMap" || node.child_by_field_name("object").is_none() {
        return None;
    }
    let arguments = named_children(node.child_by_field_name("arguments")?);
    let [lambda] = arguments.as_slice() else {
        return None;
    };
    if lambda.kind() != "lambda_expression" {
        return None;
    }
    let just = wrapped_value(*lambda, unit)?;
    Some(
        Captures::new(name)
            .site(just)
            .bind("just", just, unit),
    )
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let just = m.node("just", unit)?;
    let arguments = require(just.child_by_field_name("arguments"), "Mono.just has no arguments")?;
    ensure(named_children(arguments).len() == 1, "Mono.just does not take exactly one value")?;
    Ok(())
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let just = m.node("just", unit)?;
    let arguments = require(just.child_by_field_name("arguments"), "Mono.just has no arguments")?;
    let value = require(named_children(arguments).first().copied(), "Mono.just has no value")?;
    Ok(Rewrite::new(vec![
        Edit::replace(m.span, "map"),
        Edit::replace(Span::of(just), unit.text_of(value)),
    ]))
}
