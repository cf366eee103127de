/*!
# Unnamed Catch Parameters

A caught exception that is never used is declared as `_`.
*/

use tree_sitter::Node;

use super::{ensure, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::Edit;
use crate::matcher::MatchInstance;
use crate::parser::syntax::{child_of_kind, references};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

pub(super) fn rule() -> Rule {
    Rule::new(
        "unused-catch-to-unnamed",
        Category::UnnamedVariable,
        VersionTag::Java25,
        "unused catch parameter becomes the unnamed variable",
        &["catch_clause"],
        predicate,
        guard,
        rewrite,
    )
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let param = child_of_kind(node, "catch_formal_parameter")?;
    let name = param.child_by_field_name("name")?;
    if name.kind() != "identifier" || unit.text_of(name) == "_" {
        return None;
    }
    Some(
        Captures::new(name)
            .bind("name", name, unit)
            .bind("body", node.child_by_field_name("body")?, unit),
    )
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let body = m.node("body", unit)?;
    let name = m.text("name")?;
    ensure(
        references(body, unit, name).is_empty(),
        "caught exception is used",
    )?;
    Ok(())
}

fn rewrite(m: &MatchInstance, _unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    Ok(Rewrite::single(Edit::replace(m.span, "_")))
}
