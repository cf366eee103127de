/*!
# instanceof Pattern Matching

`if (o instanceof T) { T t = (T) o; ... }` binds `t` in the test itself:
`if (o instanceof T t) { ... }`.
*/

use tree_sitter::Node;

use super::{ensure, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::Edit;
use crate::matcher::MatchInstance;
use crate::parser::syntax::{child_of_kind, compact, field_all, statements, strip_parens};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

pub(super) fn rule() -> Rule {
    Rule::new(
        "instanceof-cast-to-pattern",
        Category::InstanceofPattern,
        VersionTag::Java16,
        "instanceof test followed by a cast binds the pattern variable directly",
        &["if_statement"],
        predicate,
        guard,
        rewrite,
    )
}

/// Operand shapes whose value cannot change between the test and the cast
fn is_stable_operand(node: Node<'_>) -> bool {
    match node.kind() {
        "identifier" => true,
        "field_access" => node
            .child_by_field_name("object")
            .is_some_and(|o| matches!(o.kind(), "this" | "identifier")),
        _ => false,
    }
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let test = strip_parens(node.child_by_field_name("condition")?);
    if test.kind() != "instanceof_expression"
        || test.child_by_field_name("name").is_some()
        || test.child_by_field_name("pattern").is_some()
    {
        return None;
    }
    let operand = strip_parens(test.child_by_field_name("left")?);
    let ty = test.child_by_field_name("right")?;

    let consequence = node.child_by_field_name("consequence")?;
    if consequence.kind() != "block" {
        return None;
    }
    let decl = *statements(consequence).first()?;
    if decl.kind() != "local_variable_declaration" {
        return None;
    }
    let declarators = field_all(decl, "declarator");
    let [declarator] = declarators.as_slice() else {
        return None;
    };
    let declarator = *declarator;
    let cast = strip_parens(declarator.child_by_field_name("value")?);
    if cast.kind() != "cast_expression" {
        return None;
    }
    let cast_type = cast.child_by_field_name("type")?;
    let cast_value = strip_parens(cast.child_by_field_name("value")?);
    if compact(unit.text_of(cast_type)) != compact(unit.text_of(ty))
        || compact(unit.text_of(cast_value)) != compact(unit.text_of(operand))
    {
        return None;
    }

    Some(
        Captures::new(decl)
            .site(ty)
            .bind("type", ty, unit)
            .bind("operand", operand, unit)
            .bind("declared", decl.child_by_field_name("type")?, unit)
            .bind("name", declarator.child_by_field_name("name")?, unit)
            .bind("declarator", declarator, unit),
    )
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let decl = unit
        .node_at(m.span, "local_variable_declaration")
        .ok_or_else(|| Abstain::new("declaration not found"))?;
    let declared = m.text("declared")?;
    let ty = m.node("type", unit)?;
    let operand = m.node("operand", unit)?;
    let declarator = m.node("declarator", unit)?;

    ensure(
        declared == "var" || compact(declared) == compact(m.text("type")?),
        "declared type differs from the tested type",
    )?;
    ensure(child_of_kind(decl, "modifiers").is_none(), "declaration has modifiers")?;
    ensure(is_stable_operand(operand), "tested operand may change before the cast")?;
    ensure(ty.kind() != "generic_type", "generic type tests are unchecked")?;
    ensure(
        declarator.child_by_field_name("dimensions").is_none(),
        "declarator has array dimensions",
    )?;
    Ok(())
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let ty = m.binding("type")?;
    let name = m.text("name")?;
    Ok(Rewrite::new(vec![
        Edit::replace(ty.span, format!("{} {name}", ty.text)),
        Edit::remove(unit.text(), m.span),
    ]))
}
