/*!
# Null-Guarded Lazy Initialization

```java
private Cache cache;
Cache cache() { if (cache == null) { cache = new Cache(); } return cache; }
```

becomes a field initializer. Construction moves from first access to
object construction, so only side-effect free no-argument constructions of
plain fields qualify.
*/

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::{Edit, Span};
use crate::matcher::MatchInstance;
use crate::parser::syntax::{
    ancestor, child_of_kind, children_of_kind, descendants, field_all, has_modifier, in_statement_list,
    is_reference, named_children, next_statement, statements, strip_parens, target_name, writes,
};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

pub(super) fn rule() -> Rule {
    Rule::new(
        "null-guarded-lazy-init",
        Category::LazyInitToInitializer,
        VersionTag::Java8,
        "field created on first access behind a null check becomes a field initializer",
        &["if_statement"],
        predicate,
        guard,
        rewrite,
    )
}

/// `f == null` or `null == f`, yielding the field name
fn null_test<'u>(cond: Node<'_>, unit: &'u SourceUnit) -> Option<&'u str> {
    let cond = strip_parens(cond);
    if cond.kind() != "binary_expression" || unit.text_of(cond.child_by_field_name("operator")?) != "==" {
        return None;
    }
    let left = strip_parens(cond.child_by_field_name("left")?);
    let right = strip_parens(cond.child_by_field_name("right")?);
    match (left.kind(), right.kind()) {
        (_, "null_literal") => target_name(left, unit),
        ("null_literal", _) => target_name(right, unit),
        _ => None,
    }
}

/// Declarator of field `name` in the class directly enclosing `at`
fn field_declarator<'t>(name: &str, at: Node<'t>, unit: &SourceUnit) -> Option<Node<'t>> {
    let body = ancestor(at, &["class_body"])?;
    children_of_kind(body, "field_declaration")
        .into_iter()
        .flat_map(|field| field_all(field, "declarator"))
        .find(|d| d.child_by_field_name("name").is_some_and(|n| unit.text_of(n) == name))
}

/// `name`, `this.name` or `other.name`
fn names_field(node: Node<'_>, name: &str, unit: &SourceUnit) -> bool {
    let node = strip_parens(node);
    match node.kind() {
        "identifier" => unit.text_of(node) == name,
        "field_access" => node
            .child_by_field_name("field")
            .is_some_and(|f| unit.text_of(f) == name),
        _ => false,
    }
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    if !in_statement_list(node) || node.child_by_field_name("alternative").is_some() {
        return None;
    }
    let field = null_test(node.child_by_field_name("condition")?, unit)?;

    let body = statements(node.child_by_field_name("consequence")?);
    let [assign] = body.as_slice() else {
        return None;
    };
    let assignment = strip_parens(*named_children(*assign).first()?);
    if assign.kind() != "expression_statement" || assignment.kind() != "assignment_expression" {
        return None;
    }
    if unit.text_of(assignment.child_by_field_name("operator")?) != "=" {
        return None;
    }
    if target_name(assignment.child_by_field_name("left")?, unit)? != field {
        return None;
    }
    let value = assignment.child_by_field_name("right")?;

    let ret = next_statement(node)?;
    let returned = strip_parens(*named_children(ret).first()?);
    if ret.kind() != "return_statement" || target_name(returned, unit)? != field {
        return None;
    }

    let declarator = field_declarator(field, node, unit)?;
    Some(
        Captures::new(node)
            .site(declarator)
            .bind("declarator", declarator, unit)
            .bind("value", value, unit)
            .bind("return", ret, unit),
    )
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let node = m.anchor(unit)?;
    let declarator = m.node("declarator", unit)?;
    let value = m.node("value", unit)?;
    let ret = m.node("return", unit)?;
    let field_decl = require(declarator.parent(), "field declaration not found")?;
    let name_node = require(declarator.child_by_field_name("name"), "field has no name")?;
    let name = unit.text_of(name_node);

    ensure(field_all(field_decl, "declarator").len() == 1, "field shares its declaration")?;
    ensure(declarator.child_by_field_name("value").is_none(), "field already has an initializer")?;
    ensure(has_modifier(field_decl, unit, "private"), "field is not private")?;
    ensure(!has_modifier(field_decl, unit, "final"), "field is final")?;
    ensure(!has_modifier(field_decl, unit, "volatile"), "field is volatile")?;

    ensure(value.kind() == "object_creation_expression", "initial value is not a construction")?;
    let arguments = require(value.child_by_field_name("arguments"), "construction has no arguments")?;
    ensure(named_children(arguments).is_empty(), "constructor takes arguments")?;
    ensure(child_of_kind(value, "class_body").is_none(), "initial value is an anonymous class")?;

    let class = require(ancestor(node, &["class_declaration"]), "field is not in a class")?;
    ensure(
        class.child_by_field_name("superclass").is_none(),
        "class extends another class",
    )?;
    if let Some(interfaces) = class.child_by_field_name("interfaces") {
        let text = unit.text_of(interfaces);
        ensure(
            !text.contains("Serializable") && !text.contains("Externalizable"),
            "class is serializable",
        )?;
    }
    let static_field = has_modifier(field_decl, unit, "static");
    let method = require(ancestor(node, &["method_declaration"]), "guard is not in a method")?;
    ensure(
        has_modifier(method, unit, "static") == static_field,
        "field and accessor differ in staticness",
    )?;

    let body = require(class.child_by_field_name("body"), "class has no body")?;
    let assignment = Span::of(value);
    let foreign_write = writes(body).into_iter().any(|(write, target)| {
        names_field(target, name, unit) && !Span::of(write).contains(&assignment)
    });
    ensure(!foreign_write, "field is written elsewhere")?;

    let allowed = [Span::of(node), Span::of(ret)];
    let foreign_read = descendants(body).into_iter().any(|n| {
        let used = match n.kind() {
            "field_access" => names_field(n, name, unit),
            _ => is_reference(n) && unit.text_of(n) == name && n != name_node,
        };
        used && !allowed.iter().any(|s| s.contains(&Span::of(n)))
    });
    ensure(!foreign_read, "field is read before initialization")?;
    Ok(())
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let declarator = m.binding("declarator")?;
    let value = m.text("value")?;
    Ok(Rewrite::new(vec![
        Edit::replace(declarator.span, format!("{} = {value}", declarator.text)),
        Edit::remove(unit.text(), m.span),
    ]))
}
