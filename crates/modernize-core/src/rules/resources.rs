/*!
# try/finally Close to try-with-resources

```java
Reader in = open();
try { use(in); } finally { in.close(); }
```

becomes `try (Reader in = open()) { use(in); }`. When `close()` fails while
the body is already throwing, the close failure is now attached as a
suppressed exception instead of replacing the original one.
*/

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::{Edit, Span};
use crate::matcher::MatchInstance;
use crate::parser::syntax::{
    child_of_kind, children_of_kind, field_all, following_statements, in_statement_list, modifier_words,
    named_children, prev_statement, references, statements, strip_parens, target_name, writes,
};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

pub(super) fn rule() -> Rule {
    Rule::new(
        "try-finally-to-resources",
        Category::TryWithResources,
        VersionTag::Java8,
        "resource closed in a finally block becomes a try-with-resources",
        &["try_statement"],
        predicate,
        guard,
        rewrite,
    )
}

/// `r.close();`
fn is_close_of(statement: Node<'_>, name: &str, unit: &SourceUnit) -> bool {
    let Some(call) = named_children(statement).first().map(|n| strip_parens(*n)) else {
        return false;
    };
    statement.kind() == "expression_statement"
        && call.kind() == "method_invocation"
        && call
            .child_by_field_name("name")
            .is_some_and(|n| unit.text_of(n) == "close")
        && call
            .child_by_field_name("object")
            .is_some_and(|o| o.kind() == "identifier" && unit.text_of(o) == name)
        && call
            .child_by_field_name("arguments")
            .is_some_and(|a| named_children(a).is_empty())
}

/// `r.close();` or `if (r != null) r.close();`
fn closes(statement: Node<'_>, name: &str, unit: &SourceUnit) -> bool {
    if statement.kind() != "if_statement" {
        return is_close_of(statement, name, unit);
    }
    if statement.child_by_field_name("alternative").is_some() {
        return false;
    }
    let null_checked = statement
        .child_by_field_name("condition")
        .map(strip_parens)
        .is_some_and(|c| {
            let text: String = unit.text_of(c).chars().filter(|c| !c.is_whitespace()).collect();
            text == format!("{name}!=null") || text == format!("null!={name}")
        });
    let inner = statement
        .child_by_field_name("consequence")
        .map(statements)
        .unwrap_or_default();
    null_checked && matches!(inner.as_slice(), [only] if is_close_of(*only, name, unit))
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    if !in_statement_list(node) || !children_of_kind(node, "catch_clause").is_empty() {
        return None;
    }
    let finally = child_of_kind(node, "finally_clause")?;
    let cleanup = statements(child_of_kind(finally, "block")?);
    let [close] = cleanup.as_slice() else {
        return None;
    };

    let decl = prev_statement(node)?;
    if decl.kind() != "local_variable_declaration" {
        return None;
    }
    let declarators = field_all(decl, "declarator");
    let [declarator] = declarators.as_slice() else {
        return None;
    };
    let name = declarator.child_by_field_name("name")?;
    let value = declarator.child_by_field_name("value")?;
    if !closes(*close, unit.text_of(name), unit) {
        return None;
    }

    Some(
        Captures::new(decl)
            .site(child_of_kind(node, "try")?)
            .site(finally)
            .bind("try", node, unit)
            .bind("type", decl.child_by_field_name("type")?, unit)
            .bind("name", name, unit)
            .bind("value", value, unit)
            .bind("body", node.child_by_field_name("body")?, unit)
            .bind("finally", finally, unit),
    )
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let decl = unit
        .node_at(m.span, "local_variable_declaration")
        .ok_or_else(|| Abstain::new("declaration not found"))?;
    let statement = m.anchor(unit)?;
    let body = m.node("body", unit)?;
    let name = m.text("name")?;

    let reassigned = writes(body)
        .into_iter()
        .any(|(_, target)| target_name(target, unit) == Some(name));
    ensure(!reassigned, "resource is reassigned inside the try")?;
    let used_later = following_statements(statement)
        .into_iter()
        .any(|s| !references(s, unit, name).is_empty());
    ensure(!used_later, "resource is used after the try")?;
    ensure(
        modifier_words(decl, unit).iter().all(|w| *w == "final"),
        "declaration has modifiers other than final",
    )?;
    ensure(m.binding("value")?.kind != "null_literal", "resource starts out null")?;
    let dims = require(
        field_all(decl, "declarator").first().copied(),
        "declaration has no declarator",
    )?;
    ensure(dims.child_by_field_name("dimensions").is_none(), "resource is an array")?;
    Ok(())
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let statement = m.anchor(unit)?;
    let keyword = require(child_of_kind(statement, "try"), "try keyword not found")?;
    let body = m.binding("body")?;
    let finally = m.binding("finally")?;
    let decl = unit
        .node_at(m.span, "local_variable_declaration")
        .ok_or_else(|| Abstain::new("declaration not found"))?;

    let modifiers = modifier_words(decl, unit);
    let prefix = if modifiers.is_empty() {
        String::new()
    } else {
        format!("{} ", modifiers.join(" "))
    };
    let header = format!(
        "try ({prefix}{} {} = {})",
        m.text("type")?,
        m.text("name")?,
        m.text("value")?
    );

    Ok(Rewrite::new(vec![
        Edit::remove(unit.text(), m.span),
        Edit::replace(Span::of(keyword), header),
        Edit::replace(Span::new(body.span.end, finally.span.end), ""),
    ]))
}
