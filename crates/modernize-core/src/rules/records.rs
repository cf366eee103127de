/*!
# Value Classes to Records

A final class that only stores its constructor arguments in private final
fields, and already defines `equals`, `hashCode` and `toString`, is a
record in all but name. The header becomes a record header, the fields and
the constructor go, every other member stays as written.
*/

use std::collections::BTreeMap;

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::{Edit, Span};
use crate::matcher::MatchInstance;
use crate::parser::syntax::{
    child_of_kind, children_of_kind, compact, field_all, has_modifier, is_annotation, modifier_words,
    named_children, strip_parens, target_name,
};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

const ACCESS: &[&str] = &["public", "protected", "private"];

pub(super) fn rule() -> Rule {
    Rule::new(
        "pojo-to-record",
        Category::PojoToRecord,
        VersionTag::Java16,
        "final class holding private final constructor-assigned fields becomes a record",
        &["class_declaration"],
        predicate,
        guard,
        rewrite,
    )
}

fn instance_fields<'t>(body: Node<'t>, unit: &SourceUnit) -> Vec<Node<'t>> {
    children_of_kind(body, "field_declaration")
        .into_iter()
        .filter(|f| !has_modifier(*f, unit, "static"))
        .collect()
}

fn access(node: Node<'_>, unit: &SourceUnit) -> Option<&'static str> {
    let words = modifier_words(node, unit);
    ACCESS.iter().copied().find(|a| words.contains(a))
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let body = node.child_by_field_name("body")?;
    let fields = instance_fields(body, unit);
    if fields.is_empty() {
        return None;
    }
    let plain = fields
        .iter()
        .all(|f| has_modifier(*f, unit, "private") && has_modifier(*f, unit, "final"));
    let constructors = children_of_kind(body, "constructor_declaration");
    let [constructor] = constructors.as_slice() else {
        return None;
    };
    if !plain {
        return None;
    }

    let keyword = child_of_kind(node, "class")?;
    let header_end = ["interfaces", "type_parameters", "name"]
        .iter()
        .find_map(|field| node.child_by_field_name(field))?;
    let mut captures = Captures::spanning(Span::new(keyword.start_byte(), header_end.end_byte()));
    if let Some(modifier) = child_of_kind(node, "modifiers").and_then(|m| child_of_kind(m, "final")) {
        captures = captures.site(modifier).bind("final", modifier, unit);
    }
    for field in &fields {
        captures = captures.site(*field);
    }
    Some(captures.site(*constructor).bind("constructor", *constructor, unit))
}

/// Record components in constructor parameter order: (type, name)
fn components<'u>(
    class: Node<'_>,
    constructor: Node<'_>,
    unit: &'u SourceUnit,
) -> Result<Vec<(&'u str, &'u str)>, Abstain> {
    let body = require(class.child_by_field_name("body"), "class has no body")?;
    let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
    for field in instance_fields(body, unit) {
        ensure(
            !modifier_words(field, unit).iter().any(|w| is_annotation(w)),
            "field is annotated",
        )?;
        let declarators = field_all(field, "declarator");
        let [declarator] = declarators.as_slice() else {
            return Err(Abstain::new("field declares several variables"));
        };
        ensure(declarator.child_by_field_name("value").is_none(), "field has an initializer")?;
        ensure(
            declarator.child_by_field_name("dimensions").is_none(),
            "field has array dimensions",
        )?;
        let ty = require(field.child_by_field_name("type"), "field has no type")?;
        let name = require(declarator.child_by_field_name("name"), "field has no name")?;
        fields.insert(unit.text_of(name), unit.text_of(ty));
    }

    let params = require(constructor.child_by_field_name("parameters"), "constructor has no parameters")?;
    let mut param_types: BTreeMap<&str, &str> = BTreeMap::new();
    let mut order = Vec::new();
    for param in named_children(params) {
        ensure(param.kind() == "formal_parameter", "constructor takes varargs or a receiver")?;
        ensure(
            !modifier_words(param, unit).iter().any(|w| is_annotation(w)),
            "constructor parameter is annotated",
        )?;
        let ty = require(param.child_by_field_name("type"), "parameter has no type")?;
        let name = require(param.child_by_field_name("name"), "parameter has no name")?;
        param_types.insert(unit.text_of(name), unit.text_of(ty));
        order.push(unit.text_of(name));
    }
    ensure(order.len() == fields.len(), "constructor parameters do not match the fields")?;

    let ctor_body = require(constructor.child_by_field_name("body"), "constructor has no body")?;
    let mut assigned: BTreeMap<&str, &str> = BTreeMap::new();
    for statement in named_children(ctor_body) {
        ensure(
            statement.kind() == "expression_statement",
            "constructor does more than assign fields",
        )?;
        let assignment = strip_parens(require(named_children(statement).first().copied(), "empty statement")?);
        ensure(
            assignment.kind() == "assignment_expression",
            "constructor does more than assign fields",
        )?;
        let left = require(assignment.child_by_field_name("left"), "malformed assignment")?;
        let right = strip_parens(require(assignment.child_by_field_name("right"), "malformed assignment")?);
        ensure(
            left.kind() == "field_access" && right.kind() == "identifier",
            "constructor does more than assign parameters to fields",
        )?;
        let field = require(target_name(left, unit), "assignment target is not a field of this")?;
        let param = unit.text_of(right);
        ensure(param_types.contains_key(param), "field assigned from a non-parameter")?;
        ensure(fields.contains_key(field), "assignment to an unknown field")?;
        ensure(
            assigned.insert(param, field).is_none(),
            "parameter assigned to several fields",
        )?;
    }
    ensure(assigned.len() == fields.len(), "not every field is assigned once")?;
    let distinct: std::collections::BTreeSet<&str> = assigned.values().copied().collect();
    ensure(distinct.len() == fields.len(), "field assigned twice")?;

    order
        .into_iter()
        .map(|param| {
            let field = require(assigned.get(param).copied(), "parameter is never stored")?;
            let ty = require(fields.get(field).copied(), "unknown field")?;
            let param_ty = require(param_types.get(param).copied(), "unknown parameter")?;
            ensure(compact(ty) == compact(param_ty), "parameter type differs from the field type")?;
            Ok((ty, field))
        })
        .collect()
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let class = m.anchor(unit)?;
    let constructor = m.node("constructor", unit)?;
    let body = require(class.child_by_field_name("body"), "class has no body")?;

    ensure(has_modifier(class, unit, "final"), "class is not final")?;
    ensure(!has_modifier(class, unit, "abstract"), "class is abstract")?;
    ensure(
        !has_modifier(class, unit, "sealed") && !has_modifier(class, unit, "non-sealed"),
        "class takes part in a sealed hierarchy",
    )?;
    ensure(class.child_by_field_name("superclass").is_none(), "class extends another class")?;
    if let Some(interfaces) = class.child_by_field_name("interfaces") {
        ensure(
            !unit.text_of(interfaces).contains("Serializable"),
            "class is serializable",
        )?;
    }
    let nested = class.parent().is_some_and(|p| p.kind() == "class_body");
    ensure(!nested || has_modifier(class, unit, "static"), "inner class holds an outer instance")?;

    ensure(
        access(constructor, unit) == access(class, unit),
        "constructor access differs from the class",
    )?;
    ensure(
        !modifier_words(constructor, unit).iter().any(|w| is_annotation(w)),
        "constructor is annotated",
    )?;
    ensure(
        child_of_kind(constructor, "throws").is_none()
            && constructor.child_by_field_name("type_parameters").is_none(),
        "constructor declares throws or type parameters",
    )?;
    ensure(child_of_kind(body, "block").is_none(), "class has an instance initializer")?;

    let components = components(class, constructor, unit)?;

    let methods = children_of_kind(body, "method_declaration");
    let arity = |method: &Node<'_>| {
        method
            .child_by_field_name("parameters")
            .map_or(0, |p| named_children(p).len())
    };
    let declares = |name: &str, params: usize| {
        methods.iter().any(|method| {
            method
                .child_by_field_name("name")
                .is_some_and(|n| unit.text_of(n) == name)
                && arity(method) == params
                && !has_modifier(*method, unit, "static")
        })
    };
    ensure(
        declares("equals", 1) && declares("hashCode", 0) && declares("toString", 0),
        "equals, hashCode and toString are not all declared",
    )?;

    for method in &methods {
        let Some(name) = method.child_by_field_name("name") else {
            continue;
        };
        let Some((ty, _)) = components.iter().find(|(_, c)| *c == unit.text_of(name)) else {
            continue;
        };
        if arity(method) != 0 {
            continue;
        }
        ensure(
            has_modifier(*method, unit, "public") && !has_modifier(*method, unit, "static"),
            "accessor-named method is not public",
        )?;
        let returns = require(method.child_by_field_name("type"), "method has no return type")?;
        ensure(
            compact(unit.text_of(returns)) == compact(ty),
            "accessor-named method returns another type",
        )?;
    }
    Ok(())
}

/// Length of the first line of `text` if it is blank, line break included
fn blank_line(text: &str) -> Option<usize> {
    let end = text.find('\n')?;
    text[..end]
        .chars()
        .all(|c| c == ' ' || c == '\t' || c == '\r')
        .then_some(end + 1)
}

/// Remove whole member lines and the blank lines that follow them
fn remove_members(text: &str, span: Span) -> Edit {
    let edit = Edit::remove(text, span);
    if edit.end == span.end {
        return edit;
    }
    let mut end = edit.end;
    while let Some(len) = blank_line(&text[end..]) {
        end += len;
    }
    Edit::replace(Span::new(edit.start, end), "")
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let class = m.anchor(unit)?;
    let constructor = m.node("constructor", unit)?;
    let name = require(class.child_by_field_name("name"), "class has no name")?;
    let components = components(class, constructor, unit)?;

    let mut header = format!("record {}", unit.text_of(name));
    if let Some(params) = class.child_by_field_name("type_parameters") {
        header.push_str(unit.text_of(params));
    }
    let list: Vec<String> = components.iter().map(|(ty, n)| format!("{ty} {n}")).collect();
    header.push_str(&format!("({})", list.join(", ")));
    if let Some(interfaces) = class.child_by_field_name("interfaces") {
        header.push(' ');
        header.push_str(unit.text_of(interfaces));
    }

    let mut edits = vec![Edit::replace(m.span, header)];
    if let Ok(modifier) = m.binding("final") {
        let rest = &unit.text()[modifier.span.end..];
        let gap = rest.len() - rest.trim_start().len();
        edits.push(Edit::replace(
            Span::new(modifier.span.start, modifier.span.end + gap),
            "",
        ));
    }

    // Members that sit next to each other go in one removal
    let members: Vec<Span> = m.sites.iter().copied().filter(|s| s.start > m.span.end).collect();
    let mut runs: Vec<Span> = Vec::new();
    for span in members {
        match runs.last_mut() {
            Some(run) if unit.text()[run.end..span.start].trim().is_empty() => run.end = span.end,
            _ => runs.push(span),
        }
    }
    edits.extend(runs.into_iter().map(|run| remove_members(unit.text(), run)));
    Ok(Rewrite::new(edits))
}

#[cfg(test)]
mod tests {
    use crate::rules::testing::{assert_untouched, run_rule};
    use pretty_assertions::assert_eq;

    const POINT: &str = r#"public final class Point {
    private final int x;
    private final int y;

    public Point(int x, int y) {
        this.x = x;
        this.y = y;
    }

    public int x() {
        return x;
    }

    @Override
    public boolean equals(Object o) {
        return o instanceof Point p && p.x == x && p.y == y;
    }

    @Override
    public int hashCode() {
        return 31 * x + y;
    }

    @Override
    public String toString() {
        return "Point[x=" + x + ", y=" + y + "]";
    }
}
"#;

    #[test]
    fn value_class_becomes_a_record() {
        let outcome = run_rule("pojo-to-record", POINT);
        assert_eq!(outcome.transformations.len(), 1);
        assert_eq!(outcome.transformations[0].lines_saved, 8);
        let text = outcome.rewritten.unwrap();
        assert!(text.starts_with("public record Point(int x, int y) {\n    public int x() {\n"));
        assert!(text.contains("    @Override\n    public boolean equals(Object o) {"));
        assert!(!text.contains("private final"));
    }

    #[test]
    fn components_follow_parameter_order() {
        let source = r#"final class Pair<A, B> implements Comparable<Pair<A, B>> {
    private final B second;
    private final A first;

    Pair(A first, B second) {
        this.first = first;
        this.second = second;
    }

    public int compareTo(Pair<A, B> o) { return 0; }
    public boolean equals(Object o) { return false; }
    public int hashCode() { return 0; }
    public String toString() { return ""; }
}
"#;
        let outcome = run_rule("pojo-to-record", source);
        assert!(outcome
            .rewritten
            .unwrap()
            .starts_with("record Pair<A, B>(A first, B second) implements Comparable<Pair<A, B>> {\n    public int compareTo"));
    }

    #[test]
    fn missing_value_methods_block_the_rewrite() {
        let outcome = run_rule(
            "pojo-to-record",
            r#"public final class Id {
    private final long value;

    public Id(long value) {
        this.value = value;
    }
}
"#,
        );
        assert!(outcome.transformations.is_empty());
        assert_eq!(
            outcome.abstentions[0].reason,
            "equals, hashCode and toString are not all declared"
        );
    }

    #[test]
    fn non_final_classes_are_left_alone() {
        assert_untouched("pojo-to-record", &POINT.replacen("public final class", "public class", 1));
    }

    #[test]
    fn constructor_logic_blocks_the_rewrite() {
        let source = POINT.replacen("this.y = y;", "this.y = Math.abs(y);", 1);
        assert_untouched("pojo-to-record", &source);
    }

    #[test]
    fn non_public_accessors_block_the_rewrite() {
        let source = POINT.replacen("public int x() {", "int x() {", 1);
        assert_untouched("pojo-to-record", &source);
    }
}
