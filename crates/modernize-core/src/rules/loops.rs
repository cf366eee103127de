/*!
# Search Loops to Streams

`for (T x : xs) { if (cond) { return x; } } throw e;` and its boolean
sibling `... return true; ... return false;` become single stream
pipelines. The loop must be a pure search: nothing but the test in the
body, nothing but the return in the test.
*/

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::{Edit, Span};
use crate::matcher::MatchInstance;
use crate::parser::syntax::{
    ancestor, assigned_names, child_of_kind, compact, contains_kind, declared_type, enclosing_callable,
    field_type, in_statement_list, is_local, named_children, next_statement, referenced_names,
    simple_type_name, statements, strip_parens,
};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

/// Declared types known to be `java.util.Collection`s
const COLLECTION_TYPES: &[&str] = &[
    "Collection",
    "List",
    "ArrayList",
    "LinkedList",
    "Vector",
    "CopyOnWriteArrayList",
    "Set",
    "HashSet",
    "LinkedHashSet",
    "TreeSet",
    "SortedSet",
    "NavigableSet",
    "EnumSet",
    "CopyOnWriteArraySet",
    "Queue",
    "Deque",
    "ArrayDeque",
    "PriorityQueue",
    "BlockingQueue",
    "LinkedBlockingQueue",
    "ArrayBlockingQueue",
    "ConcurrentLinkedQueue",
    "SequencedCollection",
    "SequencedSet",
];

/// Calls on a known receiver shape that return collections
const COLLECTION_VIEWS: &[&str] = &[
    "values",
    "keySet",
    "entrySet",
    "subList",
    "headSet",
    "tailSet",
    "subSet",
    "descendingSet",
    "navigableKeySet",
];

const COLLECTION_FACTORIES: &[(&str, &str)] = &[
    ("List", "of"),
    ("List", "copyOf"),
    ("Set", "of"),
    ("Set", "copyOf"),
    ("Arrays", "asList"),
    ("Collections", "singletonList"),
    ("Collections", "singleton"),
    ("Collections", "unmodifiableList"),
    ("Collections", "unmodifiableSet"),
    ("Collections", "unmodifiableCollection"),
];

const NON_LOCAL_FLOW: &[&str] = &[
    "break_statement",
    "continue_statement",
    "throw_statement",
    "try_statement",
    "try_with_resources_statement",
    "yield_statement",
    "labeled_statement",
    "synchronized_statement",
];

const PRIMITIVE_TYPES: &[&str] = &["integral_type", "floating_point_type", "boolean_type"];

pub(super) fn find_or_throw() -> Rule {
    Rule::new(
        "loop-find-or-throw",
        Category::LoopToStream,
        VersionTag::Java8,
        "for-each search that returns the element or throws becomes filter().findFirst().orElseThrow()",
        &["enhanced_for_statement"],
        match_find_or_throw,
        guard_search,
        rewrite_find_or_throw,
    )
}

pub(super) fn any_match() -> Rule {
    Rule::new(
        "loop-any-match",
        Category::LoopToStream,
        VersionTag::Java8,
        "for-each returning a boolean on the first hit becomes anyMatch()/noneMatch()",
        &["enhanced_for_statement"],
        match_any_match,
        guard_search,
        rewrite_any_match,
    )
}

/// The parts of `for (T x : xs) { if (cond) { return r; } } tail`
struct SearchLoop<'t> {
    var: Node<'t>,
    ty: Node<'t>,
    iterable: Node<'t>,
    test: Node<'t>,
    cond: Node<'t>,
    result: Node<'t>,
    tail: Node<'t>,
}

fn search_loop(node: Node<'_>) -> Option<SearchLoop<'_>> {
    if !in_statement_list(node) {
        return None;
    }
    let body = node.child_by_field_name("body")?;
    let test = *statements(body).last()?;
    if test.kind() != "if_statement" || test.child_by_field_name("alternative").is_some() {
        return None;
    }
    let hit = *statements(test.child_by_field_name("consequence")?).last()?;
    if hit.kind() != "return_statement" {
        return None;
    }

    Some(SearchLoop {
        var: node.child_by_field_name("name")?,
        ty: node.child_by_field_name("type")?,
        iterable: node.child_by_field_name("value")?,
        test,
        cond: strip_parens(test.child_by_field_name("condition")?),
        result: strip_parens(*named_children(hit).first()?),
        tail: next_statement(node)?,
    })
}

fn bind_loop(node: Node<'_>, shape: &SearchLoop<'_>, unit: &SourceUnit) -> Captures {
    Captures::spanning(Span::covering(node, shape.tail))
        .bind("var", shape.var, unit)
        .bind("type", shape.ty, unit)
        .bind("iterable", shape.iterable, unit)
        .bind("cond", shape.cond, unit)
}

fn match_find_or_throw(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let shape = search_loop(node)?;
    if shape.result.kind() != "identifier" || unit.text_of(shape.result) != unit.text_of(shape.var) {
        return None;
    }
    if shape.tail.kind() != "throw_statement" {
        return None;
    }
    let thrown = strip_parens(*named_children(shape.tail).first()?);
    Some(bind_loop(node, &shape, unit).bind("thrown", thrown, unit))
}

fn match_any_match(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let shape = search_loop(node)?;
    let hit = shape.result.kind();
    let miss = match hit {
        "true" => "false",
        "false" => "true",
        _ => return None,
    };
    if shape.tail.kind() != "return_statement" {
        return None;
    }
    let fallback = strip_parens(*named_children(shape.tail).first()?);
    if fallback.kind() != miss {
        return None;
    }
    Some(bind_loop(node, &shape, unit).bind("verdict", shape.result, unit))
}

/// Element type argument of a declared collection type, when written
fn element_type(ty: Node<'_>) -> Option<Node<'_>> {
    if ty.kind() != "generic_type" {
        return None;
    }
    let arguments = named_children(child_of_kind(ty, "type_arguments")?);
    match arguments.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Element type text if `iterable` is a known collection, `Ok(None)` when it
/// is a collection of unknown element type
fn collection_element(
    iterable: Node<'_>,
    at: Node<'_>,
    unit: &SourceUnit,
) -> Result<Option<String>, Abstain> {
    let declared = match iterable.kind() {
        "identifier" => declared_type(unit.text_of(iterable), at, unit),
        "field_access" => {
            let object = require(iterable.child_by_field_name("object"), "malformed field access")?;
            let field = require(iterable.child_by_field_name("field"), "malformed field access")?;
            ensure(object.kind() == "this", "iterable is not a known collection")?;
            field_type(unit.text_of(field), at, unit)
        }
        "method_invocation" => {
            let name = require(iterable.child_by_field_name("name"), "malformed call")?;
            let name = unit.text_of(name);
            let object = iterable
                .child_by_field_name("object")
                .map(|o| simple_type_name(unit.text_of(o)))
                .unwrap_or("");
            let known = COLLECTION_VIEWS.contains(&name)
                || COLLECTION_FACTORIES.contains(&(object, name));
            ensure(known, "iterable is not a known collection")?;
            return Ok(None);
        }
        _ => None,
    };

    let declared = require(declared, "iterable is not a known collection")?;
    ensure(declared.kind() != "array_type", "iterable is an array")?;
    ensure(
        COLLECTION_TYPES.contains(&simple_type_name(unit.text_of(declared))),
        "iterable is not a known collection",
    )?;
    Ok(element_type(declared).map(|n| unit.text_of(n).to_string()))
}

/// Whether a checked exception thrown inside `expr` could be handled or
/// declared around the loop, which a lambda body would not allow
fn may_throw_checked(expr: Node<'_>, at: Node<'_>) -> bool {
    if !contains_kind(expr, &["method_invocation", "object_creation_expression"]) {
        return false;
    }
    let Some(callable) = enclosing_callable(at) else {
        return true;
    };
    let declares = child_of_kind(callable, "throws").is_some();
    let guarded = ancestor(at, &["try_statement", "try_with_resources_statement", "lambda_expression"])
        .is_some_and(|n| n.start_byte() > callable.start_byte());
    declares || guarded
}

/// Whether evaluating `cond` dereferences `var` before anything else can
/// decide the result, so a null element fails in the loop as well
fn dereferences_first(cond: Node<'_>, var: &str, unit: &SourceUnit) -> bool {
    let cond = strip_parens(cond);
    match cond.kind() {
        "method_invocation" | "field_access" => match cond.child_by_field_name("object") {
            Some(object) => {
                let object = strip_parens(object);
                (object.kind() == "identifier" && unit.text_of(object) == var)
                    || dereferences_first(object, var, unit)
            }
            None => cond
                .child_by_field_name("arguments")
                .and_then(|args| named_children(args).first().copied())
                .is_some_and(|first| dereferences_first(first, var, unit)),
        },
        "binary_expression" => cond
            .child_by_field_name("left")
            .is_some_and(|left| dereferences_first(left, var, unit)),
        "unary_expression" => cond
            .child_by_field_name("operand")
            .is_some_and(|operand| dereferences_first(operand, var, unit)),
        _ => false,
    }
}

fn guard_search(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let node = m.anchor(unit)?;
    let shape = require(search_loop(node), "loop shape changed")?;
    let body = require(node.child_by_field_name("body"), "loop has no body")?;
    let branch = require(shape.test.child_by_field_name("consequence"), "test has no branch")?;

    ensure(statements(body).len() == 1, "loop body does more than test and return")?;
    ensure(statements(branch).len() == 1, "conditional branch does more than return")?;
    ensure(!contains_kind(body, NON_LOCAL_FLOW), "loop body has non-local control flow")?;
    ensure(
        !contains_kind(shape.cond, &["assignment_expression", "update_expression"]),
        "condition mutates state",
    )?;
    ensure(!PRIMITIVE_TYPES.contains(&shape.ty.kind()), "loop variable is primitive")?;

    let element = collection_element(shape.iterable, node, unit)?;
    let declared = unit.text_of(shape.ty);
    if let Some(element) = element {
        ensure(
            declared == "var" || compact(&element) == compact(declared),
            "loop variable type differs from the element type",
        )?;
    }

    let var = unit.text_of(shape.var);
    let mut lambda_bodies = vec![shape.cond];
    if let Ok(thrown) = m.node("thrown", unit) {
        // findFirst rejects a null match the loop would have returned
        ensure(
            dereferences_first(shape.cond, var, unit),
            "a null element would reach findFirst",
        )?;
        lambda_bodies.push(thrown);
    }
    for expr in &lambda_bodies {
        ensure(
            !may_throw_checked(*expr, node),
            "lambda body may throw a checked exception",
        )?;
    }

    let scope = require(enclosing_callable(node), "loop is not inside a method")?;
    let assigned = assigned_names(scope, unit);
    for expr in lambda_bodies {
        for name in referenced_names(expr, unit) {
            if name != var && assigned.contains(&name) && is_local(&name, node, unit) {
                return Err(Abstain::new(format!(
                    "captured local '{name}' is not effectively final"
                )));
            }
        }
    }
    Ok(())
}

fn rewrite_find_or_throw(m: &MatchInstance, _unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let text = format!(
        "return {iterable}.stream().filter({var} -> {cond}).findFirst().orElseThrow(() -> {thrown});",
        iterable = m.text("iterable")?,
        var = m.text("var")?,
        cond = m.text("cond")?,
        thrown = m.text("thrown")?,
    );
    Ok(Rewrite::single(Edit::replace(m.span, text)))
}

fn rewrite_any_match(m: &MatchInstance, _unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let terminal = if m.text("verdict")? == "true" {
        "anyMatch"
    } else {
        "noneMatch"
    };
    let text = format!(
        "return {iterable}.stream().{terminal}({var} -> {cond});",
        iterable = m.text("iterable")?,
        var = m.text("var")?,
        cond = m.text("cond")?,
    );
    Ok(Rewrite::single(Edit::replace(m.span, text)))
}

#[cfg(test)]
mod tests {
    use crate::rules::testing::{assert_untouched, rewritten, run_rule};
    use pretty_assertions::assert_eq;

    const FIND: &str = r#"class Repo {
    private final java.util.List<User> users = new java.util.ArrayList<>();

    User byName(String name) {
        for (User user : users) {
            if (user.getName().equals(name)) {
                return user;
            }
        }
        throw new IllegalArgumentException("no user " + name);
    }
}
"#;

    #[test]
    fn find_or_throw_becomes_a_pipeline() {
        let outcome = run_rule("loop-find-or-throw", FIND);
        assert_eq!(outcome.transformations.len(), 1);
        assert_eq!(outcome.transformations[0].lines_saved, 5);
        assert_eq!(
            outcome.rewritten.unwrap(),
            r#"class Repo {
    private final java.util.List<User> users = new java.util.ArrayList<>();

    User byName(String name) {
        return users.stream().filter(user -> user.getName().equals(name)).findFirst().orElseThrow(() -> new IllegalArgumentException("no user " + name));
    }
}
"#
        );
    }

    #[test]
    fn any_match_and_none_match() {
        let source = r#"class Flags {
    boolean anyBlank(java.util.Set<String> values) {
        for (String value : values) {
            if (value.isBlank()) {
                return true;
            }
        }
        return false;
    }

    boolean noneNegative(java.util.List<Integer> numbers) {
        for (Integer n : numbers) {
            if (n < 0) return false;
        }
        return true;
    }
}
"#;
        let text = rewritten("loop-any-match", source);
        assert!(text.contains("return values.stream().anyMatch(value -> value.isBlank());"));
        assert!(text.contains("return numbers.stream().noneMatch(n -> n < 0);"));
    }

    #[test]
    fn arrays_are_left_alone() {
        assert_untouched(
            "loop-any-match",
            r#"class A {
    boolean has(String[] items) {
        for (String item : items) {
            if (item.isEmpty()) {
                return true;
            }
        }
        return false;
    }
}
"#,
        );
    }

    #[test]
    fn extra_work_in_the_body_is_left_alone() {
        let outcome = run_rule(
            "loop-any-match",
            r#"class A {
    int seen;
    boolean has(java.util.List<String> items) {
        for (String item : items) {
            seen++;
            if (item.isEmpty()) {
                return true;
            }
        }
        return false;
    }
}
"#,
        );
        assert!(outcome.transformations.is_empty());
        assert_eq!(outcome.abstentions[0].reason, "loop body does more than test and return");
    }

    #[test]
    fn reassigned_captures_are_left_alone() {
        assert_untouched(
            "loop-find-or-throw",
            r#"class A {
    String pick(java.util.List<String> items, String prefix) {
        prefix = prefix.trim();
        for (String item : items) {
            if (item.startsWith(prefix)) {
                return item;
            }
        }
        throw new IllegalStateException();
    }
}
"#,
        );
    }

    #[test]
    fn checked_exceptions_block_the_rewrite() {
        assert_untouched(
            "loop-any-match",
            r#"class A {
    boolean anyHidden(java.util.List<java.nio.file.Path> paths) throws java.io.IOException {
        for (java.nio.file.Path p : paths) {
            if (java.nio.file.Files.isHidden(p)) {
                return true;
            }
        }
        return false;
    }
}
"#,
        );
    }

    #[test]
    fn unknown_iterables_are_left_alone() {
        assert_untouched(
            "loop-any-match",
            r#"class A {
    boolean has(Iterable<String> items) {
        for (String item : items) {
            if (item.isEmpty()) {
                return true;
            }
        }
        return false;
    }
}
"#,
        );
    }

    #[test]
    fn second_run_finds_nothing() {
        let once = rewritten("loop-find-or-throw", FIND);
        assert_untouched("loop-find-or-throw", &once);
    }

    #[test]
    fn null_safe_conditions_are_left_alone() {
        let outcome = run_rule(
            "loop-find-or-throw",
            r#"class Registry {
    Item lookup(java.util.List<Item> items, Item wanted) {
        for (Item item : items) {
            if (java.util.Objects.equals(item, wanted)) {
                return item;
            }
        }
        throw new java.util.NoSuchElementException();
    }
}
"#,
        );
        assert!(outcome.transformations.is_empty());
        assert_eq!(outcome.abstentions[0].reason, "a null element would reach findFirst");
    }

    #[test]
    fn identity_tests_are_left_alone() {
        assert_untouched(
            "loop-find-or-throw",
            r#"class Registry {
    Item lookup(java.util.List<Item> items, Item wanted) {
        for (Item item : items) {
            if (item == wanted) {
                return item;
            }
        }
        throw new java.util.NoSuchElementException();
    }
}
"#,
        );
    }
}
