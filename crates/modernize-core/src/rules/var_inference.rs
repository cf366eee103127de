/*!
# Local Variable Type Inference

`Foo<Bar> x = new Foo<Bar>(...);` says the type twice; `var` says it once.
*/

use tree_sitter::Node;

use super::{ensure, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::{Edit, Span};
use crate::matcher::MatchInstance;
use crate::parser::syntax::{child_of_kind, compact, field_all, in_statement_list};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

pub(super) fn rule() -> Rule {
    Rule::new(
        "explicit-type-to-var",
        Category::VarInference,
        VersionTag::Java11,
        "local declared with the type it is constructed as uses var",
        &["local_variable_declaration"],
        predicate,
        guard,
        rewrite,
    )
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    if !in_statement_list(node) {
        return None;
    }
    let ty = node.child_by_field_name("type")?;
    let declarators = field_all(node, "declarator");
    let [declarator] = declarators.as_slice() else {
        return None;
    };
    let value = declarator.child_by_field_name("value")?;
    if value.kind() != "object_creation_expression" {
        return None;
    }
    let created = value.child_by_field_name("type")?;
    let declared = compact(unit.text_of(ty));
    if declared == "var" || declared != compact(unit.text_of(created)) {
        return None;
    }
    Some(
        Captures::spanning(Span::of(ty))
            .bind("declarator", *declarator, unit)
            .bind("value", value, unit),
    )
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let declarator = m.node("declarator", unit)?;
    let value = m.node("value", unit)?;
    ensure(
        declarator.child_by_field_name("dimensions").is_none(),
        "declarator has array dimensions",
    )?;
    ensure(child_of_kind(value, "class_body").is_none(), "value is an anonymous class")?;
    Ok(())
}

fn rewrite(m: &MatchInstance, _unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    Ok(Rewrite::single(Edit::replace(m.span, "var")))
}

#[cfg(test)]
mod tests {
    use crate::rules::testing::{assert_untouched, rewritten};

    #[test]
    fn repeated_type_becomes_var() {
        let source = r#"class A {
    void f() {
        java.util.HashMap<String, Integer> counts = new java.util.HashMap<String, Integer>();
        StringBuilder sb = new StringBuilder();
    }
}
"#;
        let text = rewritten("explicit-type-to-var", source);
        assert!(text.contains("        var counts = new java.util.HashMap<String, Integer>();\n"));
        assert!(text.contains("        var sb = new StringBuilder();\n"));
    }

    #[test]
    fn diamond_and_interface_types_are_left_alone() {
        assert_untouched(
            "explicit-type-to-var",
            r#"class A {
    void f() {
        java.util.List<String> names = new java.util.ArrayList<>();
        java.util.Map<String, Integer> counts = new java.util.HashMap<String, Integer>();
    }
}
"#,
        );
    }

    #[test]
    fn fields_and_for_headers_are_left_alone() {
        assert_untouched(
            "explicit-type-to-var",
            r#"class A {
    StringBuilder field = new StringBuilder();
    void f() {
        for (StringBuilder sb = new StringBuilder(); sb.length() < 3; sb.append('x')) {
        }
    }
}
"#,
        );
    }

    #[test]
    fn anonymous_classes_are_left_alone() {
        assert_untouched(
            "explicit-type-to-var",
            r#"class A {
    void f() {
        Object lock = new Object() { };
    }
}
"#,
        );
    }
}
