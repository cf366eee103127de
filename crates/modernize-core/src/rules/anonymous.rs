/*!
# Anonymous Classes to Lambdas

An anonymous implementation of a well-known functional interface that only
overrides the single abstract method becomes a lambda. Anything that would
observe the difference between the two (`this`, inherited members, a lost
target type, shadowed locals) makes the rule abstain.
*/

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::{Edit, Span};
use crate::matcher::MatchInstance;
use crate::parser::syntax::{
    ancestor, child_of_kind, contains_kind, contains_text_block, declared_names, dedent_tail, descendants,
    enclosing_callable, is_field_of_parent, modifier_words, named_children, simple_type_name,
};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

/// (interface, single abstract method, takes type arguments)
const FUNCTIONAL_INTERFACES: &[(&str, &str, bool)] = &[
    ("Runnable", "run", false),
    ("Callable", "call", true),
    ("Comparator", "compare", true),
    ("Supplier", "get", true),
    ("Consumer", "accept", true),
    ("BiConsumer", "accept", true),
    ("Function", "apply", true),
    ("BiFunction", "apply", true),
    ("UnaryOperator", "apply", true),
    ("BinaryOperator", "apply", true),
    ("Predicate", "test", true),
    ("BiPredicate", "test", true),
    ("ActionListener", "actionPerformed", false),
    ("ThreadFactory", "newThread", false),
    ("FileFilter", "accept", false),
    ("PrivilegedAction", "run", true),
    ("PathMatcher", "matches", false),
];

/// Methods every anonymous class inherits from `Object`
const OBJECT_METHODS: &[&str] = &[
    "equals",
    "hashCode",
    "toString",
    "getClass",
    "notify",
    "notifyAll",
    "wait",
    "clone",
    "finalize",
];

pub(super) fn rule() -> Rule {
    Rule::new(
        "anonymous-class-to-lambda",
        Category::AnonymousToLambda,
        VersionTag::Java8,
        "anonymous functional interface implementation becomes a lambda",
        &["object_creation_expression"],
        predicate,
        guard,
        rewrite,
    )
}

fn interface_of(ty: Node<'_>, unit: &SourceUnit) -> Option<&'static (&'static str, &'static str, bool)> {
    let name = simple_type_name(unit.text_of(ty));
    FUNCTIONAL_INTERFACES.iter().find(|(iface, _, _)| *iface == name)
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let body = child_of_kind(node, "class_body")?;
    let ty = node.child_by_field_name("type")?;
    let (_, sam, _) = interface_of(ty, unit)?;
    let method = child_of_kind(body, "method_declaration").filter(|m| {
        m.child_by_field_name("name")
            .is_some_and(|n| unit.text_of(n) == *sam)
    })?;
    Some(
        Captures::new(node)
            .bind("type", ty, unit)
            .bind("method", method, unit),
    )
}

/// Whether the creation sits where a lambda gets the same target type
fn has_target_type(node: Node<'_>, iface: &str, unit: &SourceUnit) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let declared_as = |ty: Option<Node<'_>>| ty.is_some_and(|t| simple_type_name(unit.text_of(t)) == iface);
    match parent.kind() {
        "variable_declarator" => {
            is_field_of_parent(node, "value")
                && declared_as(parent.parent().and_then(|d| d.child_by_field_name("type")))
        }
        // overload resolution may pick a different method for a lambda
        "argument_list" => false,
        "return_statement" => {
            let scope = ancestor(parent, &["method_declaration", "lambda_expression"]);
            let method = scope.filter(|s| s.kind() == "method_declaration");
            declared_as(method.and_then(|s| s.child_by_field_name("type")))
        }
        "assignment_expression" => is_field_of_parent(node, "right"),
        _ => false,
    }
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let node = m.anchor(unit)?;
    let ty = m.node("type", unit)?;
    let method = m.node("method", unit)?;
    let &(iface, sam, generic) = require(interface_of(ty, unit), "not a functional interface")?;
    let class_body = require(child_of_kind(node, "class_body"), "no class body")?;
    let method_body = require(method.child_by_field_name("body"), "method has no body")?;

    let arguments = require(node.child_by_field_name("arguments"), "creation has no arguments")?;
    ensure(named_children(arguments).is_empty(), "constructor takes arguments")?;
    ensure(
        node.child(0).is_some_and(|first| first.kind() == "new"),
        "qualified instance creation",
    )?;
    ensure(named_children(class_body).len() == 1, "anonymous class declares other members")?;
    ensure(
        method.child_by_field_name("type_parameters").is_none(),
        "method is generic",
    )?;
    ensure(
        modifier_words(method, unit)
            .iter()
            .all(|w| matches!(*w, "public" | "@Override")),
        "method has unsupported modifiers",
    )?;
    ensure(!contains_kind(method_body, &["this", "super"]), "method refers to this or super")?;

    let self_call = descendants(method_body).into_iter().any(|call| {
        call.kind() == "method_invocation"
            && call.child_by_field_name("object").is_none()
            && call
                .child_by_field_name("name")
                .is_some_and(|n| {
                    let name = unit.text_of(n);
                    name == sam || OBJECT_METHODS.contains(&name)
                })
    });
    ensure(!self_call, "method calls an inherited member")?;

    if generic {
        let explicit = child_of_kind(ty, "type_arguments").is_some_and(|args| !named_children(args).is_empty());
        ensure(explicit, "generic interface without explicit type arguments")?;
    }
    ensure(has_target_type(node, iface, unit), "lambda would lose its target type")?;
    ensure(!contains_text_block(method_body, unit), "method contains a text block")?;

    if let Some(scope) = enclosing_callable(node) {
        let outer = declared_names(scope, unit, Some(Span::of(node)));
        let inner = declared_names(method, unit, None);
        if let Some(name) = inner.intersection(&outer).next() {
            return Err(Abstain::new(format!("'{name}' would shadow an enclosing local")));
        }
    }
    Ok(())
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let node = m.anchor(unit)?;
    let method = m.node("method", unit)?;
    let params = require(method.child_by_field_name("parameters"), "method has no parameters")?;
    let body = require(method.child_by_field_name("body"), "method has no body")?;

    let shift = unit
        .indent_at(method.start_byte())
        .len()
        .saturating_sub(unit.indent_at(node.start_byte()).len());
    let text = format!(
        "{} -> {}",
        unit.text_of(params),
        dedent_tail(unit.text_of(body), shift)
    );
    Ok(Rewrite::single(Edit::replace(m.span, text)))
}

#[cfg(test)]
mod tests {
    use crate::rules::testing::{assert_untouched, run_rule};
    use pretty_assertions::assert_eq;

    #[test]
    fn runnable_becomes_a_lambda() {
        let source = r#"class Jobs {
    void start() {
        Runnable task = new Runnable() {
            @Override
            public void run() {
                System.out.println("tick");
            }
        };
        new Thread(task).start();
    }
}
"#;
        let outcome = run_rule("anonymous-class-to-lambda", source);
        assert_eq!(outcome.transformations.len(), 1);
        assert_eq!(outcome.transformations[0].lines_saved, 3);
        assert_eq!(
            outcome.rewritten.unwrap(),
            r#"class Jobs {
    void start() {
        Runnable task = () -> {
            System.out.println("tick");
        };
        new Thread(task).start();
    }
}
"#
        );
    }

    #[test]
    fn arguments_are_left_alone() {
        let outcome = run_rule(
            "anonymous-class-to-lambda",
            r#"class Sorting {
    void sort(java.util.List<String> names) {
        java.util.Collections.sort(names, new java.util.Comparator<String>() { public int compare(String a, String b) { return a.length() - b.length(); } });
    }
}
"#,
        );
        assert!(outcome.transformations.is_empty());
        assert_eq!(outcome.abstentions[0].reason, "lambda would lose its target type");
    }

    #[test]
    fn overloaded_callees_keep_the_anonymous_class() {
        assert_untouched(
            "anonymous-class-to-lambda",
            r#"import java.security.AccessController;
import java.security.PrivilegedAction;

class Secrets {
    String home() {
        return AccessController.doPrivileged(new PrivilegedAction<String>() {
            public String run() {
                return System.getProperty("user.home");
            }
        });
    }
}
"#,
        );
    }

    #[test]
    fn typed_locals_keep_typed_parameters() {
        let source = r#"class Sorting {
    void sort(java.util.List<String> names) {
        java.util.Comparator<String> byLength = new java.util.Comparator<String>() { public int compare(String a, String b) { return a.length() - b.length(); } };
        names.sort(byLength);
    }
}
"#;
        let text = run_rule("anonymous-class-to-lambda", source).rewritten.unwrap();
        assert!(text.contains(
            "java.util.Comparator<String> byLength = (String a, String b) -> { return a.length() - b.length(); };"
        ));
    }

    #[test]
    fn this_references_are_left_alone() {
        assert_untouched(
            "anonymous-class-to-lambda",
            r#"class Jobs {
    Runnable task() {
        return new Runnable() {
            public void run() {
                System.out.println(this);
            }
        };
    }
}
"#,
        );
    }

    #[test]
    fn raw_generic_interfaces_are_left_alone() {
        assert_untouched(
            "anonymous-class-to-lambda",
            r#"class Sorting {
    void sort(java.util.List names) {
        java.util.Collections.sort(names, new java.util.Comparator() {
            public int compare(Object a, Object b) {
                return 0;
            }
        });
    }
}
"#,
        );
    }

    #[test]
    fn shadowed_locals_are_left_alone() {
        let outcome = run_rule(
            "anonymous-class-to-lambda",
            r#"class Jobs {
    void start() {
        int count = 0;
        Runnable task = new Runnable() {
            public void run() {
                int count = 1;
                System.out.println(count);
            }
        };
        task.run();
    }
}
"#,
        );
        assert!(outcome.transformations.is_empty());
        assert_eq!(outcome.abstentions[0].reason, "'count' would shadow an enclosing local");
    }

    #[test]
    fn extra_members_are_left_alone() {
        assert_untouched(
            "anonymous-class-to-lambda",
            r#"class Jobs {
    void start() {
        Runnable task = new Runnable() {
            int runs;
            public void run() {
                runs++;
            }
        };
        task.run();
    }
}
"#,
        );
    }
}
