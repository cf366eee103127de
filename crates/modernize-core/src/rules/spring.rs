/*!
# Spring Request Mapping Shortcuts

`@RequestMapping(value = "/x", method = RequestMethod.GET)` on a handler
method is `@GetMapping("/x")`.
*/

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::Edit;
use crate::matcher::MatchInstance;
use crate::parser::syntax::{children_of_kind, named_children, simple_type_name};
use crate::parser::SourceUnit;
use crate::version::{FrameworkTag, VersionTag};

const VERBS: &[(&str, &str)] = &[
    ("GET", "GetMapping"),
    ("POST", "PostMapping"),
    ("PUT", "PutMapping"),
    ("DELETE", "DeleteMapping"),
    ("PATCH", "PatchMapping"),
];

/// Elements the shortcut annotations accept besides `method`
const SHORTCUT_ELEMENTS: &[&str] = &["value", "path", "name", "params", "headers", "consumes", "produces"];

const ANNOTATION_PACKAGE: &str = "org.springframework.web.bind.annotation";

pub(super) fn rule() -> Rule {
    Rule::new(
        "request-mapping-shortcut",
        Category::SpringMappingShortcut,
        VersionTag::Java8,
        "@RequestMapping with a single HTTP method becomes the matching shortcut annotation",
        &["annotation"],
        predicate,
        guard,
        rewrite,
    )
    .for_framework(FrameworkTag::Spring)
}

/// `key = value` pairs of an annotation
fn pairs<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    node.child_by_field_name("arguments")
        .map(|args| children_of_kind(args, "element_value_pair"))
        .unwrap_or_default()
}

fn pair_key<'u>(pair: Node<'_>, unit: &'u SourceUnit) -> Option<&'u str> {
    pair.child_by_field_name("key").map(|k| unit.text_of(k))
}

/// Shortcut annotation for a `method` element value
fn shortcut(value: Node<'_>, unit: &SourceUnit) -> Option<&'static str> {
    let verb = simple_type_name(unit.text_of(value));
    let qualified = unit.text_of(value).contains("RequestMethod.") || value.kind() == "identifier";
    if !qualified {
        return None;
    }
    VERBS.iter().find(|(v, _)| *v == verb).map(|(_, s)| *s)
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let name = node.child_by_field_name("name")?;
    if simple_type_name(unit.text_of(name)) != "RequestMapping" {
        return None;
    }
    let method = pairs(node)
        .into_iter()
        .find(|p| pair_key(*p, unit) == Some("method"))?;
    let value = method.child_by_field_name("value")?;
    if value.kind() != "element_value_array_initializer" {
        shortcut(value, unit)?;
    }
    Some(Captures::new(node).bind("method", value, unit))
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let node = m.anchor(unit)?;
    let on_method = node
        .parent()
        .filter(|p| p.kind() == "modifiers")
        .and_then(|p| p.parent())
        .is_some_and(|d| d.kind() == "method_declaration");
    ensure(on_method, "mapping is not on a handler method")?;

    let method = m.node("method", unit)?;
    ensure(
        method.kind() != "element_value_array_initializer",
        "mapping lists several HTTP methods",
    )?;
    require(shortcut(method, unit), "unsupported HTTP method")?;

    let arguments = require(node.child_by_field_name("arguments"), "annotation has no arguments")?;
    for argument in named_children(arguments) {
        ensure(
            argument.kind() == "element_value_pair",
            "mapping mixes a bare value with named elements",
        )?;
        let key = require(pair_key(argument, unit), "element has no name")?;
        ensure(
            key == "method" || SHORTCUT_ELEMENTS.contains(&key),
            "mapping uses an element the shortcut does not support",
        )?;
    }
    Ok(())
}

fn rewrite(m: &MatchInstance, unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let node = m.anchor(unit)?;
    let method = m.node("method", unit)?;
    let annotation = require(shortcut(method, unit), "unsupported HTTP method")?;

    let rest: Vec<Node<'_>> = pairs(node)
        .into_iter()
        .filter(|p| pair_key(*p, unit) != Some("method"))
        .collect();
    let text = match rest.as_slice() {
        [] => format!("@{annotation}"),
        [only] if pair_key(*only, unit) == Some("value") => {
            let value = require(only.child_by_field_name("value"), "element has no value")?;
            format!("@{annotation}({})", unit.text_of(value))
        }
        _ => {
            let elements: Vec<&str> = rest.iter().map(|p| unit.text_of(*p)).collect();
            format!("@{annotation}({})", elements.join(", "))
        }
    };
    Ok(Rewrite::single(Edit::replace(m.span, text))
        .with_import(format!("{ANNOTATION_PACKAGE}.{annotation}")))
}

#[cfg(test)]
mod tests {
    use crate::rules::testing::{assert_untouched, rewritten, run_at};
    use crate::version::{FrameworkTag, VersionTag};
    use pretty_assertions::assert_eq;

    const CONTROLLER: &str = r#"package demo;

import org.springframework.web.bind.annotation.RequestMapping;
import org.springframework.web.bind.annotation.RequestMethod;

class UserController {
    @RequestMapping(value = "/users", method = RequestMethod.GET)
    String list() {
        return "users";
    }

    @RequestMapping(path = "/users", method = RequestMethod.POST, consumes = "application/json")
    String create() {
        return "created";
    }
}
"#;

    #[test]
    fn mappings_become_shortcuts_with_imports() {
        assert_eq!(
            rewritten("request-mapping-shortcut", CONTROLLER),
            r#"package demo;

import org.springframework.web.bind.annotation.RequestMapping;
import org.springframework.web.bind.annotation.RequestMethod;
import org.springframework.web.bind.annotation.GetMapping;
import org.springframework.web.bind.annotation.PostMapping;

class UserController {
    @GetMapping("/users")
    String list() {
        return "users";
    }

    @PostMapping(path = "/users", consumes = "application/json")
    String create() {
        return "created";
    }
}
"#
        );
    }

    #[test]
    fn wildcard_imports_cover_the_shortcut() {
        let source = CONTROLLER.replace(
            "import org.springframework.web.bind.annotation.RequestMapping;\nimport org.springframework.web.bind.annotation.RequestMethod;",
            "import org.springframework.web.bind.annotation.*;",
        );
        let text = rewritten("request-mapping-shortcut", &source);
        assert!(!text.contains("import org.springframework.web.bind.annotation.GetMapping;"));
        assert!(text.contains("@GetMapping(\"/users\")"));
    }

    #[test]
    fn only_runs_for_spring_projects() {
        let outcome = run_at(CONTROLLER, VersionTag::LATEST, &[]);
        assert!(outcome.transformations.iter().all(|t| t.rule_id != "request-mapping-shortcut"));
        let outcome = run_at(CONTROLLER, VersionTag::LATEST, &[FrameworkTag::Spring]);
        assert_eq!(
            outcome
                .transformations
                .iter()
                .filter(|t| t.rule_id == "request-mapping-shortcut")
                .count(),
            2
        );
    }

    #[test]
    fn class_level_and_multi_method_mappings_are_left_alone() {
        assert_untouched(
            "request-mapping-shortcut",
            r#"@RequestMapping(value = "/api", method = RequestMethod.GET)
class Api {
    @RequestMapping(value = "/ping", method = {RequestMethod.GET, RequestMethod.HEAD})
    String ping() {
        return "pong";
    }
}
"#,
        );
    }
}
