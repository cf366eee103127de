/*!
# Transform Engine

Turns surviving matches into edits and a rewritten unit. Every match is
guarded first; the rewritten text must parse. When the combined result does
not parse, transformations are re-added one at a time and the ones that
break the parse are rolled back.
*/

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::edit::{apply_edits, edits_overlap, Edit, Span};
use crate::error::ModernizeError;
use crate::matcher::MatchInstance;
use crate::parser::syntax::{children_of_kind, compact};
use crate::parser::{JavaParser, SourceUnit};
use crate::rules::{ensure, Abstain, Category, Rule, RuleSelection};
use crate::version::VersionTag;

/// Why a match was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbstentionKind {
    /// Guard or template refused
    UnsafeRewrite,
    /// The rewrite did not re-parse and was rolled back
    ReparseFailure,
}

/// A match that was deliberately left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Abstention {
    pub rule_id: &'static str,
    pub line: usize,
    pub kind: AbstentionKind,
    pub reason: String,
}

/// An applied rewrite
#[derive(Debug, Clone)]
pub struct Transformation {
    pub rule_id: &'static str,
    pub category: Category,
    pub min_version: VersionTag,
    pub span: Span,
    pub line: usize,
    pub edits: Vec<Edit>,
    pub imports: Vec<String>,
    pub lines_saved: i64,
}

/// Result of transforming one unit
#[derive(Debug, Clone, Default)]
pub struct UnitOutcome {
    pub transformations: Vec<Transformation>,
    pub abstentions: Vec<Abstention>,
    /// New text when at least one transformation applied
    pub rewritten: Option<String>,
}

impl UnitOutcome {
    pub fn lines_saved(&self) -> i64 {
        self.transformations.iter().map(|t| t.lines_saved).sum()
    }

    fn abstain(&mut self, rule_id: &'static str, line: usize, kind: AbstentionKind, reason: String) {
        let error = match kind {
            AbstentionKind::UnsafeRewrite => ModernizeError::UnsafeRewriteAbstained {
                rule: rule_id,
                reason: reason.clone(),
            },
            AbstentionKind::ReparseFailure => ModernizeError::PostRewriteReparseFailure { rule: rule_id, line },
        };
        debug!(line, "{error}");
        self.abstentions.push(Abstention {
            rule_id,
            line,
            kind,
            reason,
        });
    }
}

/// Applies guarded rewrites for one rule selection
pub struct TransformEngine<'s, 'c> {
    selection: &'s RuleSelection<'c>,
}

impl<'s, 'c> TransformEngine<'s, 'c> {
    pub fn new(selection: &'s RuleSelection<'c>) -> Self {
        Self { selection }
    }

    pub fn apply(
        &self,
        unit: &SourceUnit,
        survivors: Vec<MatchInstance>,
        parser: &mut JavaParser,
    ) -> UnitOutcome {
        let mut outcome = UnitOutcome::default();
        let comments = unit.comment_spans();

        let mut candidates = Vec::new();
        for instance in &survivors {
            let Some(rule) = self.selection.get(instance.rule_id) else {
                warn!(rule = instance.rule_id, "Match for a rule outside the selection");
                continue;
            };
            match instantiate(rule, instance, unit, &comments) {
                Ok(transformation) => candidates.push(transformation),
                Err(Abstain(reason)) => outcome.abstain(
                    instance.rule_id,
                    instance.line(unit),
                    AbstentionKind::UnsafeRewrite,
                    reason,
                ),
            }
        }

        if candidates.is_empty() {
            return outcome;
        }

        let all: Vec<&Transformation> = candidates.iter().collect();
        if let Some(text) = compose(unit, &all, parser) {
            outcome.rewritten = Some(text);
            outcome.transformations = candidates;
            return outcome;
        }

        debug!(
            path = %unit.path().display(),
            "Combined rewrite does not parse, applying transformations one at a time"
        );

        // Later spans first so a rollback never shifts the kept ones
        candidates.sort_by(|a, b| b.span.start.cmp(&a.span.start));
        let mut kept: Vec<Transformation> = Vec::new();
        let mut text = None;
        for candidate in candidates {
            let mut trial: Vec<&Transformation> = kept.iter().collect();
            trial.push(&candidate);
            match compose(unit, &trial, parser) {
                Some(rewritten) => {
                    text = Some(rewritten);
                    kept.push(candidate);
                }
                None => outcome.abstain(
                    candidate.rule_id,
                    candidate.line,
                    AbstentionKind::ReparseFailure,
                    "rewritten code does not parse".to_string(),
                ),
            }
        }

        kept.sort_by_key(|t| t.span.start);
        outcome.transformations = kept;
        outcome.rewritten = text;
        outcome
    }
}

/// Guard, instantiate and vet one match
fn instantiate(
    rule: &Rule,
    instance: &MatchInstance,
    unit: &SourceUnit,
    comments: &[Span],
) -> Result<Transformation, Abstain> {
    (rule.guard)(instance, unit)?;
    let rewrite = (rule.rewrite)(instance, unit)?;

    ensure(!rewrite.edits.is_empty(), "template produced no edits")?;
    ensure(!edits_overlap(&rewrite.edits), "template edits overlap")?;
    for edit in &rewrite.edits {
        for comment in comments {
            if edit.span().intersects(comment) && !edit.replacement.contains(unit.slice(*comment)) {
                return Err(Abstain::new("rewrite would drop a comment"));
            }
        }
    }

    let lines_saved = rewrite
        .edits
        .iter()
        .map(|edit| edit.lines_saved(unit.text()))
        .sum();

    Ok(Transformation {
        rule_id: rule.id,
        category: rule.category,
        min_version: rule.min_version,
        span: instance.span,
        line: instance.line(unit),
        edits: rewrite.edits,
        imports: rewrite.imports,
        lines_saved,
    })
}

/// Apply `chosen` to the original text; `None` if it overlaps or fails to parse
fn compose(unit: &SourceUnit, chosen: &[&Transformation], parser: &mut JavaParser) -> Option<String> {
    let mut edits: Vec<Edit> = chosen.iter().flat_map(|t| t.edits.iter().cloned()).collect();
    if let Some(imports) = import_edit(unit, chosen.iter().flat_map(|t| t.imports.iter())) {
        edits.push(imports);
    }
    let text = apply_edits(unit.text(), &edits).ok()?;
    parser.parses_cleanly(&text).then_some(text)
}

/// One insertion adding every import not already covered
pub fn import_edit<'a>(unit: &SourceUnit, wanted: impl Iterator<Item = &'a String>) -> Option<Edit> {
    let root = unit.root();
    let existing: Vec<String> = children_of_kind(root, "import_declaration")
        .into_iter()
        .map(|n| compact(unit.text_of(n)))
        .collect();
    let package = children_of_kind(root, "package_declaration")
        .first()
        .map(|n| compact(unit.text_of(*n)));

    let missing: BTreeSet<&String> = wanted
        .filter(|import| {
            let owner = import.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("");
            let exact = format!("import{import};");
            let wildcard = format!("import{owner}.*;");
            let same_package = package.as_deref() == Some(format!("package{owner};").as_str());
            !same_package && !existing.iter().any(|e| *e == exact || *e == wildcard)
        })
        .collect();
    if missing.is_empty() {
        return None;
    }

    let lines: Vec<String> = missing.iter().map(|i| format!("import {i};")).collect();
    if let Some(last) = children_of_kind(root, "import_declaration").last() {
        Some(Edit::insert(last.end_byte(), format!("\n{}", lines.join("\n"))))
    } else if let Some(package) = children_of_kind(root, "package_declaration").first() {
        Some(Edit::insert(package.end_byte(), format!("\n\n{}", lines.join("\n"))))
    } else {
        Some(Edit::insert(0, format!("{}\n\n", lines.join("\n"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::run_rule;
    use pretty_assertions::assert_eq;

    fn unit(text: &str) -> SourceUnit {
        JavaParser::new()
            .unwrap()
            .parse_unit("T.java", text.to_string())
            .unwrap()
    }

    #[test]
    fn imports_go_after_the_last_import() {
        let u = unit("package p;\n\nimport java.util.List;\n\nclass A {}\n");
        let wanted = vec!["java.util.Map".to_string()];
        let edit = import_edit(&u, wanted.iter()).unwrap();
        let text = apply_edits(u.text(), &[edit]).unwrap();
        assert_eq!(
            text,
            "package p;\n\nimport java.util.List;\nimport java.util.Map;\n\nclass A {}\n"
        );
    }

    #[test]
    fn covered_imports_are_skipped() {
        let u = unit("package p;\n\nimport java.util.*;\n\nclass A {}\n");
        let wanted = vec!["java.util.Map".to_string(), "p.Local".to_string()];
        assert!(import_edit(&u, wanted.iter()).is_none());
    }

    #[test]
    fn imports_follow_the_package_when_none_exist() {
        let u = unit("package p;\n\nclass A {}\n");
        let wanted = vec!["q.B".to_string(), "q.B".to_string()];
        let edit = import_edit(&u, wanted.iter()).unwrap();
        let text = apply_edits(u.text(), &[edit]).unwrap();
        assert_eq!(text, "package p;\n\nimport q.B;\n\nclass A {}\n");
    }

    #[test]
    fn comments_inside_a_rewrite_cause_abstention() {
        let source = r#"
class A {
    boolean has(java.util.List<String> names, String wanted) {
        for (String name : names) {
            // exact comparison
            if (name.equals(wanted)) {
                return true;
            }
        }
        return false;
    }
}
"#;
        let outcome = run_rule("loop-any-match", source);
        assert!(outcome.transformations.is_empty());
        assert_eq!(outcome.abstentions.len(), 1);
        assert_eq!(outcome.abstentions[0].kind, AbstentionKind::UnsafeRewrite);
        assert_eq!(outcome.abstentions[0].reason, "rewrite would drop a comment");
    }

    #[test]
    fn rewritten_units_parse() {
        let source = r#"
class A {
    void f(Object o) {
        if (o instanceof String) {
            String s = (String) o;
            System.out.println(s);
        }
    }
}
"#;
        let outcome = run_rule("instanceof-cast-to-pattern", source);
        let text = outcome.rewritten.unwrap();
        assert!(JavaParser::new().unwrap().parses_cleanly(&text));
        assert_eq!(outcome.transformations[0].lines_saved, 1);
    }
}
