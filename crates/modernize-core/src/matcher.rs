/*!
# Structural Matcher

Walks a unit's syntax tree once, pre-order and left to right, and offers
every node to the active rules anchored on its kind. Each accepted node
becomes a [`MatchInstance`] carrying the rule's captures.
*/

use std::collections::{BTreeMap, HashMap};

use tracing::{trace, warn};
use tree_sitter::Node;

use crate::edit::Span;
use crate::parser::SourceUnit;
use crate::rules::{Abstain, Capture, Rule, RuleSelection};

/// One occurrence of a rule's shape in a unit
#[derive(Debug, Clone)]
pub struct MatchInstance {
    pub rule_id: &'static str,
    pub priority: usize,
    /// Node the predicate accepted
    pub anchor: Capture,
    /// Primary span; also the span reported to users
    pub span: Span,
    /// Further spans the rewrite edits
    pub sites: Vec<Span>,
    pub bindings: BTreeMap<&'static str, Capture>,
}

impl MatchInstance {
    /// Every span this match may edit
    pub fn footprint(&self) -> impl Iterator<Item = Span> + '_ {
        std::iter::once(self.span).chain(self.sites.iter().copied())
    }

    pub fn overlaps(&self, other: &MatchInstance) -> bool {
        self.footprint()
            .any(|a| other.footprint().any(|b| a.intersects(&b)))
    }

    /// The anchor node in `unit`
    pub fn anchor<'u>(&self, unit: &'u SourceUnit) -> Result<Node<'u>, Abstain> {
        unit.node_at(self.anchor.span, self.anchor.kind)
            .ok_or_else(|| Abstain::new("anchor node not found"))
    }

    pub fn binding(&self, name: &str) -> Result<&Capture, Abstain> {
        self.bindings
            .get(name)
            .ok_or_else(|| Abstain::new(format!("missing capture '{name}'")))
    }

    pub fn text(&self, name: &str) -> Result<&str, Abstain> {
        self.binding(name).map(|c| c.text.as_str())
    }

    /// The node bound to `name`
    pub fn node<'u>(&self, name: &str, unit: &'u SourceUnit) -> Result<Node<'u>, Abstain> {
        let capture = self.binding(name)?;
        unit.node_at(capture.span, capture.kind)
            .ok_or_else(|| Abstain::new(format!("capture '{name}' no longer resolves")))
    }

    /// 1-based line where the match starts
    pub fn line(&self, unit: &SourceUnit) -> usize {
        unit.line_of(self.span.start)
    }
}

/// Dispatches nodes to rules by anchor kind
pub struct StructuralMatcher<'c> {
    by_kind: HashMap<&'static str, Vec<(usize, &'c Rule)>>,
}

impl<'c> StructuralMatcher<'c> {
    pub fn new(selection: &RuleSelection<'c>) -> Self {
        let mut by_kind: HashMap<&'static str, Vec<(usize, &'c Rule)>> = HashMap::new();
        for &(priority, rule) in selection.entries() {
            for kind in rule.anchors {
                by_kind.entry(kind).or_default().push((priority, rule));
            }
        }
        Self { by_kind }
    }

    /// All match instances in `unit`, in traversal order
    pub fn scan(&self, unit: &SourceUnit) -> Vec<MatchInstance> {
        let mut matches = Vec::new();
        if self.by_kind.is_empty() {
            return matches;
        }

        let mut cursor = unit.root().walk();
        'walk: loop {
            let node = cursor.node();
            if let Some(rules) = self.by_kind.get(node.kind()) {
                for &(priority, rule) in rules {
                    if let Some(instance) = self.try_rule(node, unit, priority, rule) {
                        matches.push(instance);
                    }
                }
            }

            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }

        trace!(path = %unit.path().display(), count = matches.len(), "Scanned unit");
        matches
    }

    fn try_rule(
        &self,
        node: Node<'_>,
        unit: &SourceUnit,
        priority: usize,
        rule: &Rule,
    ) -> Option<MatchInstance> {
        let captures = (rule.predicate)(node, unit)?;

        let aligned = std::iter::once(&captures.span)
            .chain(captures.sites.iter())
            .all(|span| unit.is_node_aligned(*span));
        if !aligned {
            warn!(
                rule = rule.id,
                line = unit.line_of(captures.span.start),
                "Discarding capture that does not align with syntax nodes"
            );
            return None;
        }

        Some(MatchInstance {
            rule_id: rule.id,
            priority,
            anchor: Capture::of(node, unit),
            span: captures.span,
            sites: captures.sites,
            bindings: captures.bindings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::JavaParser;
    use crate::rules::RuleCatalog;
    use crate::version::{FrameworkSet, VersionTag};

    const SOURCE: &str = r#"
class Sample {
    String describe(Object o) {
        if (o instanceof String) {
            String s = (String) o;
            return s.trim();
        }
        try {
            return o.toString();
        } catch (RuntimeException e) {
            return "";
        }
    }
}
"#;

    fn scan_at(version: VersionTag) -> Vec<MatchInstance> {
        let catalog = RuleCatalog::builtin();
        let selection = catalog.select(version, &FrameworkSet::new());
        let unit = JavaParser::new()
            .unwrap()
            .parse_unit("Sample.java", SOURCE.to_string())
            .unwrap();
        StructuralMatcher::new(&selection).scan(&unit)
    }

    #[test]
    fn finds_gated_shapes() {
        let ids: Vec<&str> = scan_at(VersionTag::LATEST).iter().map(|m| m.rule_id).collect();
        assert!(ids.contains(&"instanceof-cast-to-pattern"));
        assert!(ids.contains(&"unused-catch-to-unnamed"));
    }

    #[test]
    fn inactive_rules_never_match() {
        let ids: Vec<&str> = scan_at(VersionTag::Java8).iter().map(|m| m.rule_id).collect();
        assert!(!ids.contains(&"instanceof-cast-to-pattern"));
        assert!(!ids.contains(&"unused-catch-to-unnamed"));
    }

    #[test]
    fn matches_come_in_document_order() {
        let matches = scan_at(VersionTag::LATEST);
        let starts: Vec<usize> = matches.iter().map(|m| m.anchor.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn footprint_includes_sites() {
        let matches = scan_at(VersionTag::LATEST);
        let pattern = matches
            .iter()
            .find(|m| m.rule_id == "instanceof-cast-to-pattern")
            .unwrap();
        assert_eq!(pattern.footprint().count(), 1 + pattern.sites.len());
        assert!(pattern.overlaps(pattern));
    }
}
