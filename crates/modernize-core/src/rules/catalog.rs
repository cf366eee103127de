use tracing::debug;

use super::{
    anonymous, instanceof, lazy_init, loops, reactor, records, resources, spring, switches,
    text_blocks, unnamed, var_inference, virtual_threads, Rule,
};
use crate::version::{FrameworkSet, VersionTag};

/// The fixed, ordered table of rules
///
/// Declaration order is priority order: lower index wins ties.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    pub fn builtin() -> Self {
        Self::from_rules(vec![
            loops::find_or_throw(),
            loops::any_match(),
            records::rule(),
            switches::rule(),
            resources::rule(),
            lazy_init::rule(),
            anonymous::rule(),
            instanceof::rule(),
            text_blocks::rule(),
            virtual_threads::rule(),
            var_inference::rule(),
            unnamed::rule(),
            spring::rule(),
            reactor::rule(),
        ])
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drop the rules named in `disabled`
    ///
    /// Returns the narrowed catalog and the ids that named no rule.
    pub fn without(self, disabled: &[String]) -> (Self, Vec<String>) {
        let unknown = disabled
            .iter()
            .filter(|id| self.get(id).is_none())
            .cloned()
            .collect();
        let rules = self
            .rules
            .into_iter()
            .filter(|r| !disabled.iter().any(|id| id == r.id))
            .collect();
        (Self { rules }, unknown)
    }

    /// Keep only the rules named in `ids`
    pub fn only(self, ids: &[&str]) -> Self {
        let rules = self
            .rules
            .into_iter()
            .filter(|r| ids.contains(&r.id))
            .collect();
        Self { rules }
    }

    /// Rules valid for `version` and `frameworks`, in priority order
    pub fn select(&self, version: VersionTag, frameworks: &FrameworkSet) -> RuleSelection<'_> {
        let entries: Vec<(usize, &Rule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.is_active(version, frameworks))
            .collect();

        debug!(
            version = %version,
            active = entries.len(),
            total = self.rules.len(),
            "Selected rules"
        );

        RuleSelection {
            version,
            frameworks: frameworks.clone(),
            entries,
        }
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Rules active for one run, each with its catalog priority
#[derive(Debug, Clone)]
pub struct RuleSelection<'c> {
    version: VersionTag,
    frameworks: FrameworkSet,
    entries: Vec<(usize, &'c Rule)>,
}

impl<'c> RuleSelection<'c> {
    pub fn version(&self) -> VersionTag {
        self.version
    }

    pub fn frameworks(&self) -> &FrameworkSet {
        &self.frameworks
    }

    /// Active rules with their priorities, in priority order
    pub fn entries(&self) -> &[(usize, &'c Rule)] {
        &self.entries
    }

    pub fn rules(&self) -> impl Iterator<Item = &'c Rule> + '_ {
        self.entries.iter().map(|(_, rule)| *rule)
    }

    pub fn get(&self, id: &str) -> Option<&'c Rule> {
        self.rules().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
