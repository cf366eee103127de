/*!
# Modernization Rules

A rule is plain data: identity, version gate, optional framework affinity,
the node kinds it anchors on, and three functions. The predicate recognizes
a shape and captures bindings, the guard proves the rewrite is behavior
preserving, and the template turns bindings into edits.
*/

use std::collections::BTreeMap;

use serde::Serialize;
use tree_sitter::Node;

use crate::edit::{Edit, Span};
use crate::matcher::MatchInstance;
use crate::parser::SourceUnit;
use crate::version::{FrameworkSet, FrameworkTag, VersionTag};

pub mod catalog;

mod anonymous;
mod instanceof;
mod lazy_init;
mod loops;
mod reactor;
mod records;
mod resources;
mod spring;
mod switches;
mod text_blocks;
mod unnamed;
mod var_inference;
mod virtual_threads;

pub use catalog::{RuleCatalog, RuleSelection};

/// Pattern category reported to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    LoopToStream,
    PojoToRecord,
    SwitchExpression,
    TryWithResources,
    LazyInitToInitializer,
    AnonymousToLambda,
    InstanceofPattern,
    TextBlock,
    VirtualThreads,
    VarInference,
    UnnamedVariable,
    SpringMappingShortcut,
    ReactorOperator,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::LoopToStream => "loop-to-stream",
            Category::PojoToRecord => "pojo-to-record",
            Category::SwitchExpression => "switch-expression",
            Category::TryWithResources => "try-with-resources",
            Category::LazyInitToInitializer => "lazy-init-to-initializer",
            Category::AnonymousToLambda => "anonymous-to-lambda",
            Category::InstanceofPattern => "instanceof-pattern",
            Category::TextBlock => "text-block",
            Category::VirtualThreads => "virtual-threads",
            Category::VarInference => "var-inference",
            Category::UnnamedVariable => "unnamed-variable",
            Category::SpringMappingShortcut => "spring-mapping-shortcut",
            Category::ReactorOperator => "reactor-operator",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural test run on every node of an anchor kind
pub type Predicate = fn(Node<'_>, &SourceUnit) -> Option<Captures>;

/// Safety check run on a surviving match
pub type Guard = fn(&MatchInstance, &SourceUnit) -> Result<(), Abstain>;

/// Rewrite template instantiated from a guarded match
pub type Template = fn(&MatchInstance, &SourceUnit) -> Result<Rewrite, Abstain>;

/// A single modernization rule
#[derive(Clone)]
pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub min_version: VersionTag,
    pub framework: Option<FrameworkTag>,
    pub description: &'static str,
    pub anchors: &'static [&'static str],
    pub predicate: Predicate,
    pub guard: Guard,
    pub rewrite: Template,
}

impl Rule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &'static str,
        category: Category,
        min_version: VersionTag,
        description: &'static str,
        anchors: &'static [&'static str],
        predicate: Predicate,
        guard: Guard,
        rewrite: Template,
    ) -> Self {
        Self {
            id,
            category,
            min_version,
            framework: None,
            description,
            anchors,
            predicate,
            guard,
            rewrite,
        }
    }

    pub fn for_framework(mut self, framework: FrameworkTag) -> Self {
        self.framework = Some(framework);
        self
    }

    /// Whether the rule may run for a project at `version` using `frameworks`
    pub fn is_active(&self, version: VersionTag, frameworks: &FrameworkSet) -> bool {
        self.min_version <= version
            && self.framework.map_or(true, |fw| frameworks.contains(&fw))
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("min_version", &self.min_version)
            .field("framework", &self.framework)
            .finish()
    }
}

/// A captured subtree: where it is, what it is, what it says
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub span: Span,
    pub kind: &'static str,
    pub text: String,
}

impl Capture {
    pub fn of(node: Node<'_>, unit: &SourceUnit) -> Self {
        Self {
            span: Span::of(node),
            kind: node.kind(),
            text: unit.text_of(node).to_string(),
        }
    }
}

/// What a predicate extracts from a matching shape
#[derive(Debug, Clone)]
pub struct Captures {
    pub span: Span,
    pub sites: Vec<Span>,
    pub bindings: BTreeMap<&'static str, Capture>,
}

impl Captures {
    /// Captures whose primary span is a single node
    pub fn new(node: Node<'_>) -> Self {
        Self::spanning(Span::of(node))
    }

    /// Captures whose primary span is a run of sibling nodes
    pub fn spanning(span: Span) -> Self {
        Self {
            span,
            sites: Vec::new(),
            bindings: BTreeMap::new(),
        }
    }

    /// Another node the rewrite will edit
    pub fn site(mut self, node: Node<'_>) -> Self {
        self.sites.push(Span::of(node));
        self
    }

    pub fn bind(mut self, name: &'static str, node: Node<'_>, unit: &SourceUnit) -> Self {
        self.bindings.insert(name, Capture::of(node, unit));
        self
    }
}

/// Reason a guard or template refused to rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abstain(pub String);

impl Abstain {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl std::fmt::Display for Abstain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fail with `reason` unless `condition` holds
pub fn ensure(condition: bool, reason: &str) -> Result<(), Abstain> {
    if condition {
        Ok(())
    } else {
        Err(Abstain::new(reason))
    }
}

/// Lift an optional lookup into a guard failure
pub fn require<T>(value: Option<T>, reason: &str) -> Result<T, Abstain> {
    value.ok_or_else(|| Abstain::new(reason))
}

/// Edits produced by a template
#[derive(Debug, Clone, Default)]
pub struct Rewrite {
    pub edits: Vec<Edit>,
    /// Fully-qualified types the rewritten code needs imported
    pub imports: Vec<String>,
}

impl Rewrite {
    pub fn new(edits: Vec<Edit>) -> Self {
        Self {
            edits,
            imports: Vec::new(),
        }
    }

    pub fn single(edit: Edit) -> Self {
        Self::new(vec![edit])
    }

    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }
}
