//! # Modernize Core
//!
//! Detects legacy Java idioms and rewrites them into their modern
//! equivalents, gated by the Java release the project targets and the
//! frameworks it uses:
//! - Version and framework tags, and the rule catalog they select from
//! - A structural matcher over tree-sitter-java syntax trees
//! - Conflict resolution between overlapping matches
//! - A guarded, re-parse checked rewrite engine
//! - The project pipeline and its report
//!
//! Every rewrite is conservative: when a safety guard cannot prove a rewrite
//! preserves behavior, the match is left alone and recorded as an
//! abstention.

#![warn(clippy::all)]

pub mod config;
pub mod edit;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod pipeline;
pub mod project;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod transform;
pub mod version;

// Re-export commonly used types
pub use config::ModernizeConfig;
pub use edit::{Edit, Span};
pub use error::{ModernizeError, Result};
pub use matcher::{MatchInstance, StructuralMatcher};
pub use parser::{JavaParser, SourceUnit};
pub use pipeline::{process_source, CancelToken, Modernizer};
pub use project::{FsProject, ProjectLayout};
pub use report::{FileFailure, FileReport, Finding, Mode, ModernizationResult, RunStatus, Totals};
pub use resolver::ConflictResolver;
pub use rules::{Category, Rule, RuleCatalog, RuleSelection};
pub use transform::{Abstention, AbstentionKind, TransformEngine, Transformation, UnitOutcome};
pub use version::{FrameworkSet, FrameworkTag, VersionTag};

/// Modernizer version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for modernizer components
///
/// Logs go to stderr so machine-readable reports on stdout stay clean.
pub fn init_tracing(verbose: bool) {
    let directive = if verbose {
        "modernize_core=debug"
    } else {
        "modernize_core=info"
    };
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = directive.parse() {
        filter = filter.add_directive(directive);
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
