use std::path::PathBuf;

/// Errors produced while modernizing a project
///
/// Only `SourceEnumeration` aborts a run. Everything else is scoped to a
/// single descriptor or compilation unit and ends up in the report.
#[derive(thiserror::Error, Debug)]
pub enum ModernizeError {
    /// Build descriptor missing or without a recognizable release
    #[error("Build descriptor unreadable at {path}: {reason}")]
    DescriptorUnreadable { path: PathBuf, reason: String },

    /// Compilation unit does not parse; it is skipped
    #[error("Parse failure in {path} at line {line}")]
    UnitParseFailure { path: PathBuf, line: usize },

    /// A guard refused a rewrite; never user-visible as an error
    #[error("Rule {rule} abstained: {reason}")]
    UnsafeRewriteAbstained { rule: &'static str, reason: String },

    /// A rewrite produced text that no longer parses and was rolled back
    #[error("Rewrite by {rule} at line {line} does not re-parse")]
    PostRewriteReparseFailure { rule: &'static str, line: usize },

    /// Rewritten unit could not be persisted
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The project's source tree could not be enumerated
    #[error("Cannot enumerate sources under {root}: {reason}")]
    SourceEnumeration { root: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// The Java grammar could not be loaded into the parser
    #[error("Language error: {0}")]
    Language(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModernizeError {
    /// Whether this error ends the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ModernizeError::SourceEnumeration { .. }
                | ModernizeError::Language(_)
                | ModernizeError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ModernizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_run_level_errors_are_fatal() {
        let parse = ModernizeError::UnitParseFailure {
            path: PathBuf::from("A.java"),
            line: 3,
        };
        assert!(!parse.is_fatal());

        let enumerate = ModernizeError::SourceEnumeration {
            root: PathBuf::from("/nowhere"),
            reason: "missing".to_string(),
        };
        assert!(enumerate.is_fatal());
    }

    #[test]
    fn messages_name_the_file() {
        let err = ModernizeError::UnitParseFailure {
            path: PathBuf::from("src/Foo.java"),
            line: 12,
        };
        assert_eq!(err.to_string(), "Parse failure in src/Foo.java at line 12");
    }
}
