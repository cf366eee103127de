/*!
# Modernization Pipeline

ResolveVersion → LoadRules → per unit (Scan → Resolve → Transform) →
Aggregate. Units are processed in parallel and independently; a unit's
failure is recorded against its path and never stops the run.
*/

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ModernizeConfig;
use crate::error::{ModernizeError, Result};
use crate::matcher::StructuralMatcher;
use crate::parser::JavaParser;
use crate::project::{FsProject, ProjectLayout};
use crate::report::{FileFailure, FileReport, Finding, Mode, ModernizationResult};
use crate::resolver::ConflictResolver;
use crate::rules::{RuleCatalog, RuleSelection};
use crate::transform::{TransformEngine, UnitOutcome};
use crate::version::{FrameworkSet, VersionTag};

/// Shared flag that stops new units from starting
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Entry point for modernizing a project
pub struct Modernizer {
    catalog: RuleCatalog,
    config: ModernizeConfig,
    project: Box<dyn ProjectLayout>,
}

impl Modernizer {
    pub fn new(config: ModernizeConfig) -> Self {
        let (catalog, unknown) = RuleCatalog::builtin().without(&config.disabled_rules);
        for id in unknown {
            warn!(rule = %id, "Ignoring unknown rule in disabled_rules");
        }
        let project = Box::new(FsProject::new(config.exclude_dirs.clone()));
        Self {
            catalog,
            config,
            project,
        }
    }

    /// Replace the filesystem collaborators
    pub fn with_project(mut self, project: impl ProjectLayout + 'static) -> Self {
        self.project = Box::new(project);
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ModernizeConfig {
        &self.config
    }

    /// Version in effect and, if the descriptor could not be used, why
    pub fn resolve_version(&self, root: &Path) -> (VersionTag, Option<String>) {
        if let Some(version) = self.config.version {
            return (version, None);
        }
        match self.project.resolve_version(root) {
            Ok(version) => (version, None),
            Err(err) => {
                let fallback = self.config.default_version;
                warn!("{err}; assuming {fallback}");
                (fallback, Some(err.to_string()))
            }
        }
    }

    pub fn resolve_frameworks(&self, root: &Path) -> FrameworkSet {
        match &self.config.frameworks {
            Some(frameworks) => frameworks.iter().copied().collect(),
            None => self.project.detect_frameworks(root),
        }
    }

    pub fn run(&self, root: &Path, mode: Mode) -> Result<ModernizationResult> {
        self.run_with_cancel(root, mode, &CancelToken::new())
    }

    pub fn run_with_cancel(
        &self,
        root: &Path,
        mode: Mode,
        cancel: &CancelToken,
    ) -> Result<ModernizationResult> {
        // Fail fast if the grammar cannot be loaded at all
        JavaParser::new()?;

        let (version, descriptor_warning) = self.resolve_version(root);
        let frameworks = self.resolve_frameworks(root);
        let selection = self.catalog.select(version, &frameworks);
        info!(
            root = %root.display(),
            version = %version,
            rules = selection.len(),
            ?mode,
            "Starting modernization run"
        );

        let units = self.project.list_source_units(root)?;
        debug!(count = units.len(), "Enumerated source units");

        let work = || -> Vec<(PathBuf, FileReport)> {
            units
                .par_iter()
                .filter_map(|path| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let report = process_file(&selection, path, mode);
                    let key = path.strip_prefix(root).unwrap_or(path).to_path_buf();
                    Some((key, report))
                })
                .collect()
        };

        let reports = match self.config.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| ModernizeError::Config(format!("thread pool: {e}")))?
                .install(work),
            None => work(),
        };

        let mut result = ModernizationResult::new(version, frameworks, mode);
        result.descriptor_warning = descriptor_warning;
        result.cancelled = cancel.is_cancelled();
        for (path, report) in reports {
            result.record(path, report);
        }

        let totals = result.totals();
        info!(
            files = totals.files_scanned,
            patterns = totals.patterns_found,
            lines_saved = totals.total_lines_saved,
            failed = totals.files_failed,
            cancelled = result.cancelled,
            "Modernization run finished"
        );
        Ok(result)
    }

    /// Modernize one in-memory unit for the given version and frameworks
    pub fn modernize_source(
        &self,
        path: impl Into<PathBuf>,
        text: String,
        version: VersionTag,
        frameworks: &FrameworkSet,
    ) -> Result<UnitOutcome> {
        let selection = self.catalog.select(version, frameworks);
        process_source(&selection, path, text)
    }
}

impl Default for Modernizer {
    fn default() -> Self {
        Self::new(ModernizeConfig::default())
    }
}

/// Parse, scan, resolve and transform one unit
pub fn process_source(
    selection: &RuleSelection<'_>,
    path: impl Into<PathBuf>,
    text: String,
) -> Result<UnitOutcome> {
    let mut parser = JavaParser::new()?;
    let unit = parser.parse_unit(path, text)?;

    let matches = StructuralMatcher::new(selection).scan(&unit);
    let survivors = ConflictResolver::new().resolve(matches);
    let outcome = TransformEngine::new(selection).apply(&unit, survivors, &mut parser);

    debug!(
        path = %unit.path().display(),
        applied = outcome.transformations.len(),
        abstained = outcome.abstentions.len(),
        "Processed unit"
    );
    Ok(outcome)
}

fn process_file(selection: &RuleSelection<'_>, path: &Path, mode: Mode) -> FileReport {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), "Cannot read unit: {err}");
            return FileReport::failed(FileFailure::Read {
                message: err.to_string(),
            });
        }
    };

    let outcome = match process_source(selection, path, text) {
        Ok(outcome) => outcome,
        Err(err @ ModernizeError::UnitParseFailure { line, .. }) => {
            warn!("{err}");
            return FileReport::failed(FileFailure::Parse {
                line,
                message: err.to_string(),
            });
        }
        Err(err) => {
            warn!(path = %path.display(), "{err}");
            return FileReport::failed(FileFailure::Read {
                message: err.to_string(),
            });
        }
    };

    let mut report = FileReport {
        findings: outcome.transformations.iter().map(Finding::from).collect(),
        abstentions: outcome.abstentions,
        ..FileReport::default()
    };

    if mode == Mode::Apply {
        if let Some(text) = outcome.rewritten {
            match write_atomically(path, &text) {
                Ok(()) => report.written = true,
                Err(source) => {
                    let err = ModernizeError::WriteFailure {
                        path: path.to_path_buf(),
                        source,
                    };
                    warn!("{err}");
                    report.failure = Some(FileFailure::Write {
                        message: err.to_string(),
                    });
                }
            }
        }
    }
    report
}

/// Replace `path` with `text` through a sibling temporary file
fn write_atomically(path: &Path, text: &str) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.as_file().sync_all()?;
    file.as_file().set_permissions(permissions)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
