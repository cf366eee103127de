/*!
# Modernization Report

Per-file findings, abstentions and failures of one run, keyed and ordered
by path, with totals and the run status derived from them.
*/

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::rules::Category;
use crate::transform::{Abstention, Transformation};
use crate::version::{FrameworkSet, VersionTag};

/// Whether files are only inspected or also rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    ScanOnly,
    Apply,
}

/// One applied (or, in scan-only mode, applicable) transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: &'static str,
    pub pattern_category: Category,
    pub min_version_required: VersionTag,
    pub lines_saved: i64,
    pub line: usize,
}

impl From<&Transformation> for Finding {
    fn from(t: &Transformation) -> Self {
        Self {
            rule_id: t.rule_id,
            pattern_category: t.category,
            min_version_required: t.min_version,
            lines_saved: t.lines_saved,
            line: t.line,
        }
    }
}

/// Why a file produced no result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum FileFailure {
    Read { message: String },
    Parse { line: usize, message: String },
    Write { message: String },
}

impl FileFailure {
    pub fn message(&self) -> &str {
        match self {
            FileFailure::Read { message }
            | FileFailure::Parse { message, .. }
            | FileFailure::Write { message } => message,
        }
    }
}

/// Everything the run learned about one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub abstentions: Vec<Abstention>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FileFailure>,
    pub written: bool,
}

impl FileReport {
    pub fn failed(failure: FileFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn lines_saved(&self) -> i64 {
        self.findings.iter().map(|f| f.lines_saved).sum()
    }
}

/// Aggregate counters over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub files_scanned: usize,
    pub patterns_found: usize,
    pub total_lines_saved: i64,
    pub files_failed: usize,
    pub files_written: usize,
    pub abstentions: usize,
}

/// Per-rule statistics over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleStats {
    pub rule_id: String,
    pub applied: usize,
    pub abstained: usize,
    pub lines_saved: i64,
}

impl RuleStats {
    /// Share of guarded matches that were applied
    pub fn success_rate(&self) -> f64 {
        let total = self.applied + self.abstained;
        if total == 0 {
            0.0
        } else {
            self.applied as f64 / total as f64
        }
    }
}

/// Overall outcome, mapped to a process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    NoFindings,
    Findings,
    Failures,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::NoFindings => 0,
            RunStatus::Findings => 1,
            RunStatus::Failures => 2,
        }
    }
}

/// The result of one modernization run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernizationResult {
    pub version: VersionTag,
    pub frameworks: FrameworkSet,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor_warning: Option<String>,
    pub files: BTreeMap<PathBuf, FileReport>,
    pub cancelled: bool,
}

impl ModernizationResult {
    pub fn new(version: VersionTag, frameworks: FrameworkSet, mode: Mode) -> Self {
        Self {
            version,
            frameworks,
            mode,
            descriptor_warning: None,
            files: BTreeMap::new(),
            cancelled: false,
        }
    }

    pub fn record(&mut self, path: PathBuf, report: FileReport) {
        self.files.insert(path, report);
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals {
            files_scanned: self.files.len(),
            ..Totals::default()
        };
        for report in self.files.values() {
            totals.patterns_found += report.findings.len();
            totals.total_lines_saved += report.lines_saved();
            totals.abstentions += report.abstentions.len();
            if report.failure.is_some() {
                totals.files_failed += 1;
            }
            if report.written {
                totals.files_written += 1;
            }
        }
        totals
    }

    pub fn status(&self) -> RunStatus {
        let totals = self.totals();
        if totals.files_failed > 0 {
            RunStatus::Failures
        } else if totals.patterns_found > 0 {
            RunStatus::Findings
        } else {
            RunStatus::NoFindings
        }
    }

    /// Findings counted per category
    pub fn by_category(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for finding in self.files.values().flat_map(|r| r.findings.iter()) {
            *counts.entry(finding.pattern_category).or_insert(0) += 1;
        }
        counts
    }

    /// Applied and abstained counts per rule
    pub fn rule_stats(&self) -> Vec<RuleStats> {
        let mut stats: BTreeMap<&str, RuleStats> = BTreeMap::new();
        for report in self.files.values() {
            for finding in &report.findings {
                let entry = stats.entry(finding.rule_id).or_insert_with(|| RuleStats {
                    rule_id: finding.rule_id.to_string(),
                    ..RuleStats::default()
                });
                entry.applied += 1;
                entry.lines_saved += finding.lines_saved;
            }
            for abstention in &report.abstentions {
                let entry = stats.entry(abstention.rule_id).or_insert_with(|| RuleStats {
                    rule_id: abstention.rule_id.to_string(),
                    ..RuleStats::default()
                });
                entry.abstained += 1;
            }
        }
        stats.into_values().collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Document<'a> {
            #[serde(flatten)]
            result: &'a ModernizationResult,
            totals: Totals,
            status: RunStatus,
        }

        serde_json::to_string_pretty(&Document {
            result: self,
            totals: self.totals(),
            status: self.status(),
        })
    }
}
