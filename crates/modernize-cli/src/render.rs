//! Report rendering for the terminal and for machines

use std::str::FromStr;

use modernize_core::{
    FileReport, FrameworkSet, Mode, ModernizationResult, RuleCatalog, VersionTag,
};

/// Output format selected with `--format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format '{other}'")),
        }
    }
}

pub fn render(result: &ModernizationResult, format: Format) -> serde_json::Result<String> {
    match format {
        Format::Text => Ok(render_text(result)),
        Format::Json => result.to_json(),
    }
}

fn frameworks_label(frameworks: &FrameworkSet) -> String {
    if frameworks.is_empty() {
        "none".to_string()
    } else {
        frameworks
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::ScanOnly => "scan only",
        Mode::Apply => "apply",
    }
}

fn render_file(path: &str, report: &FileReport, out: &mut String) {
    out.push_str(&format!("{path}\n"));
    for finding in &report.findings {
        out.push_str(&format!(
            "  {:>5}  {:<32} {:<26} {:<8} {} lines saved\n",
            finding.line,
            finding.rule_id,
            finding.pattern_category.name(),
            finding.min_version_required.to_string(),
            finding.lines_saved,
        ));
    }
    if !report.abstentions.is_empty() {
        out.push_str(&format!("  {} match(es) left alone\n", report.abstentions.len()));
    }
    if let Some(failure) = &report.failure {
        out.push_str(&format!("  failed: {}\n", failure.message()));
    }
    if report.written {
        out.push_str("  written\n");
    }
}

pub fn render_text(result: &ModernizationResult) -> String {
    let mut out = format!(
        "{} (frameworks: {}), {}\n",
        result.version,
        frameworks_label(&result.frameworks),
        mode_label(result.mode),
    );
    if let Some(warning) = &result.descriptor_warning {
        out.push_str(&format!("warning: {warning}\n"));
    }
    out.push('\n');

    for (path, report) in &result.files {
        if report.findings.is_empty() && report.abstentions.is_empty() && report.failure.is_none() {
            continue;
        }
        render_file(&path.display().to_string(), report, &mut out);
    }

    let categories = result.by_category();
    if !categories.is_empty() {
        out.push_str("\nBy category:\n");
        for (category, count) in categories {
            out.push_str(&format!("  {:<26} {count}\n", category.name()));
        }
    }

    let totals = result.totals();
    out.push_str(&format!(
        "\n{} files scanned, {} patterns found, {} lines saved, {} abstentions, {} files failed, {} files written\n",
        totals.files_scanned,
        totals.patterns_found,
        totals.total_lines_saved,
        totals.abstentions,
        totals.files_failed,
        totals.files_written,
    ));
    if result.cancelled {
        out.push_str("Run was cancelled; remaining files were not processed\n");
    }
    out
}

/// The catalog, marking which rules run for `version` and `frameworks`
pub fn render_rules(catalog: &RuleCatalog, version: VersionTag, frameworks: &FrameworkSet) -> String {
    let mut out = format!(
        "Rules for {version} (frameworks: {}):\n",
        frameworks_label(frameworks)
    );
    for rule in catalog.rules() {
        let status = if rule.is_active(version, frameworks) {
            "active"
        } else {
            "inactive"
        };
        let requires = match rule.framework {
            Some(framework) => format!("{}+, {framework}", rule.min_version),
            None => format!("{}+", rule.min_version),
        };
        out.push_str(&format!(
            "  {status:<8} {:<32} {requires:<18} {}\n",
            rule.id, rule.description
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use modernize_core::{Category, FileFailure, Finding, FrameworkTag};
    use pretty_assertions::assert_eq;

    fn sample() -> ModernizationResult {
        let mut result = ModernizationResult::new(VersionTag::Java17, FrameworkSet::new(), Mode::ScanOnly);
        result.record(
            PathBuf::from("src/Service.java"),
            FileReport {
                findings: vec![Finding {
                    rule_id: "null-guarded-lazy-init",
                    pattern_category: Category::LazyInitToInitializer,
                    min_version_required: VersionTag::Java8,
                    lines_saved: 3,
                    line: 7,
                }],
                ..FileReport::default()
            },
        );
        result.record(PathBuf::from("src/Plain.java"), FileReport::default());
        result.record(
            PathBuf::from("src/Broken.java"),
            FileReport::failed(FileFailure::Parse {
                line: 2,
                message: "Parse failure in src/Broken.java at line 2".to_string(),
            }),
        );
        result
    }

    #[test]
    fn formats_parse() {
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert_eq!("text".parse::<Format>(), Ok(Format::Text));
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn text_lists_findings_failures_and_totals() {
        let text = render_text(&sample());
        assert!(text.starts_with("Java 17 (frameworks: none), scan only\n"));
        assert!(text.contains("src/Service.java\n"));
        assert!(text.contains("null-guarded-lazy-init"));
        assert!(text.contains("3 lines saved"));
        assert!(text.contains("  failed: Parse failure in src/Broken.java at line 2\n"));
        assert!(!text.contains("src/Plain.java"));
        assert!(text.contains(
            "3 files scanned, 1 patterns found, 3 lines saved, 0 abstentions, 1 files failed, 0 files written"
        ));
    }

    #[test]
    fn json_is_the_report_document() {
        let json = render(&sample(), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "failures");
        assert_eq!(value["totals"]["patternsFound"], 1);
    }

    #[test]
    fn rule_list_marks_gated_rules() {
        let catalog = RuleCatalog::builtin();
        let text = render_rules(&catalog, VersionTag::Java11, &FrameworkSet::new());
        let line = |id: &str| {
            text.lines()
                .find(|l| l.contains(id))
                .map(|l| l.trim_start().to_string())
                .unwrap()
        };
        assert!(line("pojo-to-record").starts_with("inactive"));
        assert!(line("loop-find-or-throw").starts_with("active"));
        assert!(line("request-mapping-shortcut").starts_with("inactive"));

        let spring: FrameworkSet = [FrameworkTag::Spring].into_iter().collect();
        let text = render_rules(&catalog, VersionTag::Java11, &spring);
        let spring_line = text
            .lines()
            .find(|l| l.contains("request-mapping-shortcut"))
            .unwrap();
        assert!(spring_line.trim_start().starts_with("active"));
        assert!(spring_line.contains("Java 8+, spring"));
    }
}
