use std::fs;
use std::path::{Path, PathBuf};

use modernize_core::{
    CancelToken, FileFailure, ModernizeConfig, Mode, Modernizer, RunStatus, VersionTag,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const SERVICE: &str = r#"package demo;

class Service {
    private Registry registry;

    Registry registry() {
        if (registry == null) {
            registry = new Registry();
        }
        return registry;
    }
}
"#;

const PLAIN: &str = r#"package demo;

class Plain {
    int twice(int x) {
        return x * 2;
    }
}
"#;

const SELECTOR: &str = r#"package demo;

class Selector {
    String describe(Object o) {
        if (o instanceof String) {
            String s = (String) o;
            return s.trim();
        }
        return "";
    }
}
"#;

fn pom(release: &str) -> String {
    format!(
        "<project>\n  <properties>\n    <maven.compiler.release>{release}</maven.compiler.release>\n  </properties>\n</project>\n"
    )
}

/// Maven project with the given units under src/main/java/demo
fn project(release: &str, units: &[(&str, &str)]) -> anyhow::Result<TempDir> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("pom.xml"), pom(release))?;
    let package = dir.path().join("src/main/java/demo");
    fs::create_dir_all(&package)?;
    for (name, text) in units {
        fs::write(package.join(name), text)?;
    }
    Ok(dir)
}

fn unit_key(name: &str) -> PathBuf {
    Path::new("src/main/java/demo").join(name)
}

#[test]
fn scan_only_reports_without_touching_files() -> anyhow::Result<()> {
    let dir = project("11", &[("Service.java", SERVICE), ("Plain.java", PLAIN)])?;
    let result = Modernizer::default().run(dir.path(), Mode::ScanOnly)?;

    assert_eq!(result.version, VersionTag::Java11);
    assert_eq!(result.descriptor_warning, None);
    let totals = result.totals();
    assert_eq!(totals.files_scanned, 2);
    assert_eq!(totals.patterns_found, 1);
    assert_eq!(totals.total_lines_saved, 3);
    assert_eq!(totals.files_written, 0);
    assert_eq!(result.status(), RunStatus::Findings);
    assert_eq!(result.status().exit_code(), 1);

    let service = &result.files[&unit_key("Service.java")];
    assert_eq!(service.findings[0].rule_id, "null-guarded-lazy-init");
    assert!(!service.written);
    assert!(result.files[&unit_key("Plain.java")].findings.is_empty());

    let on_disk = fs::read_to_string(dir.path().join(unit_key("Service.java")))?;
    assert_eq!(on_disk, SERVICE);
    Ok(())
}

#[test]
fn apply_rewrites_only_changed_files() -> anyhow::Result<()> {
    let dir = project("11", &[("Service.java", SERVICE), ("Plain.java", PLAIN)])?;
    let result = Modernizer::default().run(dir.path(), Mode::Apply)?;

    assert_eq!(result.totals().files_written, 1);
    assert!(result.files[&unit_key("Service.java")].written);
    assert!(!result.files[&unit_key("Plain.java")].written);

    let service = fs::read_to_string(dir.path().join(unit_key("Service.java")))?;
    assert!(service.contains("    private Registry registry = new Registry();\n"));
    assert!(!service.contains("if (registry == null)"));
    assert_eq!(fs::read_to_string(dir.path().join(unit_key("Plain.java")))?, PLAIN);

    // Nothing is left to do once applied
    let again = Modernizer::default().run(dir.path(), Mode::ScanOnly)?;
    assert_eq!(again.totals().patterns_found, 0);
    assert_eq!(again.status(), RunStatus::NoFindings);
    Ok(())
}

#[test]
fn declared_release_gates_rules() -> anyhow::Result<()> {
    let java8 = project("1.8", &[("Selector.java", SELECTOR)])?;
    let result = Modernizer::default().run(java8.path(), Mode::ScanOnly)?;
    assert_eq!(result.version, VersionTag::Java8);
    assert_eq!(result.totals().patterns_found, 0);

    let java17 = project("17", &[("Selector.java", SELECTOR)])?;
    let result = Modernizer::default().run(java17.path(), Mode::ScanOnly)?;
    assert_eq!(result.version, VersionTag::Java17);
    let findings = &result.files[&unit_key("Selector.java")].findings;
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, "instanceof-cast-to-pattern");
    assert_eq!(findings[0].min_version_required, VersionTag::Java16);
    Ok(())
}

#[test]
fn unparseable_units_fail_alone() -> anyhow::Result<()> {
    let dir = project(
        "21",
        &[("Service.java", SERVICE), ("Broken.java", "class Broken {\n    void f( {\n}\n")],
    )?;
    let result = Modernizer::default().run(dir.path(), Mode::Apply)?;

    let broken = &result.files[&unit_key("Broken.java")];
    assert!(matches!(broken.failure, Some(FileFailure::Parse { .. })));
    assert!(broken.findings.is_empty());
    assert!(result.files[&unit_key("Service.java")].written);

    assert_eq!(result.totals().files_failed, 1);
    assert_eq!(result.status(), RunStatus::Failures);
    assert_eq!(result.status().exit_code(), 2);
    Ok(())
}

#[test]
fn missing_descriptor_falls_back_with_a_warning() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("Selector.java"), SELECTOR)?;
    let config = ModernizeConfig {
        default_version: VersionTag::Java8,
        ..ModernizeConfig::default()
    };
    let result = Modernizer::new(config).run(dir.path(), Mode::ScanOnly)?;
    assert_eq!(result.version, VersionTag::Java8);
    assert!(result.descriptor_warning.is_some());
    assert_eq!(result.totals().files_scanned, 1);
    Ok(())
}

#[test]
fn config_overrides_version_and_rules() -> anyhow::Result<()> {
    let dir = project("8", &[("Selector.java", SELECTOR), ("Service.java", SERVICE)])?;
    let config = ModernizeConfig::from_toml(
        "version = \"21\"\ndisabled_rules = [\"null-guarded-lazy-init\"]\nthreads = 2\n",
    )?;
    let result = Modernizer::new(config).run(dir.path(), Mode::ScanOnly)?;
    assert_eq!(result.version, VersionTag::Java21);

    let rules: Vec<String> = result.rule_stats().into_iter().map(|s| s.rule_id).collect();
    assert_eq!(rules, vec!["instanceof-cast-to-pattern".to_string()]);
    Ok(())
}

#[test]
fn runs_are_deterministic() -> anyhow::Result<()> {
    let dir = project(
        "25",
        &[("Service.java", SERVICE), ("Plain.java", PLAIN), ("Selector.java", SELECTOR)],
    )?;
    let first = Modernizer::default().run(dir.path(), Mode::ScanOnly)?.to_json()?;
    let second = Modernizer::default().run(dir.path(), Mode::ScanOnly)?.to_json()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn cancelled_runs_start_no_units() -> anyhow::Result<()> {
    let dir = project("17", &[("Service.java", SERVICE)])?;
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = Modernizer::default().run_with_cancel(dir.path(), Mode::Apply, &cancel)?;
    assert!(result.cancelled);
    assert!(result.files.is_empty());
    assert_eq!(fs::read_to_string(dir.path().join(unit_key("Service.java")))?, SERVICE);
    Ok(())
}

#[test]
fn json_report_names() -> anyhow::Result<()> {
    let dir = project("17", &[("Service.java", SERVICE)])?;
    let result = Modernizer::default().run(dir.path(), Mode::ScanOnly)?;
    let value: serde_json::Value = serde_json::from_str(&result.to_json()?)?;

    assert_eq!(value["version"], "17");
    assert_eq!(value["mode"], "scan-only");
    assert_eq!(value["status"], "findings");
    assert_eq!(value["totals"]["filesScanned"], 1);
    assert_eq!(value["totals"]["totalLinesSaved"], 3);
    let finding = &value["files"]["src/main/java/demo/Service.java"]["findings"][0];
    assert_eq!(finding["ruleId"], "null-guarded-lazy-init");
    assert_eq!(finding["minVersionRequired"], "8");
    assert_eq!(finding["line"], 7);
    Ok(())
}

#[test]
fn missing_root_is_fatal() {
    let err = Modernizer::default()
        .run(Path::new("/definitely/not/a/project"), Mode::ScanOnly)
        .unwrap_err();
    assert!(err.is_fatal());
}
