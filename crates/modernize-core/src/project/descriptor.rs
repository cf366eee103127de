//! Declared Java release from Maven and Gradle build descriptors

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ModernizeError, Result};
use crate::version::VersionTag;

/// Build descriptor formats, in lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Maven,
    Gradle,
    GradleKotlin,
}

impl DescriptorKind {
    pub const ALL: [DescriptorKind; 3] = [
        DescriptorKind::Maven,
        DescriptorKind::Gradle,
        DescriptorKind::GradleKotlin,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            DescriptorKind::Maven => "pom.xml",
            DescriptorKind::Gradle => "build.gradle",
            DescriptorKind::GradleKotlin => "build.gradle.kts",
        }
    }

    fn patterns(self) -> &'static [Regex] {
        match self {
            DescriptorKind::Maven => MAVEN.as_slice(),
            DescriptorKind::Gradle | DescriptorKind::GradleKotlin => GRADLE.as_slice(),
        }
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
}

static MAVEN: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"<maven\.compiler\.release>\s*([^<\s]+)\s*</",
        r"<release>\s*([^<\s]+)\s*</release>",
        r"<maven\.compiler\.source>\s*([^<\s]+)\s*</",
        r"<maven\.compiler\.target>\s*([^<\s]+)\s*</",
        r"<java\.version>\s*([^<\s]+)\s*</",
        r"<source>\s*([^<\s]+)\s*</source>",
    ])
});

static GRADLE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"JavaLanguageVersion\.of\(\s*(\d+)\s*\)",
        r"jvmToolchain\(\s*(\d+)\s*\)",
        r"options\.release(?:\.set\()?\s*=?\s*(\d+)",
        r#"sourceCompatibility\s*=\s*(?:JavaVersion\.)?['"]?([A-Z_\d.]+)['"]?"#,
        r#"targetCompatibility\s*=\s*(?:JavaVersion\.)?['"]?([A-Z_\d.]+)['"]?"#,
    ])
});

static PROPERTY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\$\{([^}]+)\}$").ok());

/// First descriptor present under `root`
pub fn find_descriptor(root: &Path) -> Option<(DescriptorKind, PathBuf)> {
    DescriptorKind::ALL
        .iter()
        .map(|kind| (*kind, root.join(kind.file_name())))
        .find(|(_, path)| path.is_file())
}

/// Release declared in descriptor text, following one level of Maven
/// `${property}` indirection
pub fn declared_release(kind: DescriptorKind, text: &str) -> Option<u32> {
    for pattern in kind.patterns() {
        for captures in pattern.captures_iter(text) {
            let Some(value) = captures.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if let Some(release) = VersionTag::parse_release(value) {
                return Some(release);
            }
            if let Some(resolved) = resolve_property(text, value) {
                return Some(resolved);
            }
        }
    }
    None
}

fn resolve_property(text: &str, value: &str) -> Option<u32> {
    let name = PROPERTY.as_ref()?.captures(value)?.get(1)?.as_str();
    let pattern = Regex::new(&format!(r"<{}>\s*([^<\s]+)\s*</", regex::escape(name))).ok()?;
    let declared = pattern.captures(text)?.get(1)?.as_str();
    VersionTag::parse_release(declared)
}

/// Version epoch declared by the project at `root`
pub fn resolve_version(root: &Path) -> Result<VersionTag> {
    let (kind, path) = find_descriptor(root).ok_or_else(|| ModernizeError::DescriptorUnreadable {
        path: root.to_path_buf(),
        reason: "no pom.xml, build.gradle or build.gradle.kts".to_string(),
    })?;

    let text = std::fs::read_to_string(&path).map_err(|e| ModernizeError::DescriptorUnreadable {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    declared_release(kind, &text)
        .map(VersionTag::from_release)
        .ok_or_else(|| ModernizeError::DescriptorUnreadable {
            path,
            reason: "no Java release declared".to_string(),
        })
}
