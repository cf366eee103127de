//! Framework detection by keyword scan of build and resource files

use std::path::Path;

use tracing::debug;

use super::descriptor::DescriptorKind;
use crate::version::{FrameworkSet, FrameworkTag};

/// Resource files scanned besides the build descriptors
const RESOURCE_FILES: &[&str] = &[
    "src/main/resources/application.properties",
    "src/main/resources/application.yml",
    "src/main/resources/application.yaml",
];

fn markers(tag: FrameworkTag) -> &'static [&'static str] {
    match tag {
        FrameworkTag::Spring => &["org.springframework", "spring-boot", "spring-web"],
        FrameworkTag::Reactor => &["io.projectreactor", "reactor-core", "spring-webflux", "spring-boot-starter-webflux"],
        FrameworkTag::Quarkus => &["io.quarkus"],
        FrameworkTag::Micronaut => &["io.micronaut"],
        FrameworkTag::JakartaEe => &["jakarta.platform", "jakarta.jakartaee-api", "javaee-api"],
    }
}

/// Frameworks mentioned in `text`
pub fn frameworks_in(text: &str) -> FrameworkSet {
    FrameworkTag::ALL
        .iter()
        .copied()
        .filter(|tag| markers(*tag).iter().any(|m| text.contains(m)))
        .collect()
}

/// Frameworks used by the project at `root`
pub fn detect_frameworks(root: &Path) -> FrameworkSet {
    let files = DescriptorKind::ALL
        .iter()
        .map(|kind| kind.file_name())
        .chain(RESOURCE_FILES.iter().copied());

    let mut found = FrameworkSet::new();
    for file in files {
        let path = root.join(file);
        if let Ok(text) = std::fs::read_to_string(&path) {
            found.extend(frameworks_in(&text));
        }
    }
    debug!(root = %root.display(), frameworks = ?found, "Detected frameworks");
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webflux_implies_spring_and_reactor() {
        let found = frameworks_in("implementation 'org.springframework.boot:spring-boot-starter-webflux'");
        assert!(found.contains(&FrameworkTag::Spring));
        assert!(found.contains(&FrameworkTag::Reactor));
        assert!(!found.contains(&FrameworkTag::Quarkus));
    }

    #[test]
    fn plain_projects_have_no_frameworks() {
        assert!(frameworks_in("<dependency><artifactId>junit</artifactId></dependency>").is_empty());
    }

    #[test]
    fn scans_descriptor_and_resources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<groupId>io.quarkus</groupId>").unwrap();
        let resources = dir.path().join("src/main/resources");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(resources.join("application.yml"), "micronaut:\n  application: io.micronaut\n").unwrap();

        let found = detect_frameworks(dir.path());
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![FrameworkTag::Quarkus, FrameworkTag::Micronaut]
        );
    }
}
