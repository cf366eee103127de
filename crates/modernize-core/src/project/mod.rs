/*!
# Project Collaborators

What the engine needs to know about a project before it looks at any code:
the Java release in effect, the frameworks in use and the compilation units
to process. The filesystem implementation reads build descriptors; tests and
embedders can substitute their own.
*/

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::version::{FrameworkSet, VersionTag};

pub mod descriptor;
pub mod frameworks;
pub mod sources;

/// Project facts consumed by the pipeline
pub trait ProjectLayout: Send + Sync {
    /// Declared release; `DescriptorUnreadable` when it cannot be determined
    fn resolve_version(&self, root: &Path) -> Result<VersionTag>;

    fn detect_frameworks(&self, root: &Path) -> FrameworkSet;

    /// Compilation units to process; failure here aborts the run
    fn list_source_units(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// Reads Maven/Gradle descriptors and walks the source tree
#[derive(Debug, Clone)]
pub struct FsProject {
    exclude_dirs: Vec<String>,
}

impl FsProject {
    pub fn new(exclude_dirs: Vec<String>) -> Self {
        Self { exclude_dirs }
    }
}

impl ProjectLayout for FsProject {
    fn resolve_version(&self, root: &Path) -> Result<VersionTag> {
        descriptor::resolve_version(root)
    }

    fn detect_frameworks(&self, root: &Path) -> FrameworkSet {
        frameworks::detect_frameworks(root)
    }

    fn list_source_units(&self, root: &Path) -> Result<Vec<PathBuf>> {
        sources::list_source_units(root, &self.exclude_dirs)
    }
}
