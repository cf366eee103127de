//! Enumeration of Java compilation units under a project root

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::error::{ModernizeError, Result};

fn is_excluded(entry: &DirEntry, exclude_dirs: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || exclude_dirs.iter().any(|d| *d == name)
}

/// Every `*.java` file under `root`, sorted
pub fn list_source_units(root: &Path, exclude_dirs: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ModernizeError::SourceEnumeration {
            root: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut units = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_excluded(e, exclude_dirs));

    for entry in walker {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "java") {
                    units.push(path.to_path_buf());
                }
            }
            Err(err) if err.depth() == 0 => {
                return Err(ModernizeError::SourceEnumeration {
                    root: root.to_path_buf(),
                    reason: err.to_string(),
                });
            }
            Err(err) => warn!("Skipping unreadable entry: {err}"),
        }
    }

    units.sort();
    Ok(units)
}
