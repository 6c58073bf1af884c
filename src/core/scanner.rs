use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::package::Package;

/// Lists the package directories sitting directly under the sentinel folder
pub struct PackageScanner {
    sentinel: String,
}

impl PackageScanner {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    /// Directory whose children are packages
    pub fn packages_dir(&self, repository_root: &Path) -> PathBuf {
        repository_root.join(&self.sentinel)
    }

    /// Enumerate packages sorted by name so repeated runs are comparable
    pub fn scan_packages(&self, repository_root: &Path) -> Result<Vec<Package>> {
        let packages_dir = self.packages_dir(repository_root);
        let packages_dir = packages_dir.canonicalize().with_context(|| {
            format!("package directory {} is not readable", packages_dir.display())
        })?;

        let mut packages = Vec::new();
        for entry in WalkDir::new(&packages_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry
                .with_context(|| format!("failed to list {}", packages_dir.display()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            packages.push(Package::new(name, entry.into_path()));
        }

        log::info!(
            "found {} packages under {}",
            packages.len(),
            packages_dir.display()
        );
        Ok(packages)
    }
}
