use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_SENTINEL: &str = "types";
pub const CONFIG_FILE_NAME: &str = "tsconfig.json";

/// One package directory under the sentinel folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub root: PathBuf,
    pub config_path: PathBuf,
}

impl Package {
    pub fn new(name: String, root: PathBuf) -> Self {
        let config_path = root.join(CONFIG_FILE_NAME);
        Self {
            name,
            root,
            config_path,
        }
    }
}

/// Attributes files to packages by walking up to the sentinel directory.
///
/// `types/foo/index.d.ts` and `types/foo/sub/deep.d.ts` both belong to `foo`.
/// A path with no sentinel ancestor falls back to its own basename.
#[derive(Debug, Clone)]
pub struct PackageNameResolver {
    sentinel: OsString,
}

impl PackageNameResolver {
    pub fn new(sentinel: impl Into<OsString>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    pub fn package_of(&self, file_path: &Path) -> String {
        for candidate in file_path.ancestors() {
            let parent_name = candidate.parent().and_then(Path::file_name);
            if parent_name == Some(self.sentinel.as_os_str()) {
                if let Some(name) = candidate.file_name() {
                    return name.to_string_lossy().into_owned();
                }
            }
        }

        file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Default for PackageNameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_and_nested_files_resolve_to_package_directory() {
        let names = PackageNameResolver::default();
        assert_eq!(names.package_of(Path::new("/repo/types/foo/index.d.ts")), "foo");
        assert_eq!(names.package_of(Path::new("/repo/types/foo/sub/deep.ts")), "foo");
        assert_eq!(names.package_of(Path::new("/repo/types/foo")), "foo");
    }

    #[test]
    fn versioned_subdirectory_belongs_to_its_package() {
        let names = PackageNameResolver::default();
        assert_eq!(
            names.package_of(Path::new("/repo/types/react/v16/index.d.ts")),
            "react"
        );
    }

    #[test]
    fn path_outside_sentinel_falls_back_to_basename() {
        let names = PackageNameResolver::default();
        assert_eq!(
            names.package_of(Path::new("/usr/lib/typescript/lib.es5.d.ts")),
            "lib.es5.d.ts"
        );
    }

    #[test]
    fn custom_sentinel_is_honoured() {
        let names = PackageNameResolver::new("packages");
        assert_eq!(names.package_of(Path::new("/mono/packages/core/src/a.ts")), "core");
        assert_eq!(names.package_of(Path::new("/mono/types/core/a.ts")), "a.ts");
    }
}
