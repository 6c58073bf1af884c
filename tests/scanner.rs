use std::fs;

use typedeps::core::package::{PackageNameResolver, CONFIG_FILE_NAME};
use typedeps::core::scanner::PackageScanner;

#[test]
fn scanner_lists_package_directories_in_name_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let types = dir.path().join("types");
    for name in ["zeta", "alpha", "mid", ".git"] {
        fs::create_dir_all(types.join(name)).unwrap();
    }
    fs::write(types.join("README.md"), "# not a package").unwrap();

    let packages = PackageScanner::new("types").scan_packages(dir.path()).unwrap();
    let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);

    let alpha = &packages[0];
    assert_eq!(alpha.config_path, alpha.root.join(CONFIG_FILE_NAME));
}

#[test]
fn scanned_roots_attribute_back_to_their_package() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("types/foo/sub")).unwrap();

    let packages = PackageScanner::new("types").scan_packages(dir.path()).unwrap();
    let names = PackageNameResolver::default();
    let deep = packages[0].root.join("sub").join("deep.d.ts");
    assert_eq!(names.package_of(&deep), "foo");
}

#[test]
fn missing_sentinel_directory_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    assert!(PackageScanner::new("types").scan_packages(dir.path()).is_err());
}
