#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use typedeps::core::Edge;

pub const DT_TSCONFIG: &str = r#"{
    // Mirrors a DefinitelyTyped package config
    "compilerOptions": {
        "module": "commonjs",
        "lib": ["es6"],
        "strict": true,
        "typeRoots": ["../"],
        "types": [],
        "noEmit": true,
    },
    "files": ["index.d.ts"]
}"#;

/// A throwaway `<root>/types/<package>/...` repository
pub struct Repo {
    dir: TempDir,
}

impl Repo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("types")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.root().join("types").join(package)
    }

    /// Write a file below `types/<package>/`
    pub fn write(&self, package: &str, relative: &str, contents: &str) -> &Self {
        let path = self.package_dir(package).join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    /// Package with an empty config, which includes every file in its folder
    pub fn package(&self, package: &str, files: &[(&str, &str)]) -> &Self {
        self.write(package, "tsconfig.json", "{}");
        for (relative, contents) in files {
            self.write(package, relative, contents);
        }
        self
    }

    /// Package with a DefinitelyTyped-style config rooted at `index.d.ts`
    pub fn dt_package(&self, package: &str, index: &str) -> &Self {
        self.write(package, "tsconfig.json", DT_TSCONFIG);
        self.write(package, "index.d.ts", index)
    }
}

/// The producer/consumer pair most tests start from
pub fn box_repo() -> Repo {
    let repo = Repo::new();
    repo.dt_package(
        "b",
        "export interface Foo { x: number }\nexport interface Box<T> { value: T }\n",
    );
    repo.dt_package(
        "a",
        "import { Foo, Box } from \"b\";\nexport interface UsesFoo {\n    foo: Foo;\n    boxed: Box<Foo>;\n}\n",
    );
    repo
}

pub fn edge(from: &str, to: &str, type_name: &str) -> Edge {
    Edge::new(from, to, type_name)
}

pub fn sorted(mut edges: Vec<Edge>) -> Vec<Edge> {
    edges.sort();
    edges
}
