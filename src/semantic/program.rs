use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tree_sitter::Node as TSNode;

use super::binder::{Binder, Bindings};
use super::config::{load_config, ConfigError, ParsedConfig};
use super::{Diagnostic, FileId, SemanticEngine};
use crate::parsers::common::{find_child_by_kind, string_literal_value};
use crate::parsers::{ParsedFile, ParserFactory};

const SOURCE_EXTENSIONS: [&str; 3] = ["d.ts", "ts", "tsx"];

/// The bundled engine: configuration loading, module resolution and binding
#[derive(Debug, Clone, Default)]
pub struct TypeScriptEngine;

impl TypeScriptEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SemanticEngine for TypeScriptEngine {
    type Model = Program;

    fn compile(
        &self,
        config_path: &Path,
        on_diagnostic: &mut dyn FnMut(&Diagnostic),
    ) -> Result<Program, ConfigError> {
        let config = load_config(config_path, on_diagnostic)?;
        Ok(Program::build(config))
    }
}

/// Every file reachable from one configuration, parsed and bound
pub struct Program {
    config: ParsedConfig,
    pub(crate) files: Vec<ParsedFile>,
    /// Per file: module specifier -> file it resolved to
    pub(crate) resolved_modules: Vec<HashMap<String, FileId>>,
    pub(crate) bindings: Bindings,
}

impl Program {
    pub fn build(config: ParsedConfig) -> Self {
        let resolver = ModuleResolver::new(&config);
        let factory = ParserFactory::new();

        let mut queue: VecDeque<PathBuf> = config.root_files.iter().cloned().collect();
        for name in &config.types {
            match resolver.resolve_type_reference(name) {
                Some(path) => queue.push_back(path),
                None => log::debug!("cannot find type definition package '{name}'"),
            }
        }

        let mut files = Vec::new();
        let mut file_ids: HashMap<PathBuf, FileId> = HashMap::new();
        let mut specifier_targets: Vec<Vec<(String, PathBuf)>> = Vec::new();

        while let Some(path) = queue.pop_front() {
            if file_ids.contains_key(&path) {
                continue;
            }
            let parser = factory.get_parser(&path);
            let parsed = match parser.parse_file(&path) {
                Ok(parsed) => parsed,
                Err(err) => {
                    log::warn!(
                        "skipping {} ({}): {err}",
                        path.display(),
                        parser.language_name()
                    );
                    continue;
                }
            };

            let mut targets = Vec::new();
            for reference in collect_file_references(&parsed) {
                match reference {
                    FileReference::Module(specifier) => {
                        if let Some(target) = resolver.resolve_module(&specifier, &path) {
                            queue.push_back(target.clone());
                            targets.push((specifier, target));
                        }
                    }
                    FileReference::Types(name) => {
                        if let Some(target) = resolver.resolve_type_reference(&name) {
                            queue.push_back(target);
                        }
                    }
                    FileReference::Path(relative) => {
                        if let Some(target) = resolver.resolve_relative(&relative, &path) {
                            queue.push_back(target);
                        }
                    }
                }
            }

            file_ids.insert(path, FileId(files.len() as u32));
            files.push(parsed);
            specifier_targets.push(targets);
        }

        let resolved_modules = specifier_targets
            .into_iter()
            .map(|targets| {
                targets
                    .into_iter()
                    .filter_map(|(specifier, path)| file_ids.get(&path).map(|id| (specifier, *id)))
                    .collect()
            })
            .collect();

        let bindings = Binder::bind(&files);
        log::debug!(
            "compiled {} with {} files and {} symbols",
            config.config_path.display(),
            files.len(),
            bindings.symbols.len()
        );

        Self {
            config,
            files,
            resolved_modules,
            bindings,
        }
    }

    pub fn config(&self) -> &ParsedConfig {
        &self.config
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.files
            .iter()
            .position(|file| file.path == path)
            .map(|index| FileId(index as u32))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileReference {
    Module(String),
    Types(String),
    Path(String),
}

fn reference_directive() -> &'static Regex {
    static DIRECTIVE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE.get_or_init(|| {
        Regex::new(r#"^///\s*<reference\s+(types|path)\s*=\s*["']([^"']+)["']"#)
            .expect("reference directive pattern is valid")
    })
}

/// Module specifiers and triple-slash directives anywhere in the file
fn collect_file_references(parsed: &ParsedFile) -> Vec<FileReference> {
    let source = parsed.source_bytes();
    let mut references = Vec::new();
    let mut stack: Vec<TSNode<'_>> = vec![parsed.tree.root_node()];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "comment" => {
                let text = crate::parsers::common::extract_text(&node, source);
                if let Some(captures) = reference_directive().captures(text) {
                    let value = captures[2].to_string();
                    references.push(match &captures[1] {
                        "types" => FileReference::Types(value),
                        _ => FileReference::Path(value),
                    });
                }
                continue;
            }
            "import_statement" | "export_statement" => {
                let source_node = node.child_by_field_name("source").or_else(|| {
                    find_child_by_kind(&node, "import_require_clause").and_then(|clause| {
                        clause
                            .child_by_field_name("source")
                            .or_else(|| find_child_by_kind(&clause, "string"))
                    })
                });
                if let Some(source_node) = source_node {
                    references.push(FileReference::Module(
                        string_literal_value(&source_node, source).to_string(),
                    ));
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    references
}

/// Maps specifiers to files the way the repository's configurations expect
pub struct ModuleResolver<'c> {
    config: &'c ParsedConfig,
}

impl<'c> ModuleResolver<'c> {
    pub fn new(config: &'c ParsedConfig) -> Self {
        Self { config }
    }

    pub fn resolve_module(&self, specifier: &str, from_file: &Path) -> Option<PathBuf> {
        if is_relative(specifier) {
            return self.resolve_relative(specifier, from_file);
        }

        let base_url = self
            .config
            .base_url
            .clone()
            .or_else(|| self.config.config_path.parent().map(Path::to_path_buf))?;
        for mapping in &self.config.paths {
            let Some(targets) = mapping.apply(specifier) else {
                continue;
            };
            if let Some(found) = targets
                .iter()
                .find_map(|target| try_source_candidates(&base_url.join(target)))
            {
                return Some(found);
            }
        }

        self.resolve_type_reference(specifier)
    }

    /// `/// <reference types="name" />` and bare package specifiers
    pub fn resolve_type_reference(&self, name: &str) -> Option<PathBuf> {
        let mangled = mangle_scoped_name(name);
        self.config
            .type_roots
            .iter()
            .find_map(|root| try_source_candidates(&root.join(&mangled)))
    }

    pub fn resolve_relative(&self, specifier: &str, from_file: &Path) -> Option<PathBuf> {
        let base = from_file.parent().unwrap_or_else(|| Path::new(""));
        try_source_candidates(&base.join(specifier))
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || specifier.starts_with('/')
}

/// `@scope/name/rest` lives in the `scope__name` package directory
pub fn mangle_scoped_name(name: &str) -> String {
    match name.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, rest)) => format!("{scope}__{rest}"),
        None => name.to_string(),
    }
}

fn try_source_candidates(base: &Path) -> Option<PathBuf> {
    let text = base.to_string_lossy();
    if SOURCE_EXTENSIONS.iter().any(|ext| text.ends_with(&format!(".{ext}"))) && base.is_file() {
        return base.canonicalize().ok();
    }

    let stem = ["js", "mjs", "cjs"]
        .iter()
        .find_map(|ext| text.strip_suffix(&format!(".{ext}")))
        .unwrap_or(text.as_ref());

    let mut candidates: Vec<PathBuf> = SOURCE_EXTENSIONS
        .iter()
        .map(|ext| PathBuf::from(format!("{stem}.{ext}")))
        .collect();

    let dir = Path::new(stem);
    if dir.is_dir() {
        if let Some(entry) = package_types_entry(dir) {
            candidates.push(entry);
        }
        candidates.extend(SOURCE_EXTENSIONS.iter().map(|ext| dir.join(format!("index.{ext}"))));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .and_then(|found| found.canonicalize().ok())
}

/// The `types`/`typings` entry of a `package.json`, if the directory has one
fn package_types_entry(dir: &Path) -> Option<PathBuf> {
    let text = fs::read_to_string(dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&text).ok()?;
    let entry = manifest
        .get("types")
        .or_else(|| manifest.get("typings"))?
        .as_str()?;
    Some(dir.join(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::typescript::TypeScriptParser;

    #[test]
    fn scoped_names_are_mangled() {
        assert_eq!(mangle_scoped_name("@babel/core"), "babel__core");
        assert_eq!(mangle_scoped_name("@babel/core/lib"), "babel__core/lib");
        assert_eq!(mangle_scoped_name("lodash"), "lodash");
    }

    #[test]
    fn file_references_include_imports_and_directives() {
        let code = r#"/// <reference types="node" />
/// <reference path="./globals.d.ts" />
import { A } from "a";
import B = require("b");
export * from "./c";
declare module "d" { import { E } from "e"; }
"#;
        let parsed = TypeScriptParser::new()
            .unwrap()
            .parse_source(Path::new("/t/x/index.d.ts"), code.to_string())
            .unwrap();
        let references = collect_file_references(&parsed);
        assert_eq!(
            references,
            vec![
                FileReference::Types("node".to_string()),
                FileReference::Path("./globals.d.ts".to_string()),
                FileReference::Module("a".to_string()),
                FileReference::Module("b".to_string()),
                FileReference::Module("./c".to_string()),
                FileReference::Module("e".to_string()),
            ]
        );
    }
}
