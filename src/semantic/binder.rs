use std::collections::HashMap;
use tree_sitter::Node as TSNode;

use super::{Declaration, FileId, Symbol, SymbolId};
use crate::parsers::common::{
    extract_text, find_child_by_kind, has_token, split_qualified, string_literal_value,
};
use crate::parsers::ParsedFile;

pub(crate) type NameTable = HashMap<String, SymbolId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ModuleId(pub u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportBinding {
    Named { specifier: String, name: String },
    Namespace { specifier: String },
    Default { specifier: String },
    /// `import X = A.B`
    Entity { path: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExportTarget {
    Local(String),
    ReExport { specifier: String, name: String },
    Namespace { specifier: String },
}

/// Scope of a module file or of an ambient `declare module "x"` body
#[derive(Debug)]
pub(crate) struct ModuleScope {
    /// File whose location anchors relative specifiers
    pub file: FileId,
    pub locals: NameTable,
    pub imports: HashMap<String, ImportBinding>,
    pub exports: HashMap<String, ExportTarget>,
    pub star_exports: Vec<String>,
    pub export_assignment: Option<Vec<String>>,
    /// Ambient contexts without an explicit export list export every declaration
    pub exports_everything: bool,
}

impl ModuleScope {
    fn new(file: FileId) -> Self {
        Self {
            file,
            locals: NameTable::new(),
            imports: HashMap::new(),
            exports: HashMap::new(),
            star_exports: Vec::new(),
            export_assignment: None,
            exports_everything: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Bindings {
    pub symbols: Vec<Symbol>,
    pub members: HashMap<SymbolId, NameTable>,
    pub globals: NameTable,
    /// `export as namespace X` makes a module reachable from global scope
    pub umd_globals: HashMap<String, ModuleId>,
    pub modules: Vec<ModuleScope>,
    pub file_modules: Vec<Option<ModuleId>>,
    pub ambient_modules: HashMap<String, ModuleId>,
    pub namespace_nodes: HashMap<(FileId, usize), SymbolId>,
    pub ambient_nodes: HashMap<(FileId, usize), ModuleId>,
}

impl Bindings {
    pub fn module(&self, id: ModuleId) -> &ModuleScope {
        &self.modules[id.index()]
    }

    pub fn members_of(&self, symbol: SymbolId) -> Option<&NameTable> {
        self.members.get(&symbol)
    }
}

#[derive(Debug, Clone, Copy)]
enum Container {
    Global,
    Module(ModuleId),
    Namespace(SymbolId),
}

pub(crate) struct Binder {
    bindings: Bindings,
}

impl Binder {
    pub fn bind(files: &[ParsedFile]) -> Bindings {
        let mut binder = Binder {
            bindings: Bindings::default(),
        };
        for (index, parsed) in files.iter().enumerate() {
            binder.bind_file(FileId(index as u32), parsed);
        }
        binder.bindings
    }

    fn bind_file(&mut self, file: FileId, parsed: &ParsedFile) {
        let root = parsed.tree.root_node();
        let mut cursor = root.walk();
        let is_module = root
            .named_children(&mut cursor)
            .any(|child| matches!(child.kind(), "import_statement" | "export_statement"));

        let container = if is_module {
            let module = self.new_module(file);
            let scope = &mut self.bindings.modules[module.index()];
            scope.exports_everything =
                is_declaration_file(parsed) && !has_explicit_export_list(root);
            self.bindings.file_modules.push(Some(module));
            Container::Module(module)
        } else {
            self.bindings.file_modules.push(None);
            Container::Global
        };

        let context = FileContext {
            file,
            source: parsed.source_bytes(),
        };
        self.bind_statements(&context, root, container);
    }

    fn new_module(&mut self, file: FileId) -> ModuleId {
        let id = ModuleId(self.bindings.modules.len() as u32);
        self.bindings.modules.push(ModuleScope::new(file));
        id
    }

    fn bind_statements(&mut self, cx: &FileContext<'_>, parent: TSNode<'_>, container: Container) {
        let mut cursor = parent.walk();
        let children: Vec<_> = parent.named_children(&mut cursor).collect();
        for child in children {
            self.bind_statement(cx, child, container, false);
        }
    }

    fn bind_statement(
        &mut self,
        cx: &FileContext<'_>,
        node: TSNode<'_>,
        container: Container,
        exported: bool,
    ) {
        match node.kind() {
            "export_statement" => self.bind_export(cx, node, container),
            "import_statement" => self.bind_import(cx, node, container),
            "import_alias" => self.bind_import_alias(cx, node, container),
            "ambient_declaration" => {
                if has_token(&node, "global") {
                    if let Some(block) = find_child_by_kind(&node, "statement_block") {
                        self.bind_statements(cx, block, Container::Global);
                    }
                    return;
                }
                let mut cursor = node.walk();
                let children: Vec<_> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.bind_statement(cx, child, container, exported);
                }
            }
            // `namespace X {}` at statement level parses as an expression
            "expression_statement" => {
                let mut cursor = node.walk();
                let children: Vec<_> = node.named_children(&mut cursor).collect();
                for child in children {
                    if matches!(child.kind(), "internal_module" | "module") {
                        self.bind_namespace(cx, child, container, exported);
                    }
                }
            }
            "interface_declaration"
            | "type_alias_declaration"
            | "class_declaration"
            | "abstract_class_declaration"
            | "enum_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let name = extract_text(&name, cx.source).to_string();
                    self.declare(cx, container, &name, node, exported);
                }
            }
            "internal_module" | "module" => self.bind_namespace(cx, node, container, exported),
            _ => {}
        }
    }

    fn bind_namespace(
        &mut self,
        cx: &FileContext<'_>,
        node: TSNode<'_>,
        container: Container,
        exported: bool,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let body = node.child_by_field_name("body");

        if name_node.kind() == "string" {
            let name = string_literal_value(&name_node, cx.source).to_string();
            let module = match self.bindings.ambient_modules.get(&name) {
                Some(existing) => *existing,
                None => {
                    let created = self.new_module(cx.file);
                    self.bindings.ambient_modules.insert(name, created);
                    created
                }
            };
            self.bindings.ambient_nodes.insert((cx.file, node.id()), module);
            match body {
                Some(body) => {
                    if !contains_export_statement(body) {
                        self.bindings.modules[module.index()].exports_everything = true;
                    }
                    self.bind_statements(cx, body, Container::Module(module));
                }
                // `declare module "x";` exports anything
                None => self.bindings.modules[module.index()].exports_everything = true,
            }
            return;
        }

        let mut current = container;
        let mut exported = exported;
        let mut innermost = None;
        for part in split_qualified(extract_text(&name_node, cx.source)) {
            let id = self.declare(cx, current, &part, node, exported);
            self.bindings.members.entry(id).or_default();
            current = Container::Namespace(id);
            exported = true;
            innermost = Some(id);
        }

        if let Some(id) = innermost {
            self.bindings.namespace_nodes.insert((cx.file, node.id()), id);
            if let Some(body) = body {
                self.bind_statements(cx, body, Container::Namespace(id));
            }
        }
    }

    fn bind_export(&mut self, cx: &FileContext<'_>, node: TSNode<'_>, container: Container) {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            match container {
                Container::Module(module) if has_token(&node, "default") => {
                    self.bind_default_declaration(cx, declaration, module)
                }
                _ => self.bind_statement(cx, declaration, container, true),
            }
            return;
        }

        let Container::Module(module) = container else {
            return;
        };
        let source = node
            .child_by_field_name("source")
            .map(|source| string_literal_value(&source, cx.source).to_string());

        if has_token(&node, "=") {
            let mut cursor = node.walk();
            let target = node
                .named_children(&mut cursor)
                .find(|child| {
                    matches!(
                        child.kind(),
                        "identifier" | "nested_identifier" | "member_expression"
                    )
                })
                .map(|target| split_qualified(extract_text(&target, cx.source)));
            self.bindings.modules[module.index()].export_assignment = target;
            return;
        }

        if has_token(&node, "namespace") {
            if let Some(name) = find_child_by_kind(&node, "identifier") {
                let name = extract_text(&name, cx.source).to_string();
                self.bindings.umd_globals.insert(name, module);
            }
            return;
        }

        if let Some(clause) = find_child_by_kind(&node, "export_clause") {
            let mut cursor = clause.walk();
            for specifier in clause.named_children(&mut cursor) {
                if specifier.kind() != "export_specifier" {
                    continue;
                }
                let Some(name) = specifier.child_by_field_name("name") else {
                    continue;
                };
                let name = extract_text(&name, cx.source).to_string();
                let exported_as = specifier
                    .child_by_field_name("alias")
                    .map(|alias| extract_text(&alias, cx.source).to_string())
                    .unwrap_or_else(|| name.clone());
                let target = match &source {
                    Some(specifier) => ExportTarget::ReExport {
                        specifier: specifier.clone(),
                        name,
                    },
                    None => ExportTarget::Local(name),
                };
                self.bindings.modules[module.index()]
                    .exports
                    .insert(exported_as, target);
            }
            return;
        }

        if let Some(namespace_export) = find_child_by_kind(&node, "namespace_export") {
            if let (Some(specifier), Some(name)) =
                (source, find_child_by_kind(&namespace_export, "identifier"))
            {
                let name = extract_text(&name, cx.source).to_string();
                self.bindings.modules[module.index()]
                    .exports
                    .insert(name, ExportTarget::Namespace { specifier });
            }
            return;
        }

        if has_token(&node, "*") {
            if let Some(specifier) = source {
                self.bindings.modules[module.index()].star_exports.push(specifier);
            }
            return;
        }

        if has_token(&node, "default") {
            self.bind_default_export(cx, node, module);
        }
    }

    fn bind_default_export(&mut self, cx: &FileContext<'_>, node: TSNode<'_>, module: ModuleId) {
        let Some(value) = node.child_by_field_name("value") else {
            return;
        };
        if value.kind() == "identifier" {
            let local = extract_text(&value, cx.source).to_string();
            self.bindings.modules[module.index()]
                .exports
                .insert("default".to_string(), ExportTarget::Local(local));
        }
    }

    /// `export default interface Foo {}`: a module-local `Foo` exported as `default`
    fn bind_default_declaration(
        &mut self,
        cx: &FileContext<'_>,
        declaration: TSNode<'_>,
        module: ModuleId,
    ) {
        self.bind_statement(cx, declaration, Container::Module(module), false);
        if let Some(name) = declaration.child_by_field_name("name") {
            let local = extract_text(&name, cx.source).to_string();
            self.bindings.modules[module.index()]
                .exports
                .insert("default".to_string(), ExportTarget::Local(local));
        }
    }

    fn bind_import(&mut self, cx: &FileContext<'_>, node: TSNode<'_>, container: Container) {
        let Container::Module(module) = container else {
            return;
        };

        if let Some(require) = find_child_by_kind(&node, "import_require_clause") {
            let source = require
                .child_by_field_name("source")
                .or_else(|| find_child_by_kind(&require, "string"));
            if let (Some(name), Some(source)) = (find_child_by_kind(&require, "identifier"), source) {
                let name = extract_text(&name, cx.source).to_string();
                let specifier = string_literal_value(&source, cx.source).to_string();
                self.import(module, name, ImportBinding::Namespace { specifier });
            }
            return;
        }

        let (Some(source), Some(clause)) = (
            node.child_by_field_name("source"),
            find_child_by_kind(&node, "import_clause"),
        ) else {
            return;
        };
        let specifier = string_literal_value(&source, cx.source).to_string();

        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => {
                    let name = extract_text(&child, cx.source).to_string();
                    let binding = ImportBinding::Default {
                        specifier: specifier.clone(),
                    };
                    self.import(module, name, binding);
                }
                "namespace_import" => {
                    if let Some(name) = find_child_by_kind(&child, "identifier") {
                        let name = extract_text(&name, cx.source).to_string();
                        let binding = ImportBinding::Namespace {
                            specifier: specifier.clone(),
                        };
                        self.import(module, name, binding);
                    }
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for import in child.named_children(&mut inner) {
                        if import.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = import.child_by_field_name("name") else {
                            continue;
                        };
                        let name = extract_text(&name, cx.source).to_string();
                        let local = import
                            .child_by_field_name("alias")
                            .map(|alias| extract_text(&alias, cx.source).to_string())
                            .unwrap_or_else(|| name.clone());
                        let binding = ImportBinding::Named {
                            specifier: specifier.clone(),
                            name,
                        };
                        self.import(module, local, binding);
                    }
                }
                _ => {}
            }
        }
    }

    fn bind_import_alias(&mut self, cx: &FileContext<'_>, node: TSNode<'_>, container: Container) {
        let Container::Module(module) = container else {
            return;
        };
        let mut cursor = node.walk();
        let mut names = node
            .named_children(&mut cursor)
            .filter(|child| matches!(child.kind(), "identifier" | "nested_identifier"));
        let (Some(local), Some(target)) = (names.next(), names.next()) else {
            return;
        };
        let local = extract_text(&local, cx.source).to_string();
        let path = split_qualified(extract_text(&target, cx.source));
        self.import(module, local, ImportBinding::Entity { path });
    }

    fn import(&mut self, module: ModuleId, local: String, binding: ImportBinding) {
        self.bindings.modules[module.index()]
            .imports
            .insert(local, binding);
    }

    /// Add a declaration site, merging with an existing same-named symbol
    fn declare(
        &mut self,
        cx: &FileContext<'_>,
        container: Container,
        name: &str,
        node: TSNode<'_>,
        exported: bool,
    ) -> SymbolId {
        let declaration = Declaration {
            file: cx.file,
            line: node.start_position().row + 1,
        };

        let existing = self.table(container).and_then(|table| table.get(name).copied());
        let id = match existing {
            Some(id) => {
                self.bindings.symbols[id.index()].declarations.push(declaration);
                id
            }
            None => {
                let id = SymbolId(self.bindings.symbols.len() as u32);
                let mut symbol = Symbol::direct(name);
                symbol.declarations.push(declaration);
                self.bindings.symbols.push(symbol);
                self.table_mut(container).insert(name.to_string(), id);
                id
            }
        };

        if let (true, Container::Module(module)) = (exported, container) {
            self.bindings.modules[module.index()]
                .exports
                .insert(name.to_string(), ExportTarget::Local(name.to_string()));
        }
        id
    }

    fn table(&self, container: Container) -> Option<&NameTable> {
        match container {
            Container::Global => Some(&self.bindings.globals),
            Container::Module(module) => Some(&self.bindings.modules[module.index()].locals),
            Container::Namespace(symbol) => self.bindings.members.get(&symbol),
        }
    }

    fn table_mut(&mut self, container: Container) -> &mut NameTable {
        match container {
            Container::Global => &mut self.bindings.globals,
            Container::Module(module) => &mut self.bindings.modules[module.index()].locals,
            Container::Namespace(symbol) => self.bindings.members.entry(symbol).or_default(),
        }
    }
}

struct FileContext<'a> {
    file: FileId,
    source: &'a [u8],
}

fn is_declaration_file(parsed: &ParsedFile) -> bool {
    parsed
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            [".d.ts", ".d.mts", ".d.cts"]
                .iter()
                .any(|suffix| name.ends_with(suffix))
        })
}

fn contains_export_statement(body: TSNode<'_>) -> bool {
    let mut cursor = body.walk();
    let found = body
        .named_children(&mut cursor)
        .any(|child| child.kind() == "export_statement");
    found
}

/// `export { a }`, `export {}` or `export =` at the top of a module
fn has_explicit_export_list(root: TSNode<'_>) -> bool {
    let mut cursor = root.walk();
    let found = root.named_children(&mut cursor).any(|child| {
        child.kind() == "export_statement"
            && child.child_by_field_name("source").is_none()
            && (find_child_by_kind(&child, "export_clause").is_some() || has_token(&child, "="))
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::typescript::TypeScriptParser;
    use std::path::Path;

    fn bind(sources: &[(&str, &str)]) -> (Vec<ParsedFile>, Bindings) {
        let parser = TypeScriptParser::new().unwrap();
        let files: Vec<_> = sources
            .iter()
            .map(|(path, code)| parser.parse_source(Path::new(path), code.to_string()).unwrap())
            .collect();
        let bindings = Binder::bind(&files);
        (files, bindings)
    }

    #[test]
    fn script_declarations_merge_in_global_scope() {
        let (_, bindings) = bind(&[
            ("/t/a/index.d.ts", "interface Window { a: string }"),
            ("/t/b/index.d.ts", "interface Window { b: string }"),
        ]);
        let window = bindings.globals["Window"];
        let declarations = &bindings.symbols[window.index()].declarations;
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].file, FileId(0));
        assert_eq!(declarations[1].file, FileId(1));
    }

    #[test]
    fn module_files_keep_declarations_local() {
        let (_, bindings) = bind(&[(
            "/t/a/index.d.ts",
            "export interface Shown {}\ninterface Hidden {}\nexport {};",
        )]);
        assert!(bindings.globals.is_empty());
        let module = bindings.file_modules[0].unwrap();
        let scope = bindings.module(module);
        assert!(scope.locals.contains_key("Shown"));
        assert!(scope.locals.contains_key("Hidden"));
        assert!(scope.exports.contains_key("Shown"));
        assert!(!scope.exports_everything);
    }

    #[test]
    fn namespaces_collect_members() {
        let (_, bindings) = bind(&[(
            "/t/a/index.d.ts",
            "declare namespace Outer { interface Inner {} }",
        )]);
        let outer = bindings.globals["Outer"];
        assert!(bindings.members_of(outer).unwrap().contains_key("Inner"));
    }

    #[test]
    fn imports_and_export_assignment_are_recorded() {
        let (_, bindings) = bind(&[(
            "/t/a/index.d.ts",
            "import { Box as B } from \"b\";\nimport * as ns from \"c\";\ndeclare namespace A {}\nexport = A;\nexport as namespace Lib;",
        )]);
        let module = bindings.file_modules[0].unwrap();
        let scope = bindings.module(module);
        assert_eq!(
            scope.imports["B"],
            ImportBinding::Named {
                specifier: "b".to_string(),
                name: "Box".to_string()
            }
        );
        assert_eq!(
            scope.imports["ns"],
            ImportBinding::Namespace {
                specifier: "c".to_string()
            }
        );
        assert_eq!(scope.export_assignment, Some(vec!["A".to_string()]));
        assert_eq!(bindings.umd_globals["Lib"], module);
    }

    #[test]
    fn ambient_module_bodies_export_everything() {
        let (_, bindings) = bind(&[(
            "/t/a/index.d.ts",
            "declare module \"lib\" { interface Thing {} }",
        )]);
        let module = bindings.ambient_modules["lib"];
        let scope = bindings.module(module);
        assert!(scope.exports_everything);
        assert!(scope.locals.contains_key("Thing"));
    }

    #[test]
    fn default_exported_declarations_bind_under_default() {
        let (_, bindings) = bind(&[(
            "/t/a/index.d.ts",
            "export default interface Foo { x: number }
export interface Named {}",
        )]);
        let module = bindings.file_modules[0].unwrap();
        let scope = bindings.module(module);
        assert!(scope.locals.contains_key("Foo"));
        assert_eq!(
            scope.exports.get("default"),
            Some(&ExportTarget::Local("Foo".to_string()))
        );
        assert!(!scope.exports.contains_key("Foo"));
        assert!(scope.exports.contains_key("Named"));
    }
}
