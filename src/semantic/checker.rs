use std::borrow::Cow;
use tree_sitter::Node as TSNode;

use super::binder::{ExportTarget, ImportBinding, ModuleId};
use super::program::Program;
use super::{CompiledModel, FileId, Symbol, SymbolId, SymbolLink, SymbolTable, Type};
use crate::core::walker::TypeReferenceNode;
use crate::parsers::common::{extract_text, find_child_by_kind};
use crate::parsers::ParsedFile;

/// Bound on import/export hops followed while resolving one name
const MAX_RESOLUTION_DEPTH: usize = 32;

/// What a name can denote while resolving a qualified reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Symbol(SymbolId),
    Module(ModuleId),
}

impl SymbolTable for Program {
    fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.bindings.symbols[id.index()]
    }
}

impl CompiledModel for Program {
    fn source_files(&self) -> &[ParsedFile] {
        &self.files
    }

    fn type_from_type_node(
        &self,
        file: FileId,
        reference: &TypeReferenceNode<'_>,
    ) -> Option<Type<'_>> {
        let source = self.files.get(file.index())?.source_bytes();
        let id = self.resolve_reference(file, reference)?;
        let symbol = self.symbol(id);

        let symbol = if reference.type_arguments().is_some() {
            // An instantiation has its own identity but points back at the generic
            Cow::Owned(Symbol {
                name: reference.display_text(source),
                declarations: symbol.declarations.clone(),
                link: SymbolLink::Aliasing(id),
            })
        } else {
            Cow::Borrowed(symbol)
        };
        Some(Type {
            symbol: Some(symbol),
        })
    }
}

impl Program {
    fn resolve_reference(
        &self,
        file: FileId,
        reference: &TypeReferenceNode<'_>,
    ) -> Option<SymbolId> {
        let source = self.files[file.index()].source_bytes();
        let parts = reference.name_parts(source);
        let (first, rest) = parts.split_first()?;

        if is_type_parameter_in_scope(reference.node(), first, source) {
            return None;
        }

        let mut entity = self.lookup_lexical(file, reference.node(), first)?;
        for part in rest {
            entity = self.member(entity, part, 0)?;
        }
        match entity {
            Entity::Symbol(id) => Some(id),
            Entity::Module(_) => None,
        }
    }

    /// Enclosing namespaces, then the module scope, then globals
    fn lookup_lexical(&self, file: FileId, node: TSNode<'_>, name: &str) -> Option<Entity> {
        let bindings = &self.bindings;
        let mut module = bindings.file_modules.get(file.index()).copied().flatten();

        let mut current = node.parent();
        while let Some(ancestor) = current {
            let key = (file, ancestor.id());
            if let Some(namespace) = bindings.namespace_nodes.get(&key) {
                if let Some(id) = bindings
                    .members_of(*namespace)
                    .and_then(|members| members.get(name))
                {
                    return Some(Entity::Symbol(*id));
                }
            }
            if let Some(ambient) = bindings.ambient_nodes.get(&key) {
                module = Some(*ambient);
                break;
            }
            current = ancestor.parent();
        }

        module
            .and_then(|module| self.lookup_in_module(module, name, 0))
            .or_else(|| self.lookup_global(name, 0))
    }

    fn lookup_in_module(&self, module: ModuleId, name: &str, depth: usize) -> Option<Entity> {
        if depth > MAX_RESOLUTION_DEPTH {
            return None;
        }
        let scope = self.bindings.module(module);
        if let Some(id) = scope.locals.get(name) {
            return Some(Entity::Symbol(*id));
        }
        let binding = scope.imports.get(name)?;
        self.resolve_import(module, binding, depth + 1)
    }

    fn lookup_global(&self, name: &str, depth: usize) -> Option<Entity> {
        if let Some(id) = self.bindings.globals.get(name) {
            return Some(Entity::Symbol(*id));
        }
        self.bindings
            .umd_globals
            .get(name)
            .map(|module| self.module_entity(*module, depth + 1))
    }

    fn resolve_import(
        &self,
        module: ModuleId,
        binding: &ImportBinding,
        depth: usize,
    ) -> Option<Entity> {
        if depth > MAX_RESOLUTION_DEPTH {
            return None;
        }
        match binding {
            ImportBinding::Named { specifier, name } => {
                let target = self.resolve_specifier(module, specifier)?;
                self.export_of(target, name, depth + 1)
            }
            ImportBinding::Namespace { specifier } => {
                let target = self.resolve_specifier(module, specifier)?;
                Some(self.module_entity(target, depth + 1))
            }
            ImportBinding::Default { specifier } => {
                let target = self.resolve_specifier(module, specifier)?;
                self.export_of(target, "default", depth + 1).or_else(|| {
                    let scope = self.bindings.module(target);
                    scope.export_assignment.as_ref()?;
                    Some(self.module_entity(target, depth + 1))
                })
            }
            ImportBinding::Entity { path } => self.resolve_path_in_module(module, path, depth + 1),
        }
    }

    /// The module itself, or what it assigned with `export =`
    fn module_entity(&self, module: ModuleId, depth: usize) -> Entity {
        self.bindings
            .module(module)
            .export_assignment
            .as_ref()
            .and_then(|path| self.resolve_path_in_module(module, path, depth + 1))
            .unwrap_or(Entity::Module(module))
    }

    fn resolve_path_in_module(
        &self,
        module: ModuleId,
        path: &[String],
        depth: usize,
    ) -> Option<Entity> {
        if depth > MAX_RESOLUTION_DEPTH {
            return None;
        }
        let (first, rest) = path.split_first()?;
        let mut entity = self
            .lookup_in_module(module, first, depth + 1)
            .or_else(|| self.lookup_global(first, depth + 1))?;
        for part in rest {
            entity = self.member(entity, part, depth + 1)?;
        }
        Some(entity)
    }

    fn resolve_specifier(&self, module: ModuleId, specifier: &str) -> Option<ModuleId> {
        if let Some(ambient) = self.bindings.ambient_modules.get(specifier) {
            return Some(*ambient);
        }
        let file = self.bindings.module(module).file;
        let target = self.resolved_modules.get(file.index())?.get(specifier)?;
        self.bindings.file_modules.get(target.index()).copied().flatten()
    }

    fn export_of(&self, module: ModuleId, name: &str, depth: usize) -> Option<Entity> {
        if depth > MAX_RESOLUTION_DEPTH {
            log::debug!("giving up on export '{name}' after {depth} hops");
            return None;
        }
        let scope = self.bindings.module(module);

        if let Some(path) = &scope.export_assignment {
            let target = self.resolve_path_in_module(module, path, depth + 1)?;
            return self.member(target, name, depth + 1);
        }

        if let Some(target) = scope.exports.get(name) {
            return match target {
                ExportTarget::Local(local) => self
                    .lookup_in_module(module, local, depth + 1)
                    .or_else(|| self.lookup_global(local, depth + 1)),
                ExportTarget::ReExport { specifier, name } => {
                    let target = self.resolve_specifier(module, specifier)?;
                    self.export_of(target, name, depth + 1)
                }
                ExportTarget::Namespace { specifier } => {
                    let target = self.resolve_specifier(module, specifier)?;
                    Some(self.module_entity(target, depth + 1))
                }
            };
        }

        if scope.exports_everything {
            if let Some(id) = scope.locals.get(name) {
                return Some(Entity::Symbol(*id));
            }
        }

        scope.star_exports.iter().find_map(|specifier| {
            let target = self.resolve_specifier(module, specifier)?;
            self.export_of(target, name, depth + 1)
        })
    }

    fn member(&self, entity: Entity, name: &str, depth: usize) -> Option<Entity> {
        match entity {
            Entity::Symbol(id) => self
                .bindings
                .members_of(id)
                .and_then(|members| members.get(name))
                .map(|member| Entity::Symbol(*member)),
            Entity::Module(module) => self.export_of(module, name, depth + 1),
        }
    }
}

/// Type parameters, mapped-type keys and `infer` names shadow every other binding
fn is_type_parameter_in_scope(node: TSNode<'_>, name: &str, source: &[u8]) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        let parameters = ancestor
            .child_by_field_name("type_parameters")
            .or_else(|| find_child_by_kind(&ancestor, "type_parameters"));
        if let Some(parameters) = parameters {
            let mut cursor = parameters.walk();
            let declared = parameters.named_children(&mut cursor).any(|parameter| {
                parameter
                    .child_by_field_name("name")
                    .is_some_and(|parameter_name| extract_text(&parameter_name, source) == name)
            });
            if declared {
                return true;
            }
        }

        if let Some(clause) = find_child_by_kind(&ancestor, "mapped_type_clause") {
            if clause
                .child_by_field_name("name")
                .is_some_and(|key| extract_text(&key, source) == name)
            {
                return true;
            }
        }

        if ancestor.kind() == "conditional_type" && declares_infer(ancestor, name, source) {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

fn declares_infer(conditional: TSNode<'_>, name: &str, source: &[u8]) -> bool {
    let mut stack = vec![conditional];
    while let Some(node) = stack.pop() {
        if node.kind() == "infer_type" {
            if let Some(declared) = find_child_by_kind(&node, "type_identifier") {
                if extract_text(&declared, source) == name {
                    return true;
                }
            }
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    false
}
