//! Semantic analysis engine.
//!
//! The dependency extraction in [`crate::core`] only talks to the traits in
//! this module. [`TypeScriptEngine`] is the bundled implementation: a binder
//! over tree-sitter syntax that resolves type references to declaring
//! symbols without performing full type checking.

pub mod binder;
pub mod checker;
pub mod config;
pub mod program;

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::walker::TypeReferenceNode;
use crate::parsers::ParsedFile;

pub use config::{ConfigError, ParsedConfig};
pub use program::{Program, TypeScriptEngine};

/// Index of a source file inside one compiled model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a symbol is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub file: FileId,
    pub line: usize,
}

/// A symbol either stands on its own or points at the symbol it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLink {
    Direct,
    Aliasing(SymbolId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub declarations: Vec<Declaration>,
    pub link: SymbolLink,
}

impl Symbol {
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
            link: SymbolLink::Direct,
        }
    }
}

/// The type denoted by a type annotation
#[derive(Debug, Clone)]
pub struct Type<'m> {
    pub symbol: Option<Cow<'m, Symbol>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Unrecoverable,
}

/// A configuration problem reported while loading a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: PathBuf,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

pub trait SymbolTable {
    fn symbol(&self, id: SymbolId) -> &Symbol;
}

/// A set of source files compiled together plus their resolver
pub trait CompiledModel: SymbolTable {
    /// All files of the program, indexed by [`FileId`]
    fn source_files(&self) -> &[ParsedFile];

    fn file_path(&self, file: FileId) -> &Path {
        &self.source_files()[file.index()].path
    }

    fn type_from_type_node(
        &self,
        file: FileId,
        reference: &TypeReferenceNode<'_>,
    ) -> Option<Type<'_>>;
}

pub trait SemanticEngine {
    type Model: CompiledModel;

    /// Compile the program described by a configuration file.
    ///
    /// Problems found while reading the configuration are passed to
    /// `on_diagnostic` before any error is returned.
    fn compile(
        &self,
        config_path: &Path,
        on_diagnostic: &mut dyn FnMut(&Diagnostic),
    ) -> Result<Self::Model, ConfigError>;
}
