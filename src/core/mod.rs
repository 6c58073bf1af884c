pub mod analyzer;
pub mod graph;
pub mod package;
pub mod resolver;
pub mod scanner;
pub mod walker;

pub use analyzer::{AnalyzerOptions, DependencyAnalyzer, PackageError, PackageOutcome, RunStats};
pub use graph::{DependencyRecorder, Edge, RunResult};
pub use package::{Package, PackageNameResolver};
pub use resolver::{canonical_symbol, ResolvedDependency, SymbolCanonicalizer};
pub use scanner::PackageScanner;
pub use walker::{walk_type_references, TypeReferenceNode, TypeReferenceVisitor};
