//! # typedeps
//!
//! Cross-package type dependency extraction for declaration repositories
//! laid out as `<root>/types/<package>/...`.
//!
//! Each package is compiled on its own from its `tsconfig.json`. Every type
//! reference in the package's own files is resolved to the declaration it
//! names, and each declaration living in a different package produces one
//! edge.
//!
//! ## Output
//!
//! One `from,to,type` line per edge. Packages that could not be analyzed are
//! reported separately by name.
//!
//! ```no_run
//! use std::path::Path;
//! use typedeps::core::{AnalyzerOptions, DependencyAnalyzer};
//!
//! let analyzer = DependencyAnalyzer::new(AnalyzerOptions::default().with_jobs(4));
//! let result = analyzer.analyze(Path::new("DefinitelyTyped"))?;
//! for edge in &result.edges {
//!     println!("{edge}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod core;
pub mod formatters;
pub mod parsers;
pub mod semantic;
