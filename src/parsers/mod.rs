pub mod common;
pub mod typescript;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tree_sitter::Tree;

use self::typescript::{Dialect, TypeScriptParser};

/// A source file together with its syntax tree
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
}

impl ParsedFile {
    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }
}

pub trait LanguageParser {
    fn parse_file(&self, file_path: &Path) -> Result<ParsedFile>;
    fn language_name(&self) -> &str;
}

pub struct ParserFactory;

impl ParserFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn get_parser(&self, file_path: &Path) -> Box<dyn LanguageParser + Send + Sync> {
        Box::new(TypeScriptParser::with_dialect(Dialect::for_path(file_path)))
    }

    /// Whether the path names a source file the parsers understand
    pub fn is_supported(&self, file_path: &Path) -> bool {
        matches!(
            file_path.extension().and_then(|ext| ext.to_str()),
            Some("ts") | Some("tsx") | Some("mts") | Some("cts")
        )
    }
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}
