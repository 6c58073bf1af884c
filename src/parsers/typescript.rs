use anyhow::Result;
use std::path::Path;
use tree_sitter::Language;

use super::common::TreeSitterParser;
use super::{LanguageParser, ParsedFile};

/// Grammar flavour; `.tsx` sources need the JSX-aware grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
}

impl Dialect {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("tsx") => Dialect::Tsx,
            _ => Dialect::TypeScript,
        }
    }

    fn language(self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::language_typescript(),
            Dialect::Tsx => tree_sitter_typescript::language_tsx(),
        }
    }
}

pub struct TypeScriptParser {
    dialect: Dialect,
}

impl TypeScriptParser {
    pub fn new() -> Result<Self> {
        Ok(Self::with_dialect(Dialect::TypeScript))
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Parse in-memory source, used by tests and by `parse_file`
    pub fn parse_source(&self, file_path: &Path, source: String) -> Result<ParsedFile> {
        let mut parser = TreeSitterParser::new(self.dialect.language())?;
        let tree = parser.parse_source(&source, file_path)?;
        Ok(ParsedFile {
            path: file_path.to_path_buf(),
            source,
            tree,
        })
    }
}

impl LanguageParser for TypeScriptParser {
    fn parse_file(&self, file_path: &Path) -> Result<ParsedFile> {
        // tree_sitter::Parser is not Sync, so each call gets its own
        let parser = TreeSitterParser::new(self.dialect.language())?;
        let source = parser.get_source(file_path)?;
        self.parse_source(file_path, source)
    }

    fn language_name(&self) -> &str {
        match self.dialect {
            Dialect::TypeScript => "typescript",
            Dialect::Tsx => "tsx",
        }
    }
}
