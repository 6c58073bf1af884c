use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use super::{Diagnostic, Severity};
use crate::parsers::ParserFactory;

const MAX_EXTENDS_DEPTH: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed configuration {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("configuration {} matched no input files", path.display())]
    NoInputs { path: PathBuf },
    #[error(
        "configuration {} has an `extends` chain deeper than {}",
        path.display(),
        MAX_EXTENDS_DEPTH
    )]
    ExtendsTooDeep { path: PathBuf },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    extends: Option<String>,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    #[serde(default)]
    compiler_options: RawCompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    base_url: Option<String>,
    type_roots: Option<Vec<String>>,
    types: Option<Vec<String>>,
    paths: Option<BTreeMap<String, Vec<String>>>,
}

/// One `paths` entry, e.g. `"react": ["react/v16"]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub pattern: String,
    pub targets: Vec<String>,
}

impl PathMapping {
    /// Substitutions for `specifier`, or `None` when the pattern does not apply
    pub fn apply(&self, specifier: &str) -> Option<Vec<String>> {
        let captured = match self.pattern.split_once('*') {
            None if self.pattern == specifier => "",
            None => return None,
            Some((prefix, suffix)) => {
                if specifier.len() < prefix.len() + suffix.len()
                    || !specifier.starts_with(prefix)
                    || !specifier.ends_with(suffix)
                {
                    return None;
                }
                &specifier[prefix.len()..specifier.len() - suffix.len()]
            }
        };
        Some(
            self.targets
                .iter()
                .map(|target| target.replacen('*', captured, 1))
                .collect(),
        )
    }
}

/// A configuration with every path made absolute
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    pub config_path: PathBuf,
    pub root_files: Vec<PathBuf>,
    pub type_roots: Vec<PathBuf>,
    pub types: Vec<String>,
    pub base_url: Option<PathBuf>,
    pub paths: Vec<PathMapping>,
}

/// Settings collected along an `extends` chain; the nearest layer wins
#[derive(Debug, Default)]
struct Layer {
    files: Option<Vec<PathBuf>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    base_url: Option<PathBuf>,
    type_roots: Option<Vec<PathBuf>>,
    types: Option<Vec<String>>,
    paths: Option<Vec<PathMapping>>,
}

impl Layer {
    fn or(self, parent: Layer) -> Layer {
        Layer {
            files: self.files.or(parent.files),
            include: self.include.or(parent.include),
            exclude: self.exclude.or(parent.exclude),
            base_url: self.base_url.or(parent.base_url),
            type_roots: self.type_roots.or(parent.type_roots),
            types: self.types.or(parent.types),
            paths: self.paths.or(parent.paths),
        }
    }
}

/// Load a `tsconfig.json`, reporting problems through `on_diagnostic`.
///
/// Unrecoverable problems are reported and then returned as errors; missing
/// listed files are reported and skipped.
pub fn load_config(
    config_path: &Path,
    on_diagnostic: &mut dyn FnMut(&Diagnostic),
) -> Result<ParsedConfig, ConfigError> {
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let layer = read_layer(config_path, 0, on_diagnostic)?;

    let exclude = compile_excludes(&config_dir, layer.exclude.as_deref(), on_diagnostic);
    let mut root_files = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |path: PathBuf, root_files: &mut Vec<PathBuf>| {
        let path = path.canonicalize().unwrap_or(path);
        if seen.insert(path.clone()) {
            root_files.push(path);
        }
    };

    if let Some(files) = &layer.files {
        for file in files {
            if file.is_file() {
                push(file.clone(), &mut root_files);
            } else {
                on_diagnostic(&Diagnostic {
                    severity: Severity::Recoverable,
                    file: config_path.to_path_buf(),
                    message: format!("file '{}' not found", file.display()),
                });
            }
        }
    }

    let include = match (&layer.include, &layer.files) {
        (Some(include), _) => Some(include.clone()),
        (None, None) => Some(vec![config_dir.to_string_lossy().into_owned()]),
        (None, Some(_)) => None,
    };
    for path in expand_includes(include.as_deref().unwrap_or_default(), on_diagnostic, config_path)
    {
        if !exclude.iter().any(|pattern| pattern.matches_path(&path)) {
            push(path, &mut root_files);
        }
    }

    if root_files.is_empty() {
        on_diagnostic(&Diagnostic {
            severity: Severity::Unrecoverable,
            file: config_path.to_path_buf(),
            message: "no inputs were found in config file".to_string(),
        });
        return Err(ConfigError::NoInputs {
            path: config_path.to_path_buf(),
        });
    }

    let type_roots = layer.type_roots.unwrap_or_else(|| {
        config_dir
            .parent()
            .map(|parent| vec![parent.to_path_buf()])
            .unwrap_or_default()
    });

    Ok(ParsedConfig {
        config_path: config_path.to_path_buf(),
        root_files,
        type_roots,
        types: layer.types.unwrap_or_default(),
        base_url: layer.base_url,
        paths: layer.paths.unwrap_or_default(),
    })
}

fn read_layer(
    config_path: &Path,
    depth: usize,
    on_diagnostic: &mut dyn FnMut(&Diagnostic),
) -> Result<Layer, ConfigError> {
    if depth > MAX_EXTENDS_DEPTH {
        on_diagnostic(&unrecoverable(config_path, "`extends` chain is too deep"));
        return Err(ConfigError::ExtendsTooDeep {
            path: config_path.to_path_buf(),
        });
    }

    let text = match fs::read_to_string(config_path) {
        Ok(text) => text,
        Err(source) => {
            on_diagnostic(&unrecoverable(
                config_path,
                &format!("cannot read file: {source}"),
            ));
            return Err(ConfigError::Unreadable {
                path: config_path.to_path_buf(),
                source,
            });
        }
    };

    let raw: RawConfig = match serde_json::from_str(&strip_json_comments(&text)) {
        Ok(raw) => raw,
        Err(source) => {
            on_diagnostic(&unrecoverable(
                config_path,
                &format!("failed to parse file: {source}"),
            ));
            return Err(ConfigError::Malformed {
                path: config_path.to_path_buf(),
                source,
            });
        }
    };

    let dir = config_path.parent().unwrap_or_else(|| Path::new(""));
    let options = raw.compiler_options;
    let layer = Layer {
        files: raw
            .files
            .map(|files| files.iter().map(|file| dir.join(file)).collect()),
        include: raw.include.map(|patterns| {
            patterns
                .iter()
                .map(|pattern| dir.join(pattern).to_string_lossy().into_owned())
                .collect()
        }),
        exclude: raw.exclude.map(|patterns| {
            patterns
                .iter()
                .map(|pattern| dir.join(pattern).to_string_lossy().into_owned())
                .collect()
        }),
        base_url: options.base_url.map(|base| dir.join(base)),
        type_roots: options
            .type_roots
            .map(|roots| roots.iter().map(|root| dir.join(root)).collect()),
        types: options.types,
        paths: options.paths.map(|paths| {
            paths
                .into_iter()
                .map(|(pattern, targets)| PathMapping { pattern, targets })
                .collect()
        }),
    };

    let Some(extends) = raw.extends else {
        return Ok(layer);
    };
    if !(extends.starts_with('.') || Path::new(&extends).is_absolute()) {
        on_diagnostic(&Diagnostic {
            severity: Severity::Recoverable,
            file: config_path.to_path_buf(),
            message: format!("ignoring package-style `extends` '{extends}'"),
        });
        return Ok(layer);
    }
    let mut parent_path = dir.join(&extends);
    if parent_path.extension().is_none() {
        parent_path.set_extension("json");
    }
    let parent = read_layer(&parent_path, depth + 1, on_diagnostic)?;
    Ok(layer.or(parent))
}

fn unrecoverable(config_path: &Path, message: &str) -> Diagnostic {
    Diagnostic {
        severity: Severity::Unrecoverable,
        file: config_path.to_path_buf(),
        message: message.to_string(),
    }
}

fn compile_excludes(
    config_dir: &Path,
    exclude: Option<&[String]>,
    on_diagnostic: &mut dyn FnMut(&Diagnostic),
) -> Vec<glob::Pattern> {
    let default_exclude = [config_dir
        .join("node_modules")
        .join("**")
        .to_string_lossy()
        .into_owned()];
    exclude
        .unwrap_or(&default_exclude)
        .iter()
        .map(|pattern| {
            if pattern.contains(['*', '?', '[']) {
                pattern.clone()
            } else {
                format!("{}/**", pattern.trim_end_matches('/'))
            }
        })
        .filter_map(|pattern| match glob::Pattern::new(&pattern) {
            Ok(compiled) => Some(compiled),
            Err(err) => {
                on_diagnostic(&Diagnostic {
                    severity: Severity::Recoverable,
                    file: config_dir.to_path_buf(),
                    message: format!("invalid exclude pattern '{pattern}': {err}"),
                });
                None
            }
        })
        .collect()
}

fn expand_includes(
    patterns: &[String],
    on_diagnostic: &mut dyn FnMut(&Diagnostic),
    config_path: &Path,
) -> Vec<PathBuf> {
    let factory = ParserFactory::new();
    let mut files = Vec::new();

    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) && Path::new(pattern).is_dir() {
            // A bare directory includes everything below it
            files.extend(
                WalkDir::new(pattern)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_file())
                    .map(|entry| entry.into_path()),
            );
            continue;
        }

        match glob::glob(pattern) {
            Ok(paths) => files.extend(paths.filter_map(|path| path.ok())),
            Err(err) => on_diagnostic(&Diagnostic {
                severity: Severity::Recoverable,
                file: config_path.to_path_buf(),
                message: format!("invalid include pattern '{pattern}': {err}"),
            }),
        }
    }

    files.retain(|path| path.is_file() && factory.is_supported(path));
    files
}

/// Drop `//` and `/* */` comments and trailing commas, leaving string contents alone
fn strip_json_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
            }
            '}' | ']' => {
                let trimmed_len = out.trim_end().len();
                if out[..trimmed_len].ends_with(',') {
                    out.truncate(trimmed_len - 1);
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
