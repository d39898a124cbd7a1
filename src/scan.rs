//! Textual fact extraction for C sources
//!
//! Not a C parser: includes and `#define`s are read line by line, function and
//! type definitions are recognised by shape, and every other identifier
//! outside comments and string literals counts as a reference.

use crate::discovery::{find_c_files_in, relative_name};
use crate::error::{Error, Result};
use crate::facts::{
    DependencyMode, FactSource, FileFact, fingerprint_for_scan, load_cache, recount_dependencies,
    store_cache,
};
use rayon::prelude::*;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "define", "defined", "do",
    "double", "elif", "else", "endif", "enum", "error", "extern", "float", "for", "goto", "if",
    "ifdef", "ifndef", "include", "inline", "int", "long", "pragma", "register", "restrict",
    "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "undef",
    "union", "unsigned", "void", "volatile", "while",
];

struct Patterns {
    include: Regex,
    define: Regex,
    function_def: Regex,
    tagged_type: Regex,
    typedef_name: Regex,
    noise: Regex,
    identifier: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            include: Regex::new(r#"^\s*#\s*include\s+["<]([^">]+)[">]"#)?,
            define: Regex::new(r"^\s*#\s*define\s+([A-Za-z_]\w*)")?,
            function_def: Regex::new(
                r"(?m)^[A-Za-z_][\w \t\*]*?\b([A-Za-z_]\w*)\s*\([^;{}()]*(?:\([^;{}()]*\)[^;{}()]*)*\)\s*\{",
            )?,
            tagged_type: Regex::new(r"\b(?:struct|union|enum)\s+([A-Za-z_]\w*)\s*\{")?,
            typedef_name: Regex::new(
                r"\btypedef\b(?:[^;{}]|\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\})*?\b([A-Za-z_]\w*)\s*;",
            )?,
            noise: Regex::new(r#"(?s)/\*.*?\*/|//[^\n]*|"(?:\\.|[^"\\\n])*"|'(?:\\.|[^'\\\n])*'"#)?,
            identifier: Regex::new(r"\b[A-Za-z_]\w*\b")?,
        })
    }
}

/// Scans the C files under a set of directories of interest
pub struct CScanner {
    pub source_root: PathBuf,
    pub directories: Vec<String>,
    pub mode: DependencyMode,
    patterns: Patterns,
}

impl CScanner {
    pub fn new(source_root: impl Into<PathBuf>, directories: Vec<String>, mode: DependencyMode) -> Result<Self> {
        Ok(Self {
            source_root: source_root.into(),
            directories,
            mode,
            patterns: Patterns::new()?,
        })
    }

    /// Like [`FactSource::load_facts`], but reuses the facts cached at
    /// `cache` when the scanned files have not changed.
    pub fn load_facts_cached(&self, cache: &Path) -> Result<Vec<FileFact>> {
        let files = find_c_files_in(&self.source_root, &self.directories);
        let fingerprint = fingerprint_for_scan(&files, self.mode);
        if let Some(facts) = load_cache(cache, &fingerprint) {
            tracing::info!(files = facts.len(), cache = %cache.display(), "reusing cached facts");
            return Ok(facts);
        }
        let facts = self.scan_files(&files)?;
        store_cache(cache, &fingerprint, &facts)?;
        Ok(facts)
    }

    fn scan_files(&self, files: &[PathBuf]) -> Result<Vec<FileFact>> {
        let root = self
            .source_root
            .canonicalize()
            .map_err(|e| Error::io(&self.source_root, e))?;
        let mut facts = files
            .par_iter()
            .map(|path| self.scan_file(&root, path))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        facts.sort_by(|a, b| a.name.cmp(&b.name));
        recount_dependencies(&mut facts, self.mode);
        tracing::info!(files = facts.len(), mode = %self.mode, "scanned C sources");
        Ok(facts)
    }

    fn scan_file(&self, root: &Path, path: &Path) -> Result<Option<FileFact>> {
        let path = path.canonicalize().map_err(|e| Error::io(path, e))?;
        let Some(name) = relative_name(root, &path) else {
            tracing::warn!(path = %path.display(), "file outside source root skipped");
            return Ok(None);
        };
        let bytes = std::fs::read(&path).map_err(|e| Error::io(&path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        let parent = path.parent().unwrap_or(root);
        Ok(Some(self.scan_text(name, &text, root, parent)))
    }

    /// Facts for one file's contents. Includes resolve against `root` first,
    /// then against `parent`; unresolved ones are dropped.
    pub fn scan_text(&self, name: String, text: &str, root: &Path, parent: &Path) -> FileFact {
        let p = &self.patterns;
        let mut fact = FileFact::new(name);
        let mut body = String::with_capacity(text.len());

        for line in text.lines() {
            fact.lines += 1;
            if let Some(cap) = p.include.captures(line) {
                if let Some(target) = resolve_include(root, parent, &cap[1]) {
                    if target != fact.name {
                        fact.dependencies.insert(target, 0);
                    }
                }
                continue;
            }
            if let Some(cap) = p.define.captures(line) {
                fact.macro_definitions.insert(cap[1].to_string());
            }
            body.push_str(line);
            body.push('\n');
        }

        let code = p.noise.replace_all(&body, " ");
        for cap in p.function_def.captures_iter(&code) {
            let name = &cap[1];
            if !C_KEYWORDS.contains(&name) {
                fact.function_definitions.insert(name.to_string());
            }
        }
        for cap in p.tagged_type.captures_iter(&code) {
            fact.function_definitions.insert(cap[1].to_string());
        }
        for cap in p.typedef_name.captures_iter(&code) {
            fact.function_definitions.insert(cap[1].to_string());
        }

        let used: BTreeSet<&str> = p
            .identifier
            .find_iter(&code)
            .map(|m| m.as_str())
            .filter(|id| !C_KEYWORDS.contains(id))
            .collect();
        for id in used {
            if !fact.macro_definitions.contains(id) {
                fact.macro_references.insert(id.to_string());
            }
            if !fact.function_definitions.contains(id) {
                fact.function_references.insert(id.to_string());
            }
        }
        fact
    }
}

impl FactSource for CScanner {
    fn load_facts(&self) -> Result<Vec<FileFact>> {
        let files = find_c_files_in(&self.source_root, &self.directories);
        self.scan_files(&files)
    }
}

fn resolve_include(root: &Path, parent: &Path, include: &str) -> Option<String> {
    [root.join(include), parent.join(include)]
        .into_iter()
        .find(|candidate| candidate.exists())
        .filter(|candidate| candidate.is_file())
        .and_then(|candidate| candidate.canonicalize().ok())
        .and_then(|resolved| relative_name(root, &resolved))
}
