//! Per-file facts consumed by the clustering core
//!
//! A [`FileFact`] carries a file's identifier (path relative to the source
//! root), its line count, its raw directed dependency counts, and the symbol
//! sets those counts are derived from. [`recount_dependencies`] rebuilds the
//! counts under a [`DependencyMode`]. Facts come from a [`FactSource`]: a JSON
//! fact file ([`JsonFacts`]) or the textual C scanner in [`crate::scan`].
//! Scanned facts can be cached on disk with `bincode`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::UNIX_EPOCH;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFact {
    pub name: String,
    #[serde(default)]
    pub lines: usize,
    /// Other file identifier -> directed dependency count
    #[serde(default)]
    pub dependencies: BTreeMap<String, u64>,
    #[serde(default)]
    pub macro_definitions: BTreeSet<String>,
    #[serde(default)]
    pub function_definitions: BTreeSet<String>,
    /// Macros used here but defined elsewhere
    #[serde(default)]
    pub macro_references: BTreeSet<String>,
    /// Functions and types used here but defined elsewhere
    #[serde(default)]
    pub function_references: BTreeSet<String>,
}

impl FileFact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dependency(mut self, target: impl Into<String>, count: u64) -> Self {
        self.dependencies.insert(target.into(), count);
        self
    }

    #[must_use]
    pub const fn with_lines(mut self, lines: usize) -> Self {
        self.lines = lines;
        self
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }
}

/// Which symbol kinds count towards a dependency's weight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyMode {
    #[default]
    All,
    MacrosOnly,
    FunctionsOnly,
}

impl DependencyMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::MacrosOnly => "macros",
            Self::FunctionsOnly => "functions",
        }
    }

    /// Output sub-directory name for runs under this mode
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::All => "all_dependencies",
            Self::MacrosOnly => "macros_only",
            Self::FunctionsOnly => "functions_only",
        }
    }

    /// Resolve the pair of CLI flags into a mode.
    pub const fn from_flags(macros_only: bool, functions_only: bool) -> Result<Option<Self>> {
        match (macros_only, functions_only) {
            (true, true) => Err(Error::ConflictingDependencyModes),
            (true, false) => Ok(Some(Self::MacrosOnly)),
            (false, true) => Ok(Some(Self::FunctionsOnly)),
            (false, false) => Ok(None),
        }
    }

    const fn counts_macros(self) -> bool {
        matches!(self, Self::All | Self::MacrosOnly)
    }

    const fn counts_functions(self) -> bool {
        matches!(self, Self::All | Self::FunctionsOnly)
    }
}

impl FromStr for DependencyMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "macros" | "macros-only" => Ok(Self::MacrosOnly),
            "functions" | "functions-only" => Ok(Self::FunctionsOnly),
            other => Err(format!("unknown dependency mode '{other}'")),
        }
    }
}

impl fmt::Display for DependencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rebuild every dependency count from the symbol sets. Targets that are not
/// among `facts` keep their key with a zero count.
pub fn recount_dependencies(facts: &mut [FileFact], mode: DependencyMode) {
    let definitions: HashMap<String, (BTreeSet<String>, BTreeSet<String>)> = facts
        .iter()
        .map(|f| {
            (
                f.name.clone(),
                (f.macro_definitions.clone(), f.function_definitions.clone()),
            )
        })
        .collect();

    for fact in facts.iter_mut() {
        let macro_refs = &fact.macro_references;
        let function_refs = &fact.function_references;
        for (target, count) in &mut fact.dependencies {
            let Some((macros, functions)) = definitions.get(target) else {
                *count = 0;
                continue;
            };
            let mut n = 0u64;
            if mode.counts_macros() {
                n += macro_refs.iter().filter(|m| macros.contains(*m)).count() as u64;
            }
            if mode.counts_functions() {
                n += function_refs.iter().filter(|f| functions.contains(*f)).count() as u64;
            }
            *count = n;
        }
    }
}

/// Anything that can hand the core a list of file facts
pub trait FactSource {
    fn load_facts(&self) -> Result<Vec<FileFact>>;
}

/// Facts read from a JSON array on disk
pub struct JsonFacts {
    pub path: PathBuf,
}

impl JsonFacts {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FactSource for JsonFacts {
    fn load_facts(&self) -> Result<Vec<FileFact>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        serde_json::from_str(&text).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })
    }
}

pub fn write_facts_json(path: &Path, facts: &[FileFact]) -> Result<()> {
    let text = serde_json::to_string_pretty(facts).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|e| Error::io(path, e))
}

// --- On-disk fact cache ---

#[derive(Debug, Serialize, Deserialize)]
pub struct FactCache {
    pub fingerprint: String,
    pub facts: Vec<FileFact>,
}

fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h
}

/// Fingerprint of the scanned inputs: crate version, mode, and each file's
/// path, size and mtime.
pub fn fingerprint_for_scan(files: &[PathBuf], mode: DependencyMode) -> String {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    h = fnv1a64(h, env!("CARGO_PKG_VERSION").as_bytes());
    h = fnv1a64(h, mode.as_str().as_bytes());

    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();
    for p in sorted {
        h = fnv1a64(h, p.to_string_lossy().as_bytes());
        if let Ok(meta) = std::fs::metadata(p) {
            h = fnv1a64(h, meta.len().to_le_bytes().as_slice());
            let mtime_ns = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| {
                    u128::from(d.as_secs()) * 1_000_000_000_u128 + u128::from(d.subsec_nanos())
                });
            h = fnv1a64(h, mtime_ns.to_le_bytes().as_slice());
        }
    }
    format!("{h:016x}")
}

/// Cached facts at `path`, if present and matching `fingerprint`.
pub fn load_cache(path: &Path, fingerprint: &str) -> Option<Vec<FileFact>> {
    let bytes = std::fs::read(path).ok()?;
    let cache: FactCache = bincode::deserialize(&bytes).ok()?;
    (cache.fingerprint == fingerprint).then_some(cache.facts)
}

pub fn store_cache(path: &Path, fingerprint: &str, facts: &[FileFact]) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let cache = FactCache {
        fingerprint: fingerprint.to_string(),
        facts: facts.to_vec(),
    };
    let bytes = bincode::serialize(&cache)?;
    std::fs::write(path, bytes).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn symbols(v: &[&str]) -> BTreeSet<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    fn sample_facts() -> Vec<FileFact> {
        let mut user = FileFact::new("src/user.c")
            .with_dependency("src/lib.h", 0)
            .with_dependency("src/missing.h", 4);
        user.macro_references = symbols(&["MAX", "MIN", "UNRELATED"]);
        user.function_references = symbols(&["lib_init", "other"]);
        let mut lib = FileFact::new("src/lib.h");
        lib.macro_definitions = symbols(&["MAX", "MIN"]);
        lib.function_definitions = symbols(&["lib_init"]);
        vec![user, lib]
    }

    #[test]
    fn test_recount_all_dependencies() {
        let mut facts = sample_facts();
        recount_dependencies(&mut facts, DependencyMode::All);
        assert_eq!(facts[0].dependencies["src/lib.h"], 3);
        assert_eq!(facts[0].dependencies["src/missing.h"], 0);
    }

    #[test]
    fn test_recount_macros_only() {
        let mut facts = sample_facts();
        recount_dependencies(&mut facts, DependencyMode::MacrosOnly);
        assert_eq!(facts[0].dependencies["src/lib.h"], 2);
    }

    #[test]
    fn test_recount_functions_only() {
        let mut facts = sample_facts();
        recount_dependencies(&mut facts, DependencyMode::FunctionsOnly);
        assert_eq!(facts[0].dependencies["src/lib.h"], 1);
    }

    #[test]
    fn test_mode_from_flags_rejects_both() {
        assert!(matches!(
            DependencyMode::from_flags(true, true),
            Err(Error::ConflictingDependencyModes)
        ));
        assert_eq!(DependencyMode::from_flags(false, false).unwrap(), None);
        assert_eq!(
            DependencyMode::from_flags(true, false).unwrap(),
            Some(DependencyMode::MacrosOnly)
        );
    }

    #[test]
    fn test_mode_parse_and_dir_names() {
        assert_eq!("functions".parse::<DependencyMode>().unwrap(), DependencyMode::FunctionsOnly);
        assert!("symbols".parse::<DependencyMode>().is_err());
        assert_eq!(DependencyMode::All.dir_name(), "all_dependencies");
    }

    #[test]
    fn test_json_facts_round_trip_through_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("facts.json");
        let facts = sample_facts();
        write_facts_json(&path, &facts).unwrap();
        let loaded = JsonFacts::new(&path).load_facts().unwrap();
        assert_eq!(loaded, facts);
    }

    #[test]
    fn test_json_facts_accepts_minimal_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("facts.json");
        std::fs::write(&path, r#"[{"name": "a.c", "dependencies": {"b.h": 2}}, {"name": "b.h"}]"#).unwrap();
        let loaded = JsonFacts::new(&path).load_facts().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].dependencies["b.h"], 2);
        assert_eq!(loaded[1].lines, 0);
    }

    #[test]
    fn test_json_facts_reports_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFacts::new(&path).load_facts().unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
    }

    #[test]
    fn test_json_facts_reports_missing_file() {
        let err = JsonFacts::new("/nonexistent/facts.json").load_facts().unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_cache_hit_and_fingerprint_mismatch() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache").join("facts.bin");
        let facts = sample_facts();
        store_cache(&path, "abc", &facts).unwrap();
        assert_eq!(load_cache(&path, "abc"), Some(facts));
        assert_eq!(load_cache(&path, "def"), None);
    }

    #[test]
    fn test_fingerprint_changes_with_mode_and_contents() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.c");
        std::fs::write(&file, "int x;").unwrap();
        let files = vec![file.clone()];
        let all = fingerprint_for_scan(&files, DependencyMode::All);
        assert_eq!(all, fingerprint_for_scan(&files, DependencyMode::All));
        assert_ne!(all, fingerprint_for_scan(&files, DependencyMode::MacrosOnly));
        std::fs::write(&file, "int x; int y;").unwrap();
        assert_ne!(all, fingerprint_for_scan(&files, DependencyMode::All));
    }
}
