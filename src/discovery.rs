//! C source discovery and traversal

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Kinds of C files that take part in clustering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Source,
    Header,
    Inline,
}

impl SourceKind {
    /// Detect kind from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| match ext.to_str()? {
            "c" => Some(Self::Source),
            "h" => Some(Self::Header),
            "inl" => Some(Self::Inline),
            _ => None,
        })
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Source => "c",
            Self::Header => "h",
            Self::Inline => "inl",
        }
    }

    pub const ALL: [Self; 3] = [Self::Source, Self::Header, Self::Inline];
}

/// Finds all `.c`, `.h` and `.inl` files under `root`.
/// Respects .gitignore rules automatically.
pub fn find_c_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| SourceKind::from_path(path).is_some())
        .collect();
    files.sort();
    files
}

/// C files under each directory of interest, relative to `source_root`.
/// Missing directories contribute nothing; overlapping ones are deduplicated.
/// No directories means the whole source root.
pub fn find_c_files_in(source_root: &Path, directories: &[String]) -> Vec<PathBuf> {
    if directories.is_empty() {
        return find_c_files(source_root);
    }
    let mut files: Vec<PathBuf> = directories
        .iter()
        .map(|dir| source_root.join(dir.trim_matches('/')))
        .filter(|dir| dir.is_dir())
        .flat_map(|dir| find_c_files(&dir))
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Slash-separated identifier of `path` relative to `root`
pub fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
