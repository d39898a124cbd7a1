//! Crate-wide error type

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown clustering strategy '{0}' (expected local-search, genetic, local-search-weighted, genetic-weighted or 0-3)")]
    UnknownStrategy(String),

    #[error("invalid cluster count '{0}' (expected dynamic, heatmap or a positive integer)")]
    InvalidClusterCount(String),

    #[error("only one of macros-only and functions-only can be set at once")]
    ConflictingDependencyModes,

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed fact file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("fact cache error: {0}")]
    Cache(#[from] bincode::Error),

    #[error("scanner pattern error: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
