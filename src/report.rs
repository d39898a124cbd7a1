//! Structured results for output
//!
//! Per-level rows with aggregate line and definition counts (computed by
//! flattening each cluster to its leaf files), a whole-run MQ summary, and
//! file/line totals per extension.

use crate::discovery::SourceKind;
use crate::facts::FileFact;
use crate::hierarchy::Hierarchy;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRow {
    /// Cluster name; root clusters carry the project name as their path
    pub id: String,
    /// Names of the cluster's direct children
    pub children: Vec<String>,
    pub total_files: usize,
    pub lines_of_code: usize,
    pub total_functions: usize,
    pub total_macros: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelReport {
    pub key: String,
    pub depth: usize,
    pub mean_mq: f64,
    pub clusters: Vec<ClusterRow>,
}

pub fn level_reports(hierarchy: &Hierarchy, project: &str) -> Vec<LevelReport> {
    let arena = &hierarchy.arena;
    hierarchy
        .levels
        .iter()
        .map(|level| {
            let clusters = level
                .clusters
                .iter()
                .map(|&id| {
                    let name = arena.name(id);
                    let id_text = if name.starts_with(':') {
                        format!("{project}{name}")
                    } else {
                        name.to_string()
                    };
                    let facts: Vec<&FileFact> = arena.leaf_facts(id).collect();
                    ClusterRow {
                        id: id_text,
                        children: arena
                            .children(id)
                            .iter()
                            .map(|&c| arena.name(c).to_string())
                            .collect(),
                        total_files: facts.len(),
                        lines_of_code: facts.iter().map(|f| f.lines).sum(),
                        total_functions: facts.iter().map(|f| f.function_definitions.len()).sum(),
                        total_macros: facts.iter().map(|f| f.macro_definitions.len()).sum(),
                    }
                })
                .collect();
            LevelReport {
                key: level.key.clone(),
                depth: level.depth,
                mean_mq: level.mean_mq,
                clusters,
            }
        })
        .collect()
}

/// MQ overview across every level of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub levels: usize,
    /// Levels whose mean MQ is exactly 1 (single cluster or no edges)
    pub trivial_levels: usize,
    /// Mean MQ over the remaining levels, if any
    pub mean_mq: Option<f64>,
}

impl RunSummary {
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    pub fn from_levels(levels: &[LevelReport]) -> Self {
        let others: Vec<f64> = levels.iter().map(|l| l.mean_mq).filter(|&mq| mq != 1.0).collect();
        let mean_mq = (!others.is_empty()).then(|| others.iter().sum::<f64>() / others.len() as f64);
        Self {
            levels: levels.len(),
            trivial_levels: levels.len() - others.len(),
            mean_mq,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTotals {
    pub files: usize,
    pub lines: usize,
}

impl FileTotals {
    fn add(&mut self, fact: &FileFact) {
        self.files += 1;
        self.lines += fact.lines;
    }
}

/// File and line totals, overall and split by extension
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTotals {
    pub all: FileTotals,
    pub by_kind: BTreeMap<&'static str, FileTotals>,
}

impl ScopeTotals {
    fn from_facts<'a>(facts: impl Iterator<Item = &'a FileFact>) -> Self {
        let mut totals = Self {
            all: FileTotals::default(),
            by_kind: SourceKind::ALL.into_iter().map(|k| (k.extension(), FileTotals::default())).collect(),
        };
        for fact in facts {
            totals.all.add(fact);
            if let Some(kind) = fact
                .extension()
                .and_then(|e| SourceKind::ALL.into_iter().find(|k| k.extension() == e))
            {
                totals.by_kind.entry(kind.extension()).or_default().add(fact);
            }
        }
        totals
    }

    pub fn kind(&self, kind: SourceKind) -> FileTotals {
        self.by_kind.get(kind.extension()).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub project: String,
    pub overall: ScopeTotals,
    /// Directory of interest -> totals of the files under it
    pub directories: Vec<(String, ScopeTotals)>,
}

pub fn project_summary(project: &str, facts: &[FileFact], directories: &[String]) -> ProjectSummary {
    ProjectSummary {
        project: project.to_string(),
        overall: ScopeTotals::from_facts(facts.iter()),
        directories: directories
            .iter()
            .map(|dir| {
                let prefix = format!("{}/", dir.trim_matches('/'));
                let totals = ScopeTotals::from_facts(facts.iter().filter(|f| f.name.starts_with(&prefix)));
                (dir.clone(), totals)
            })
            .collect(),
    }
}
