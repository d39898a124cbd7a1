//! Directory-aware hierarchical clustering
//!
//! The descent is post-order: every subdirectory of interest is clustered
//! first, its clusters join the parent's item list as single nodes, and the
//! files they absorbed leave it. Each level then builds a fresh graph over
//! its items, where a dependency on a file inside a promoted cluster becomes
//! an edge to that cluster and reverse-direction counts merge into one edge.

use crate::cluster::{ClusterOptions, cluster_graph, fold_unconnected};
use crate::error::Result;
use crate::facts::FileFact;
use crate::graph::WeightedGraph;
use crate::nodes::{ClusterNode, NodeArena, NodeId};
use crate::viz::{Coloring, LevelPlot, PlotSink};
use rand::Rng;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct HierarchyOptions {
    pub project: String,
    /// Directories of interest, relative to the source root. Empty means all.
    pub directories: Vec<String>,
    pub cluster: ClusterOptions,
    pub max_plot_depth: usize,
}

/// Outcome of clustering one directory level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelResult {
    /// Directory path, or the project name at the root
    pub key: String,
    /// Directory path; empty at the root
    pub path: String,
    pub depth: usize,
    pub mean_mq: f64,
    pub clusters: Vec<NodeId>,
}

#[derive(Debug)]
pub struct Hierarchy {
    pub arena: NodeArena,
    /// Levels in completion order, children before parents
    pub levels: Vec<LevelResult>,
    /// Clusters formed at the root
    pub top: Vec<NodeId>,
}

impl Hierarchy {
    pub fn level(&self, key: &str) -> Option<&LevelResult> {
        self.levels.iter().find(|l| l.key == key)
    }
}

/// Arena and top-level items for a run, with companion files joined when asked.
pub fn prepare_items(facts: Vec<FileFact>, joint_files: bool) -> (NodeArena, Vec<NodeId>) {
    let (mut arena, items) = NodeArena::from_facts(facts);
    if joint_files {
        let joined = arena.join_companion_files(&items);
        return (arena, joined);
    }
    (arena, items)
}

pub fn run_hierarchy<R: Rng + ?Sized>(
    mut arena: NodeArena,
    mut items: Vec<NodeId>,
    opts: &HierarchyOptions,
    sink: &mut dyn PlotSink,
    rng: &mut R,
) -> Result<Hierarchy> {
    let mut descent = Descent {
        arena: &mut arena,
        opts,
        sink,
        rng,
        levels: Vec::new(),
    };
    let consumed = descent.descend(&mut items, "", 0)?;
    let levels = descent.levels;
    items.retain(|id| !consumed.contains(id));
    tracing::info!(levels = levels.len(), top = items.len(), "hierarchy complete");
    Ok(Hierarchy {
        arena,
        levels,
        top: items,
    })
}

struct Descent<'a, R: ?Sized> {
    arena: &'a mut NodeArena,
    opts: &'a HierarchyOptions,
    sink: &'a mut dyn PlotSink,
    rng: &'a mut R,
    levels: Vec<LevelResult>,
}

impl<R: Rng + ?Sized> Descent<'_, R> {
    /// Cluster the `base` subtree of `items`, pushing the new clusters onto
    /// `items` and returning every item absorbed at this level or below.
    fn descend(&mut self, items: &mut Vec<NodeId>, base: &str, depth: usize) -> Result<HashSet<NodeId>> {
        let mut level: Vec<NodeId> = items
            .iter()
            .copied()
            .filter(|&id| in_subtree(self.arena.name(id), base))
            .collect();

        let mut absorbed_below: HashSet<NodeId> = HashSet::new();
        for dir in subdirectories(self.arena, &level, base) {
            if !is_of_interest(&dir, &self.opts.directories) {
                continue;
            }
            absorbed_below.extend(self.descend(&mut level, &dir, depth + 1)?);
        }
        level.retain(|id| !absorbed_below.contains(id));

        let labels = level_labels(self.arena, &level);
        let graph = build_level_graph(self.arena, &level, &labels, base);
        let mut clustering = cluster_graph(&graph, &self.opts.cluster, self.rng);
        let key = if base.is_empty() { self.opts.project.clone() } else { base.to_string() };

        if depth <= self.opts.max_plot_depth && !graph.is_empty() {
            let coloring = if self.opts.cluster.cluster_count.is_heatmap() {
                Coloring::Dependencies
            } else {
                Coloring::Clusters
            };
            self.sink.render(&LevelPlot {
                key: &key,
                coloring,
                graph: &graph,
                clusters: &clustering.clusters,
            })?;
        }
        fold_unconnected(&labels, &graph, &mut clustering);

        let by_label: HashMap<&str, NodeId> = labels.iter().map(String::as_str).zip(level.iter().copied()).collect();
        let memberships: Vec<(usize, Vec<NodeId>)> = clustering
            .clusters
            .iter()
            .map(|(&index, members)| {
                let children = members.iter().filter_map(|m| by_label.get(m.as_str()).copied()).collect();
                (index, children)
            })
            .collect();

        let mut absorbed = absorbed_below;
        let mut clusters = Vec::with_capacity(memberships.len());
        for (index, children) in memberships {
            absorbed.extend(children.iter().copied());
            let id = self
                .arena
                .add_cluster(ClusterNode::new(base, index, children, clustering.mean_mq));
            items.push(id);
            clusters.push(id);
        }

        tracing::info!(
            level = %key,
            depth,
            items = level.len(),
            edges = graph.edge_count(),
            clusters = clusters.len(),
            mean_mq = clustering.mean_mq,
            "clustered directory level"
        );
        self.levels.push(LevelResult {
            key,
            path: base.to_string(),
            depth,
            mean_mq: clustering.mean_mq,
            clusters,
        });
        Ok(absorbed)
    }
}

fn in_subtree(name: &str, base: &str) -> bool {
    base.is_empty() || name.strip_prefix(base).is_some_and(|rest| rest.starts_with('/'))
}

fn is_path_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || in_subtree(path, prefix)
}

/// A directory is of interest when it lies on the path to, or inside, one of
/// the requested directories.
fn is_of_interest(dir: &str, interests: &[String]) -> bool {
    interests.is_empty()
        || interests.iter().any(|i| {
            let i = i.trim_matches('/');
            is_path_prefix(dir, i) || is_path_prefix(i, dir)
        })
}

/// Immediate subdirectories of `base` that hold at least one leaf of `level`
fn subdirectories(arena: &NodeArena, level: &[NodeId], base: &str) -> BTreeSet<String> {
    let mut dirs = BTreeSet::new();
    for &item in level {
        for leaf in arena.leaves(item) {
            let name = arena.name(leaf);
            let rest = if base.is_empty() {
                Some(name)
            } else {
                name.strip_prefix(base).and_then(|r| r.strip_prefix('/'))
            };
            if let Some((first, _)) = rest.and_then(|r| r.split_once('/')) {
                dirs.insert(if base.is_empty() { first.to_string() } else { format!("{base}/{first}") });
            }
        }
    }
    dirs
}

/// Graph labels for one level's items, unique within the level. A name
/// already taken gets the item's node id appended.
fn level_labels(arena: &NodeArena, level: &[NodeId]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(level.len());
    level
        .iter()
        .map(|&id| {
            let name = arena.name(id);
            let label = if taken.contains(name) {
                tracing::warn!(name, "item name repeated within a level");
                format!("{name}#{}", id.index())
            } else {
                name.to_string()
            };
            taken.insert(label.clone());
            label
        })
        .collect()
}

/// Weighted graph over one level's items, keyed by `labels`. Each leaf's
/// dependency counts are re-attributed to the item that owns the target leaf.
fn build_level_graph(arena: &NodeArena, level: &[NodeId], labels: &[String], base: &str) -> WeightedGraph {
    let owner: HashMap<&str, usize> = level
        .iter()
        .enumerate()
        .flat_map(|(pos, &item)| arena.leaves(item).into_iter().map(move |leaf| (arena.name(leaf), pos)))
        .collect();

    let mut graph = WeightedGraph::new();
    for (pos, &item) in level.iter().enumerate() {
        let from = labels[pos].as_str();
        for fact in arena.leaf_facts(item) {
            for (dep, &count) in &fact.dependencies {
                if *dep == fact.name {
                    continue;
                }
                // Outside this level's scope
                let Some(&target) = owner.get(dep.as_str()) else {
                    continue;
                };
                if target == pos {
                    continue;
                }
                let to = labels[target].as_str();
                if !from.starts_with(base) || !to.starts_with(base) {
                    tracing::warn!(from, to, base, "edge endpoint outside its directory level");
                }
                graph.merge_or_add(from, to, count);
            }
        }
    }
    graph
}
