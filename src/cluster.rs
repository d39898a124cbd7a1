//! Clustering orchestration for one directory level
//!
//! Splits the level graph into connected components, picks the cluster count
//! and optimizer per component, keeps the best of several random restarts,
//! then flattens every component's clusters into one labelled set. Nodes that
//! appear in no edge are folded into singleton clusters afterwards.

use crate::config::defaults;
use crate::error::Error;
use crate::genetic::{GeneticParams, genetic_search};
use crate::graph::{IndexedGraph, WeightedGraph};
use crate::local_search::{Scored, local_search};
use crate::mq::MqMode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Optimizer and MQ flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    LocalSearch,
    Genetic,
    LocalSearchWeighted,
    GeneticWeighted,
}

impl Algorithm {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalSearch => "local-search",
            Self::Genetic => "genetic",
            Self::LocalSearchWeighted => "local-search-weighted",
            Self::GeneticWeighted => "genetic-weighted",
        }
    }

    pub const fn mode(self) -> MqMode {
        match self {
            Self::LocalSearch | Self::Genetic => MqMode::Unweighted,
            Self::LocalSearchWeighted | Self::GeneticWeighted => MqMode::Weighted,
        }
    }

    const fn is_genetic(self) -> bool {
        matches!(self, Self::Genetic | Self::GeneticWeighted)
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" | "local-search" | "suboptimal" => Ok(Self::LocalSearch),
            "1" | "genetic" => Ok(Self::Genetic),
            "2" | "local-search-weighted" | "suboptimal_weighted" => Ok(Self::LocalSearchWeighted),
            "3" | "genetic-weighted" | "genetic_weighted" => Ok(Self::GeneticWeighted),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested cluster count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterCount {
    /// Pick `k` from each component's size
    Dynamic,
    Fixed(usize),
    /// Dependency-intensity plots instead of cluster plots; `k` is picked
    /// dynamically and the optimizer is forced to unweighted local search
    Heatmap,
}

impl ClusterCount {
    pub const fn is_heatmap(self) -> bool {
        matches!(self, Self::Heatmap)
    }
}

impl FromStr for ClusterCount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dynamic" | "0" => Ok(Self::Dynamic),
            "heatmap" | "-1" => Ok(Self::Heatmap),
            other => other
                .parse::<usize>()
                .map(Self::Fixed)
                .map_err(|_| Error::InvalidClusterCount(other.to_string())),
        }
    }
}

impl fmt::Display for ClusterCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dynamic => f.write_str("dynamic"),
            Self::Fixed(k) => write!(f, "{k}"),
            Self::Heatmap => f.write_str("heatmap"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterOptions {
    pub algorithm: Algorithm,
    pub cluster_count: ClusterCount,
    pub random_samples: usize,
    pub genetic: GeneticParams,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::LocalSearch,
            cluster_count: ClusterCount::Dynamic,
            random_samples: defaults::RANDOM_SAMPLES,
            genetic: GeneticParams::default(),
        }
    }
}

/// Labelled clusters of one level plus the mean MQ over its components
#[derive(Debug, Clone, PartialEq)]
pub struct LevelClustering {
    pub mean_mq: f64,
    pub clusters: BTreeMap<usize, Vec<String>>,
}

/// Cluster count for a component of `n` nodes
pub const fn dynamic_k(n: usize) -> usize {
    match n {
        0..5 => 1,
        5..7 => 2,
        7..15 => 3,
        15..25 => 4,
        _ => 5,
    }
}

fn run_once<R: Rng + ?Sized>(sub: &IndexedGraph, k: usize, opts: &ClusterOptions, rng: &mut R) -> Scored {
    if opts.cluster_count.is_heatmap() {
        return local_search(sub, k, MqMode::Unweighted, rng);
    }
    let mode = opts.algorithm.mode();
    if opts.algorithm.is_genetic() {
        genetic_search(sub, k, mode, opts.genetic, rng)
    } else {
        local_search(sub, k, mode, rng)
    }
}

/// Cluster one connected component, returning its MQ and named clusters.
pub fn cluster_component<R: Rng + ?Sized>(
    sub: &IndexedGraph,
    opts: &ClusterOptions,
    rng: &mut R,
) -> (f64, Vec<Vec<String>>) {
    let n = sub.node_count();
    let k = match opts.cluster_count {
        ClusterCount::Fixed(k) => k.max(1),
        ClusterCount::Dynamic | ClusterCount::Heatmap => dynamic_k(n),
    };

    let best = if n < (k + 1).max(5) {
        local_search(sub, 1, MqMode::Unweighted, rng)
    } else {
        let mut best = run_once(sub, k, opts, rng);
        for _ in 1..opts.random_samples.max(1) {
            let run = run_once(sub, k, opts, rng);
            if run.mq > best.mq {
                best = run;
            }
        }
        best
    };

    let named = best
        .partition
        .iter()
        .map(|c| c.iter().map(|&i| sub.name(i).to_string()).collect())
        .collect();
    (best.mq, named)
}

/// Cluster every connected component of `graph` and merge the results.
///
/// Components run in parallel; each draws its own seed from `rng` up front so
/// the outcome depends only on the caller's RNG state. An edgeless graph
/// yields no clusters and a mean MQ of 1.
pub fn cluster_graph<R: Rng + ?Sized>(
    graph: &WeightedGraph,
    opts: &ClusterOptions,
    rng: &mut R,
) -> LevelClustering {
    let components = graph.components();
    if components.is_empty() {
        return LevelClustering {
            mean_mq: 1.0,
            clusters: BTreeMap::new(),
        };
    }

    let seeded: Vec<(Vec<String>, u64)> = components.into_iter().map(|c| (c, rng.r#gen())).collect();
    let results: Vec<(f64, Vec<Vec<String>>)> = seeded
        .par_iter()
        .map(|(nodes, seed)| {
            let sub = graph.subgraph(nodes);
            let mut component_rng = StdRng::seed_from_u64(*seed);
            cluster_component(&sub, opts, &mut component_rng)
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let mean_mq = results.iter().map(|(mq, _)| mq).sum::<f64>() / results.len() as f64;
    tracing::debug!(
        components = results.len(),
        mean_mq,
        algorithm = %opts.algorithm,
        "clustered level graph"
    );

    let clusters = results
        .into_iter()
        .flat_map(|(_, clusters)| clusters)
        .filter(|c| !c.is_empty())
        .enumerate()
        .collect();
    LevelClustering { mean_mq, clusters }
}

/// Give every item that appears in no edge its own singleton cluster, with
/// labels continuing after the current maximum.
pub fn fold_unconnected(items: &[String], graph: &WeightedGraph, clustering: &mut LevelClustering) {
    let connected: BTreeSet<&str> = graph.connected_nodes();
    let mut next = clustering.clusters.keys().next_back().map_or(0, |max| max + 1);
    for item in items {
        if !connected.contains(item.as_str()) {
            clustering.clusters.insert(next, vec![item.clone()]);
            next += 1;
        }
    }
}
