//! Weighted dependency graph
//!
//! Undirected weighted graph over node identifiers (file paths or cluster
//! names). Directed per-file dependency counts are folded into a single edge
//! per unordered pair by [`WeightedGraph::merge_or_add`]; self-loops never
//! make it into the edge list.
//!
//! The graph also tracks an inbound-weight total per node: the summed weight
//! of every edge that names the node as its `to` side. It only feeds
//! dependency-intensity plots and plays no part in MQ.
//!
//! [`WeightedGraph::components`] splits the graph into its connected
//! components (union-find over the edge list) and [`WeightedGraph::subgraph`]
//! produces the index-based view the optimizers work on.

use petgraph::unionfind::UnionFind;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// One undirected edge, stored in the orientation it was first inserted with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedEdge {
    pub from: String,
    pub to: String,
    pub weight: u64,
}

/// Edge list plus inbound-weight totals
#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    edges: Vec<WeightedEdge>,
    inbound: BTreeMap<String, u64>,
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge without looking for an existing one.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: u64) {
        *self.inbound.entry(to.to_string()).or_insert(0) += weight;
        self.edges.push(WeightedEdge {
            from: from.to_string(),
            to: to.to_string(),
            weight,
        });
    }

    /// Fold `weight` into the existing edge between `from` and `to` (in either
    /// orientation), or append a new edge. Self-loops are dropped.
    pub fn merge_or_add(&mut self, from: &str, to: &str, weight: u64) {
        if from == to {
            return;
        }
        let existing = self.edges.iter_mut().find(|e| {
            (e.from == to && e.to == from) || (e.from == from && e.to == to)
        });
        match existing {
            Some(edge) => {
                edge.weight += weight;
                *self.inbound.entry(edge.to.clone()).or_insert(0) += weight;
            }
            None => self.add_edge(from, to, weight),
        }
    }

    pub fn edges(&self) -> &[WeightedEdge] {
        &self.edges
    }

    pub fn inbound(&self) -> &BTreeMap<String, u64> {
        &self.inbound
    }

    pub fn inbound_weight(&self, node: &str) -> u64 {
        self.inbound.get(node).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn total_weight(&self) -> u64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// Every node named by at least one edge
    pub fn connected_nodes(&self) -> BTreeSet<&str> {
        self.edges
            .iter()
            .flat_map(|e| [e.from.as_str(), e.to.as_str()])
            .collect()
    }

    /// Nodes in order of first appearance in the edge list
    pub fn nodes(&self) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for e in &self.edges {
            for n in [e.from.as_str(), e.to.as_str()] {
                if seen.insert(n) {
                    out.push(n);
                }
            }
        }
        out
    }

    /// Connected components, each listed in first-appearance order. Components
    /// are ordered by their first node's appearance.
    pub fn components(&self) -> Vec<Vec<String>> {
        let nodes = self.nodes();
        let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut uf: UnionFind<usize> = UnionFind::new(nodes.len());
        for e in &self.edges {
            uf.union(index[e.from.as_str()], index[e.to.as_str()]);
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<String>> = Vec::new();
        for (i, n) in nodes.iter().enumerate() {
            let root = uf.find(i);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push((*n).to_string());
        }
        components
    }

    /// Index-based view restricted to `nodes`; edges leaving the set are dropped.
    pub fn subgraph(&self, nodes: &[String]) -> IndexedGraph {
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        let edges = self
            .edges
            .iter()
            .filter_map(|e| {
                let a = *index.get(e.from.as_str())?;
                let b = *index.get(e.to.as_str())?;
                Some((a, b, e.weight))
            })
            .collect();
        IndexedGraph {
            names: nodes.to_vec(),
            edges,
        }
    }
}

/// Dense-index graph handed to the MQ metric and the optimizers
#[derive(Debug, Clone, Default)]
pub struct IndexedGraph {
    names: Vec<String>,
    edges: Vec<(usize, usize, u64)>,
}

impl IndexedGraph {
    pub fn from_edges(names: Vec<String>, edges: Vec<(usize, usize, u64)>) -> Self {
        Self { names, edges }
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    pub fn edges(&self) -> &[(usize, usize, u64)] {
        &self.edges
    }

    pub fn total_weight(&self) -> u64 {
        self.edges.iter().map(|&(_, _, w)| w).sum()
    }
}
