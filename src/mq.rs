//! Modular quality (MQ)
//!
//! MQ rewards dense clusters and penalizes connections between clusters:
//!
//! ```text
//! MQ = 1/k * sum_i ( A_i - c * sum_j E_ij ),   c = 1 / (k * (k - 1)) / 2
//! ```
//!
//! - `A_i` (intraconnectivity): adjacency pairs inside cluster `i` over `|i|^2`.
//!   Every intra edge is seen from both of its endpoints. In weighted mode the
//!   adjacency weight is divided by `total_weight * |i|` instead.
//! - `E_ij` (interconnectivity): edges between `i` and `j` seen from both
//!   sides over `2 * |i| * |j|`. In weighted mode the crossing weight is seen
//!   from the `i` side only.
//!
//! Note that `c` carries both halvings.
//!
//! Sentinels: one cluster scores `1`, no clusters score `0`, an empty
//! cluster has `A_i = 1` and `E_ij = 1` against any non-empty cluster, and a
//! weighted run over a zero-weight graph scores `0`.

use crate::graph::IndexedGraph;

/// Clusters of node indices into an [`IndexedGraph`]. Empty clusters are
/// allowed and counted.
pub type Partition = Vec<Vec<usize>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqMode {
    Unweighted,
    Weighted,
}

impl MqMode {
    pub const fn is_weighted(self) -> bool {
        matches!(self, Self::Weighted)
    }
}

/// Per-cluster edge tallies for one partition
struct Tally {
    sizes: Vec<usize>,
    /// Intra-cluster edges (or weight), each edge counted once
    intra: Vec<f64>,
    /// Crossing edges (or weight) between cluster pairs, row-major `k * k`,
    /// symmetric, each edge counted once
    inter: Vec<f64>,
}

fn tally(graph: &IndexedGraph, partition: &[Vec<usize>], mode: MqMode) -> Tally {
    let k = partition.len();
    let mut label = vec![usize::MAX; graph.node_count()];
    for (ci, cluster) in partition.iter().enumerate() {
        for &node in cluster {
            label[node] = ci;
        }
    }

    let mut intra = vec![0.0; k];
    let mut inter = vec![0.0; k * k];
    for &(a, b, w) in graph.edges() {
        let (ca, cb) = (label[a], label[b]);
        if ca == usize::MAX || cb == usize::MAX {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let amount = if mode.is_weighted() { w as f64 } else { 1.0 };
        if ca == cb {
            intra[ca] += amount;
        } else {
            inter[ca * k + cb] += amount;
            inter[cb * k + ca] += amount;
        }
    }

    Tally {
        sizes: partition.iter().map(Vec::len).collect(),
        intra,
        inter,
    }
}

#[allow(clippy::cast_precision_loss)]
fn intraconnectivity(t: &Tally, i: usize, mode: MqMode, total_weight: f64) -> f64 {
    let n = t.sizes[i];
    if n == 0 {
        return 1.0;
    }
    let adjacency = 2.0 * t.intra[i];
    match mode {
        MqMode::Unweighted => adjacency / (n * n) as f64,
        MqMode::Weighted => adjacency / (total_weight * n as f64),
    }
}

#[allow(clippy::cast_precision_loss)]
fn interconnectivity(t: &Tally, i: usize, j: usize, mode: MqMode) -> f64 {
    let (ni, nj) = (t.sizes[i], t.sizes[j]);
    // Two empty clusters compare equal, like a cluster against itself
    if i == j || (ni == 0 && nj == 0) {
        return 0.0;
    }
    if ni == 0 || nj == 0 {
        return 1.0;
    }
    let k = t.sizes.len();
    let crossing = t.inter[i * k + j];
    let seen = match mode {
        MqMode::Unweighted => 2.0 * crossing,
        MqMode::Weighted => crossing,
    };
    seen / (2 * ni * nj) as f64
}

/// Score `partition` over `graph`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn modular_quality(graph: &IndexedGraph, partition: &[Vec<usize>], mode: MqMode) -> f64 {
    let k = partition.len();
    match k {
        0 => return 0.0,
        1 => return 1.0,
        _ => {}
    }
    let total_weight = graph.total_weight() as f64;
    if mode.is_weighted() && total_weight == 0.0 {
        return 0.0;
    }

    let t = tally(graph, partition, mode);
    let partition_constant = 1.0 / (k * (k - 1)) as f64 / 2.0;

    let mut mq = 0.0;
    for i in 0..k {
        let a_i = intraconnectivity(&t, i, mode, total_weight);
        let e_i: f64 = (0..k).map(|j| interconnectivity(&t, i, j, mode)).sum();
        mq += a_i - partition_constant * e_i;
    }
    mq / k as f64
}
