//! Steepest-ascent hill climbing over partitions
//!
//! A sweep tries every single-node move (node out of its cluster into each
//! other cluster) and keeps the best strictly improving one across the whole
//! sweep. The climb stops at the first sweep without an improving move.
//! MQ rises strictly with every adopted move and the partition space is
//! finite, so the climb always terminates.

use crate::graph::IndexedGraph;
use crate::mq::{MqMode, Partition, modular_quality};
use rand::Rng;
use rand::seq::SliceRandom;

/// A partition together with its MQ score
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub mq: f64,
    pub partition: Partition,
}

/// Shuffle `nodes` and deal them round-robin into `k` clusters.
pub fn random_partition<R: Rng + ?Sized>(nodes: &mut [usize], k: usize, rng: &mut R) -> Partition {
    nodes.shuffle(rng);
    let k = k.max(1);
    (0..k)
        .map(|i| nodes.iter().skip(i).step_by(k).copied().collect())
        .collect()
}

/// One sweep: the best strictly improving single-node move, if any.
#[must_use]
pub fn improve_once(graph: &IndexedGraph, current: &Partition, mode: MqMode) -> Option<Scored> {
    let mut best_mq = modular_quality(graph, current, mode);
    let mut best: Option<Partition> = None;

    for (i, cluster) in current.iter().enumerate() {
        for (pos, &node) in cluster.iter().enumerate() {
            for j in 0..current.len() {
                if i == j {
                    continue;
                }
                let mut candidate = current.clone();
                candidate[i].remove(pos);
                candidate[j].push(node);
                let mq = modular_quality(graph, &candidate, mode);
                if mq > best_mq {
                    best_mq = mq;
                    best = Some(candidate);
                }
            }
        }
    }

    best.map(|partition| Scored {
        mq: best_mq,
        partition,
    })
}

/// Climb from `start` until no single move improves MQ.
#[must_use]
pub fn climb(graph: &IndexedGraph, start: Partition, mode: MqMode) -> Scored {
    let mut partition = start;
    let mut sweeps = 0usize;
    while let Some(better) = improve_once(graph, &partition, mode) {
        partition = better.partition;
        sweeps += 1;
    }
    let mq = modular_quality(graph, &partition, mode);
    tracing::trace!(sweeps, mq, "local search converged");
    Scored { mq, partition }
}

/// Random `k`-way start followed by a full climb.
pub fn local_search<R: Rng + ?Sized>(
    graph: &IndexedGraph,
    k: usize,
    mode: MqMode,
    rng: &mut R,
) -> Scored {
    let mut nodes: Vec<usize> = (0..graph.node_count()).collect();
    let start = random_partition(&mut nodes, k, rng);
    climb(graph, start, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn two_triangles() -> IndexedGraph {
        IndexedGraph::from_edges(
            (0..6).map(|i| format!("f{i}.c")).collect(),
            vec![(0, 1, 1), (1, 2, 1), (2, 0, 1), (3, 4, 1), (4, 5, 1), (5, 3, 1), (2, 3, 1)],
        )
    }

    #[test]
    fn test_random_partition_deals_round_robin() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut nodes: Vec<usize> = (0..7).collect();
        let p = random_partition(&mut nodes, 3, &mut rng);
        assert_eq!(p.len(), 3);
        assert_eq!(p.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 2, 2]);
        let mut all: Vec<usize> = p.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_random_partition_more_clusters_than_nodes() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut nodes = vec![0, 1];
        let p = random_partition(&mut nodes, 4, &mut rng);
        assert_eq!(p.len(), 4);
        assert_eq!(p.iter().filter(|c| c.is_empty()).count(), 2);
    }

    #[test]
    fn test_improve_once_returns_none_at_optimum() {
        let g = two_triangles();
        let optimum = vec![vec![0, 1, 2], vec![3, 4, 5]];
        assert!(improve_once(&g, &optimum, MqMode::Unweighted).is_none());
    }

    #[test]
    fn test_improve_once_strictly_improves() {
        let g = two_triangles();
        let start = vec![vec![0, 1, 3], vec![2, 4, 5]];
        let before = modular_quality(&g, &start, MqMode::Unweighted);
        let better = improve_once(&g, &start, MqMode::Unweighted).unwrap();
        assert!(better.mq > before);
        assert_eq!(better.mq, modular_quality(&g, &better.partition, MqMode::Unweighted));
    }

    #[test]
    fn test_climb_is_monotone_and_terminates() {
        let g = two_triangles();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut nodes: Vec<usize> = (0..6).collect();
            let mut partition = random_partition(&mut nodes, 2, &mut rng);
            let mut last = modular_quality(&g, &partition, MqMode::Unweighted);
            while let Some(next) = improve_once(&g, &partition, MqMode::Unweighted) {
                assert!(next.mq > last);
                last = next.mq;
                partition = next.partition;
            }
            let finished = climb(&g, partition.clone(), MqMode::Unweighted);
            assert_eq!(finished.partition, partition);
        }
    }

    #[test]
    fn test_local_search_keeps_every_node_once() {
        let g = two_triangles();
        let mut rng = StdRng::seed_from_u64(42);
        let result = local_search(&g, 3, MqMode::Weighted, &mut rng);
        let mut all: Vec<usize> = result.partition.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..6).collect::<Vec<_>>());
        assert!((-1.0..=1.0).contains(&result.mq));
    }

    #[test]
    fn test_local_search_single_cluster_is_one() {
        let g = two_triangles();
        let mut rng = StdRng::seed_from_u64(3);
        let result = local_search(&g, 1, MqMode::Unweighted, &mut rng);
        assert_eq!(result.mq, 1.0);
        assert_eq!(result.partition.len(), 1);
    }

    #[test]
    fn test_local_search_is_reproducible_for_a_seed() {
        let g = two_triangles();
        let a = local_search(&g, 2, MqMode::Unweighted, &mut StdRng::seed_from_u64(11));
        let b = local_search(&g, 2, MqMode::Unweighted, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
