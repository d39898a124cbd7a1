//! Genetic search over partitions
//!
//! Each generation applies one local-search sweep to the first half of the
//! population, then resamples the whole population with replacement in
//! proportion to MQ. The run stops when resampling reproduces the previous
//! population exactly or after `max_generations`.

use crate::config::defaults;
use crate::graph::IndexedGraph;
use crate::local_search::{Scored, improve_once, random_partition};
use crate::mq::{MqMode, Partition, modular_quality};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneticParams {
    pub population_size: usize,
    pub max_generations: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: defaults::POPULATION_SIZE,
            max_generations: defaults::MAX_GENERATIONS,
        }
    }
}

/// Selection weights proportional to score. Negative scores get no weight;
/// when nothing is left to weigh, selection is uniform.
fn selection_weights(scores: &[f64]) -> Vec<f64> {
    let clamped: Vec<f64> = scores.iter().map(|s| s.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();
    if total > 0.0 && total.is_finite() {
        clamped
    } else {
        vec![1.0; scores.len()]
    }
}

fn resample<R: Rng + ?Sized>(population: &[Partition], scores: &[f64], rng: &mut R) -> Vec<Partition> {
    let weights = selection_weights(scores);
    match WeightedIndex::new(&weights) {
        Ok(dist) => (0..population.len())
            .map(|_| population[dist.sample(rng)].clone())
            .collect(),
        Err(_) => (0..population.len())
            .map(|_| population[rng.gen_range(0..population.len())].clone())
            .collect(),
    }
}

fn best_of(graph: &IndexedGraph, population: Vec<Partition>, mode: MqMode) -> Scored {
    let mut best: Option<Scored> = None;
    for partition in population {
        let mq = modular_quality(graph, &partition, mode);
        if best.as_ref().is_none_or(|b| mq > b.mq) {
            best = Some(Scored { mq, partition });
        }
    }
    best.unwrap_or(Scored {
        mq: 0.0,
        partition: Vec::new(),
    })
}

pub fn genetic_search<R: Rng + ?Sized>(
    graph: &IndexedGraph,
    k: usize,
    mode: MqMode,
    params: GeneticParams,
    rng: &mut R,
) -> Scored {
    let size = params.population_size.max(1);
    let mut nodes: Vec<usize> = (0..graph.node_count()).collect();
    let mut population: Vec<Partition> = (0..size)
        .map(|_| random_partition(&mut nodes, k, rng))
        .collect();

    let mut generations = 0usize;
    for _ in 0..params.max_generations {
        generations += 1;
        for individual in population.iter_mut().take(size / 2) {
            if let Some(better) = improve_once(graph, individual, mode) {
                *individual = better.partition;
            }
        }

        let scores: Vec<f64> = population
            .iter()
            .map(|p| modular_quality(graph, p, mode))
            .collect();
        let next = resample(&population, &scores, rng);
        if next == population {
            break;
        }
        population = next;
    }

    let best = best_of(graph, population, mode);
    tracing::trace!(generations, mq = best.mq, "genetic search finished");
    best
}
