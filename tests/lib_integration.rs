//! Integration tests for the clustermq library API

mod common;

use clustermq::cli_output::write_levels_csv;
use clustermq::*;
use common::{fake_c_root, interest, sample_facts, top_leaf_names};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeSet;
use tempfile::TempDir;

fn options(project: &str, dirs: &[&str], cluster: ClusterOptions) -> HierarchyOptions {
    HierarchyOptions {
        project: project.to_string(),
        directories: interest(dirs),
        cluster,
        max_plot_depth: 3,
    }
}

fn run(facts: Vec<FileFact>, opts: &HierarchyOptions, joint_files: bool, seed: u64) -> Hierarchy {
    let (arena, items) = prepare_items(facts, joint_files);
    run_hierarchy(arena, items, opts, &mut NoPlot, &mut StdRng::seed_from_u64(seed)).unwrap()
}

fn scan(mode: DependencyMode) -> Vec<FileFact> {
    CScanner::new(fake_c_root(), interest(&["ucs", "uct"]), mode)
        .unwrap()
        .load_facts()
        .unwrap()
}

fn dependency(facts: &[FileFact], from: &str, to: &str) -> Option<u64> {
    facts.iter().find(|f| f.name == from)?.dependencies.get(to).copied()
}

#[test]
fn scans_fake_c_tree() {
    let facts = scan(DependencyMode::All);
    let names: Vec<&str> = facts.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names.len(), 9);
    assert!(names.windows(2).all(|w| w[0] < w[1]), "facts should be sorted by name");
    assert!(names.contains(&"uct/ib/ib_verbs.h"));

    let verbs = facts.iter().find(|f| f.name == "uct/ib/ib_verbs.h").unwrap();
    assert!(verbs.macro_definitions.contains("UCT_IB_DEFAULT_PORT"));
    assert!(verbs.function_definitions.contains("uct_ib_query_port"));
    assert_eq!(dependency(&facts, "uct/ib/ib_iface.c", "uct/ib/ib_verbs.h"), Some(2));
    // <stdio.h> does not resolve under the source root
    let log = facts.iter().find(|f| f.name == "ucs/log.c").unwrap();
    assert_eq!(log.dependencies.keys().collect::<Vec<_>>(), vec!["ucs/log.h"]);
}

#[test]
fn dependency_modes_split_macro_and_function_counts() {
    let macros = scan(DependencyMode::MacrosOnly);
    let functions = scan(DependencyMode::FunctionsOnly);
    assert_eq!(dependency(&macros, "uct/ib/ib_iface.c", "uct/ib/ib_verbs.h"), Some(1));
    assert_eq!(dependency(&functions, "uct/ib/ib_iface.c", "uct/ib/ib_verbs.h"), Some(1));
}

#[test]
fn scanning_only_some_directories_limits_facts() {
    let facts = CScanner::new(fake_c_root(), interest(&["uct/ib"]), DependencyMode::All)
        .unwrap()
        .load_facts()
        .unwrap();
    assert_eq!(facts.len(), 2);
    assert!(facts.iter().all(|f| f.name.starts_with("uct/ib/")));
}

#[test]
fn hierarchy_over_scanned_tree_visits_children_before_parents() {
    let facts = scan(DependencyMode::All);
    let all: BTreeSet<String> = facts.iter().map(|f| f.name.clone()).collect();
    let h = run(facts, &options("ucx", &["ucs", "uct"], ClusterOptions::default()), true, 11);

    let keys: Vec<&str> = h.levels.iter().map(|l| l.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["ucs/datastruct", "ucs", "uct/base", "uct/ib", "uct/tcp", "uct", "ucx"]
    );
    assert_eq!(h.level("ucx").unwrap().depth, 0);
    assert_eq!(h.level("uct/ib").unwrap().depth, 2);

    // Every file ends up under exactly one top-level cluster
    let leaves = top_leaf_names(&h);
    assert_eq!(leaves.len(), all.len());
    assert_eq!(leaves.into_iter().collect::<BTreeSet<_>>(), all);
}

#[test]
fn joint_files_pair_headers_with_sources() {
    let facts = scan(DependencyMode::All);
    let h = run(facts, &options("ucx", &[], ClusterOptions::default()), true, 5);
    let base = h.level("uct/base").unwrap();
    // iface.h and iface.c arrive as one joined item
    let children: Vec<&str> = base
        .clusters
        .iter()
        .flat_map(|&c| h.arena.children(c))
        .map(|&id| h.arena.name(id))
        .collect();
    assert_eq!(children, vec!["uct/base/iface:joint"]);
}

#[test]
fn seeded_runs_are_reproducible() {
    let opts = options(
        "demo",
        &["core", "net"],
        ClusterOptions {
            random_samples: 3,
            ..ClusterOptions::default()
        },
    );
    let render = |seed| {
        let h = run(sample_facts(), &opts, false, seed);
        let mut out: Vec<u8> = Vec::new();
        write_levels_csv(&mut out, &level_reports(&h, "demo")).unwrap();
        String::from_utf8(out).unwrap()
    };
    assert_eq!(render(42), render(42));
}

#[test]
fn every_algorithm_covers_all_files() {
    for algorithm in ["local-search", "genetic", "local-search-weighted", "genetic-weighted"] {
        let cluster = ClusterOptions {
            algorithm: algorithm.parse().unwrap(),
            genetic: GeneticParams {
                population_size: 6,
                max_generations: 5,
            },
            ..ClusterOptions::default()
        };
        let h = run(sample_facts(), &options("demo", &["core", "net"], cluster), false, 9);
        assert_eq!(top_leaf_names(&h).len(), sample_facts().len(), "{algorithm}");
        if !algorithm.ends_with("weighted") {
            assert!(h.levels.iter().all(|l| (-1.0..=1.0).contains(&l.mean_mq)), "{algorithm}");
        }
    }
}

#[test]
fn fixed_cluster_count_bounds_each_level() {
    let cluster = ClusterOptions {
        cluster_count: ClusterCount::Fixed(2),
        ..ClusterOptions::default()
    };
    let h = run(sample_facts(), &options("demo", &["core"], cluster), false, 2);
    let core = h.level("core").unwrap();
    assert!(core.clusters.len() <= 2);
    assert!(h.level("net").is_none(), "net is not a directory of interest");
}

#[test]
fn heatmap_plots_shade_by_dependency() {
    let tmp = TempDir::new().unwrap();
    let cluster = ClusterOptions {
        cluster_count: ClusterCount::Heatmap,
        algorithm: Algorithm::GeneticWeighted,
        ..ClusterOptions::default()
    };
    let (arena, items) = prepare_items(sample_facts(), false);
    let mut sink = DotSink::new(tmp.path().join("graphs_heatmap"));
    run_hierarchy(
        arena,
        items,
        &options("demo", &["core", "net"], cluster),
        &mut sink,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();
    assert!(!sink.written().is_empty());
    let core = std::fs::read_to_string(sink.dir().join("core.dot")).unwrap();
    assert!(core.contains("\"core/alloc.h\" [fillcolor=\"#ff"));
}

#[test]
fn modular_quality_prefers_separated_clusters() {
    let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| (*s).to_string()).collect();
    let graph = IndexedGraph::from_edges(names, vec![(0, 1, 3), (2, 3, 2), (1, 2, 1)]);
    let good = modular_quality(&graph, &[vec![0, 1], vec![2, 3]], MqMode::Unweighted);
    let bad = modular_quality(&graph, &[vec![0, 2], vec![1, 3]], MqMode::Unweighted);
    assert!(good > bad);
    assert!((modular_quality(&graph, &[vec![0, 1, 2, 3]], MqMode::Weighted) - 1.0).abs() < f64::EPSILON);
}

#[test]
fn json_facts_load_what_was_written() {
    let tmp = TempDir::new().unwrap();
    let path = common::write_sample_facts(tmp.path());
    let loaded = JsonFacts::new(&path).load_facts().unwrap();
    assert_eq!(loaded, sample_facts());
}

#[test]
fn malformed_json_facts_report_the_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.json");
    std::fs::write(&path, "[{\"name\": ").unwrap();
    let err = JsonFacts::new(&path).load_facts().unwrap_err();
    assert!(matches!(err, Error::Json { .. }));
    assert!(err.to_string().contains("broken.json"));
}
