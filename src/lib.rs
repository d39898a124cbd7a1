//! clustermq - Hierarchical MQ clustering of C file dependency graphs

// Core
pub mod cluster;
pub mod genetic;
pub mod graph;
pub mod hierarchy;
pub mod local_search;
pub mod mq;
pub mod nodes;

// Facts
pub mod discovery;
pub mod facts;
pub mod scan;

// Shared modules
pub mod cli_output;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod viz;

// Re-export main types and functions for easy access
pub use cluster::{Algorithm, ClusterCount, ClusterOptions, LevelClustering, cluster_component, cluster_graph};
pub use config::Config;
pub use discovery::{SourceKind, find_c_files, find_c_files_in};
pub use error::{Error, Result};
pub use facts::{DependencyMode, FactSource, FileFact, JsonFacts, recount_dependencies, write_facts_json};
pub use genetic::{GeneticParams, genetic_search};
pub use graph::{IndexedGraph, WeightedGraph};
pub use hierarchy::{Hierarchy, HierarchyOptions, LevelResult, prepare_items, run_hierarchy};
pub use local_search::local_search;
pub use mq::{MqMode, Partition, modular_quality};
pub use nodes::{ClusterNode, Node, NodeArena, NodeId};
pub use pipeline::{ClusterRun, FactInput, RunOutputs, run_cluster, scan_facts};
pub use report::{LevelReport, ProjectSummary, RunSummary, level_reports, project_summary};
pub use scan::CScanner;
pub use viz::{DotSink, NoPlot, PlotSink};
