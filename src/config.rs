//! Configuration management for clustermq

use crate::cluster::{Algorithm, ClusterCount, ClusterOptions};
use crate::error::Result;
use crate::facts::DependencyMode;
use crate::genetic::GeneticParams;
use std::path::Path;

/// Default run parameters
pub mod defaults {
    pub const RANDOM_SAMPLES: usize = 1;
    pub const POPULATION_SIZE: usize = 10;
    pub const MAX_GENERATIONS: usize = 100;
    pub const MAX_PLOT_DEPTH: usize = 3;
    pub const JOINT_FILES: bool = true;
    pub const CONFIG_FILE: &str = ".clustermqconfig";
}

/// Run parameters for a clustering run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub algorithm: Algorithm,
    pub cluster_count: ClusterCount,
    pub random_samples: usize,
    pub population_size: usize,
    pub max_generations: usize,
    pub max_plot_depth: usize,
    pub dependency_mode: DependencyMode,
    pub joint_files: bool,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::LocalSearch,
            cluster_count: ClusterCount::Dynamic,
            random_samples: defaults::RANDOM_SAMPLES,
            population_size: defaults::POPULATION_SIZE,
            max_generations: defaults::MAX_GENERATIONS,
            max_plot_depth: defaults::MAX_PLOT_DEPTH,
            dependency_mode: DependencyMode::All,
            joint_files: defaults::JOINT_FILES,
            seed: None,
        }
    }
}

impl Config {
    /// Load config from files, with later files overriding earlier ones.
    /// Loads from: ~/.clustermqconfig, ./.clustermqconfig
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = std::env::var_os("HOME") {
            let home_config = Path::new(&home).join(defaults::CONFIG_FILE);
            if let Ok(content) = std::fs::read_to_string(&home_config) {
                config.merge_from_toml(&content)?;
            }
        }

        if let Ok(content) = std::fs::read_to_string(defaults::CONFIG_FILE) {
            config.merge_from_toml(&content)?;
        }

        Ok(config)
    }

    /// Load config from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(content) = std::fs::read_to_string(path) {
            config.merge_from_toml(&content)?;
        } else {
            tracing::warn!(path = %path.display(), "could not read config file");
        }
        Ok(config)
    }

    /// Merge values from a TOML string. Malformed TOML and ill-typed values
    /// are ignored; an unknown strategy name is not.
    pub fn merge_from_toml(&mut self, content: &str) -> Result<()> {
        let Ok(table) = content.parse::<toml::Table>() else {
            tracing::warn!("ignoring malformed config file");
            return Ok(());
        };

        if let Some(cluster) = table.get("cluster").and_then(|v| v.as_table()) {
            self.apply_cluster(cluster)?;
        }
        if let Some(facts) = table.get("facts").and_then(|v| v.as_table()) {
            self.apply_facts(facts);
        }
        Ok(())
    }

    /// Apply values from [cluster] section
    fn apply_cluster(&mut self, table: &toml::Table) -> Result<()> {
        if let Some(v) = get_tag(table, "algorithm") {
            self.algorithm = v.parse()?;
        }
        if let Some(v) = get_tag(table, "clusters").and_then(|v| v.parse().ok()) {
            self.cluster_count = v;
        }
        if let Some(v) = get_usize(table, "random_samples") {
            self.random_samples = v;
        }
        if let Some(v) = get_usize(table, "population_size") {
            self.population_size = v;
        }
        if let Some(v) = get_usize(table, "max_generations") {
            self.max_generations = v;
        }
        if let Some(v) = get_usize(table, "max_plot_depth") {
            self.max_plot_depth = v;
        }
        if let Some(v) = get_usize(table, "seed") {
            self.seed = Some(v as u64);
        }
        Ok(())
    }

    /// Apply values from [facts] section
    fn apply_facts(&mut self, table: &toml::Table) {
        if let Some(v) = table
            .get("dependency_mode")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
        {
            self.dependency_mode = v;
        }
        if let Some(v) = table.get("joint_files").and_then(toml::Value::as_bool) {
            self.joint_files = v;
        }
    }

    pub fn cluster_options(&self) -> ClusterOptions {
        ClusterOptions {
            algorithm: self.algorithm,
            cluster_count: self.cluster_count,
            random_samples: self.random_samples,
            genetic: GeneticParams {
                population_size: self.population_size,
                max_generations: self.max_generations,
            },
        }
    }
}

fn get_usize(table: &toml::Table, key: &str) -> Option<usize> {
    table
        .get(key)
        .and_then(toml::Value::as_integer)
        .filter(|&v| v >= 0) // Ignore negative values
        .map(|v| v as usize)
}

/// A string or integer value as text; strategy and cluster-count tags accept both.
fn get_tag(table: &toml::Table, key: &str) -> Option<String> {
    match table.get(key)? {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}
