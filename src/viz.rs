//! Graphviz output for clustered levels

use crate::error::{Error, Result};
use crate::graph::WeightedGraph;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

const PALETTE: &[&str] = &[
    "#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3", "#fdb462", "#b3de69", "#fccde5",
    "#d9d9d9", "#bc80bd", "#ccebc5", "#ffed6f",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coloring {
    /// Fill each node with its cluster's color
    Clusters,
    /// Shade each node by inbound dependency weight
    Dependencies,
}

/// Everything a sink needs to draw one level
#[derive(Debug, Clone, Copy)]
pub struct LevelPlot<'a> {
    pub key: &'a str,
    pub coloring: Coloring,
    pub graph: &'a WeightedGraph,
    pub clusters: &'a BTreeMap<usize, Vec<String>>,
}

pub trait PlotSink {
    fn render(&mut self, plot: &LevelPlot<'_>) -> Result<()>;
}

/// Discards every plot
pub struct NoPlot;

impl PlotSink for NoPlot {
    fn render(&mut self, _plot: &LevelPlot<'_>) -> Result<()> {
        Ok(())
    }
}

/// Writes one `.dot` file per level into a directory
pub struct DotSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn file_for(&self, key: &str) -> PathBuf {
        let stem = if key.is_empty() { "root".to_string() } else { key.replace('/', "_") };
        self.dir.join(format!("{stem}.dot"))
    }
}

impl PlotSink for DotSink {
    fn render(&mut self, plot: &LevelPlot<'_>) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.file_for(plot.key);
        let mut buf: Vec<u8> = Vec::new();
        write_level_dot(&mut buf, plot).map_err(|e| Error::io(&path, e))?;
        std::fs::write(&path, buf).map_err(|e| Error::io(&path, e))?;
        tracing::debug!(path = %path.display(), "wrote level plot");
        self.written.push(path);
        Ok(())
    }
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[allow(clippy::cast_precision_loss)]
fn pen_width(weight: u64, max_weight: u64) -> f64 {
    3.0 * (weight as f64 + 1.0) / (max_weight as f64 + 1.0)
}

/// Grey level for a node: darker with more inbound weight
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn heat_color(inbound: u64, max_inbound: u64) -> String {
    let ratio = if max_inbound == 0 { 0.0 } else { inbound as f64 / max_inbound as f64 };
    let level = (255.0 - ratio * 200.0).round() as u8;
    format!("#ff{level:02x}{level:02x}")
}

fn write_level_dot(out: &mut dyn Write, plot: &LevelPlot<'_>) -> std::io::Result<()> {
    writeln!(out, "graph \"{}\" {{", dot_escape(plot.key))?;
    writeln!(out, "  node [shape=ellipse, style=filled];")?;

    let label_of: BTreeMap<&str, usize> = plot
        .clusters
        .iter()
        .flat_map(|(&label, members)| members.iter().map(move |m| (m.as_str(), label)))
        .collect();
    let max_inbound = plot.graph.inbound().values().copied().max().unwrap_or(0);

    // Keep output stable for diffs: sort nodes/edges.
    let nodes: BTreeSet<&str> = plot.graph.connected_nodes();
    for n in &nodes {
        let color = match plot.coloring {
            Coloring::Clusters => label_of
                .get(n)
                .map_or("#ffffff", |&label| PALETTE[label % PALETTE.len()])
                .to_string(),
            Coloring::Dependencies => heat_color(plot.graph.inbound_weight(n), max_inbound),
        };
        writeln!(out, "  \"{}\" [fillcolor=\"{}\"];", dot_escape(n), color)?;
    }

    let max_weight = plot.graph.edges().iter().map(|e| e.weight).max().unwrap_or(0);
    let mut edges: Vec<_> = plot.graph.edges().iter().collect();
    edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
    for e in edges {
        writeln!(
            out,
            "  \"{}\" -- \"{}\" [penwidth={:.3}, label=\"{}\"];",
            dot_escape(&e.from),
            dot_escape(&e.to),
            pen_width(e.weight, max_weight),
            e.weight
        )?;
    }
    writeln!(out, "}}")
}
