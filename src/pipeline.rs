//! End-to-end runs behind the CLI subcommands

use crate::cli_output::{write_levels_csv, write_project_summary_csv};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::facts::{DependencyMode, FactSource, FileFact, JsonFacts, recount_dependencies};
use crate::hierarchy::{HierarchyOptions, prepare_items, run_hierarchy};
use crate::report::{RunSummary, level_reports, project_summary};
use crate::scan::CScanner;
use crate::viz::{DotSink, NoPlot, PlotSink};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where a run's file facts come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactInput {
    Json(PathBuf),
    Scan(PathBuf),
}

pub struct ClusterRun<'a> {
    pub project: &'a str,
    pub input: &'a FactInput,
    /// Directories of interest; empty means every directory
    pub directories: &'a [String],
    pub outputs_dir: &'a Path,
    pub config: &'a Config,
    pub plots: bool,
}

#[derive(Debug)]
pub struct RunOutputs {
    pub output_dir: PathBuf,
    pub levels_csv: PathBuf,
    pub summary_csv: PathBuf,
    pub plots: Vec<PathBuf>,
    pub summary: RunSummary,
}

/// `<outputs>/<project>_outputs/<mode>`
pub fn output_dir(outputs_dir: &Path, project: &str, mode: DependencyMode) -> PathBuf {
    outputs_dir.join(format!("{project}_outputs")).join(mode.dir_name())
}

/// Suffix shared by the plot directory and the levels CSV
fn run_label(config: &Config) -> String {
    if config.cluster_count.is_heatmap() {
        "heatmap".to_string()
    } else {
        config.algorithm.as_str().to_string()
    }
}

pub fn scan_facts(source_dir: &Path, directories: &[String], mode: DependencyMode) -> Result<Vec<FileFact>> {
    CScanner::new(source_dir, directories.to_vec(), mode)?.load_facts()
}

fn load_facts(run: &ClusterRun<'_>, output_dir: &Path) -> Result<Vec<FileFact>> {
    let mode = run.config.dependency_mode;
    match run.input {
        FactInput::Json(path) => {
            let mut facts = JsonFacts::new(path).load_facts()?;
            if mode != DependencyMode::All {
                recount_dependencies(&mut facts, mode);
            }
            Ok(facts)
        }
        FactInput::Scan(source_dir) => {
            let scanner = CScanner::new(source_dir, run.directories.to_vec(), mode)?;
            scanner.load_facts_cached(&output_dir.join(format!("{}_facts.bin", run.project)))
        }
    }
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| Error::io(path, e))
}

fn write_with(path: &Path, f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> Result<()> {
    let mut out = create_writer(path)?;
    f(&mut out).and_then(|()| out.flush()).map_err(|e| Error::io(path, e))
}

/// Cluster a project and write its reports.
pub fn run_cluster(run: &ClusterRun<'_>) -> Result<RunOutputs> {
    let config = run.config;
    let output_dir = output_dir(run.outputs_dir, run.project, config.dependency_mode);
    std::fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;

    let facts = load_facts(run, &output_dir)?;
    tracing::info!(project = run.project, files = facts.len(), "loaded file facts");

    let summary_csv = output_dir.join(format!("{}_files_summary.csv", run.project));
    let totals = project_summary(run.project, &facts, run.directories);
    write_with(&summary_csv, |out| write_project_summary_csv(out, &totals))?;

    let label = run_label(config);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let opts = HierarchyOptions {
        project: run.project.to_string(),
        directories: run.directories.to_vec(),
        cluster: config.cluster_options(),
        max_plot_depth: config.max_plot_depth,
    };
    let (arena, items) = prepare_items(facts, config.joint_files);

    let mut dot_sink = DotSink::new(output_dir.join(format!("graphs_{label}")));
    let mut no_plot = NoPlot;
    let sink: &mut dyn PlotSink = if run.plots { &mut dot_sink } else { &mut no_plot };
    let hierarchy = run_hierarchy(arena, items, &opts, sink, &mut rng)?;

    let reports = level_reports(&hierarchy, run.project);
    let levels_csv = output_dir.join(format!("{}_clusters_{label}.csv", run.project));
    write_with(&levels_csv, |out| write_levels_csv(out, &reports))?;

    Ok(RunOutputs {
        output_dir,
        levels_csv,
        summary_csv,
        plots: dot_sink.written().to_vec(),
        summary: RunSummary::from_levels(&reports),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Algorithm, ClusterCount};
    use crate::facts::write_facts_json;
    use tempfile::TempDir;

    fn sample_facts() -> Vec<FileFact> {
        vec![
            FileFact::new("lib/a.c").with_lines(40).with_dependency("lib/a.h", 3),
            FileFact::new("lib/a.h").with_lines(10),
            FileFact::new("lib/b.c").with_lines(25).with_dependency("lib/a.h", 1),
            FileFact::new("app/main.c").with_lines(12).with_dependency("lib/a.h", 2),
        ]
    }

    fn seeded() -> Config {
        Config {
            seed: Some(7),
            ..Config::default()
        }
    }

    #[test]
    fn test_output_dir_layout() {
        let dir = output_dir(Path::new("out"), "ucx", DependencyMode::MacrosOnly);
        assert_eq!(dir, Path::new("out").join("ucx_outputs").join("macros_only"));
    }

    #[test]
    fn test_run_label_prefers_heatmap() {
        let mut config = Config::default();
        assert_eq!(run_label(&config), "local-search");
        config.algorithm = Algorithm::GeneticWeighted;
        assert_eq!(run_label(&config), "genetic-weighted");
        config.cluster_count = ClusterCount::Heatmap;
        assert_eq!(run_label(&config), "heatmap");
    }

    #[test]
    fn test_run_cluster_from_json_writes_reports() {
        let tmp = TempDir::new().unwrap();
        let facts_path = tmp.path().join("facts.json");
        write_facts_json(&facts_path, &sample_facts()).unwrap();
        let outputs = tmp.path().join("out");
        let config = seeded();
        let dirs = vec!["lib".to_string(), "app".to_string()];
        let input = FactInput::Json(facts_path);
        let result = run_cluster(&ClusterRun {
            project: "demo",
            input: &input,
            directories: &dirs,
            outputs_dir: &outputs,
            config: &config,
            plots: true,
        })
        .unwrap();

        assert!(result.output_dir.ends_with("demo_outputs/all_dependencies"));
        let levels = std::fs::read_to_string(&result.levels_csv).unwrap();
        assert!(levels.starts_with(crate::cli_output::LEVELS_CSV_HEADER));
        assert!(levels.contains("demo:"));
        let summary = std::fs::read_to_string(&result.summary_csv).unwrap();
        assert!(summary.contains("demo all,4,87"));
        assert!(!result.plots.is_empty());
        assert!(result.plots.iter().all(|p| p.exists()));
        assert_eq!(result.summary.levels, 3);
    }

    #[test]
    fn test_run_cluster_without_plots_writes_no_dot_files() {
        let tmp = TempDir::new().unwrap();
        let facts_path = tmp.path().join("facts.json");
        write_facts_json(&facts_path, &sample_facts()).unwrap();
        let config = seeded();
        let input = FactInput::Json(facts_path);
        let result = run_cluster(&ClusterRun {
            project: "demo",
            input: &input,
            directories: &[],
            outputs_dir: tmp.path(),
            config: &config,
            plots: false,
        })
        .unwrap();
        assert!(result.plots.is_empty());
        assert!(!result.output_dir.join("graphs_local-search").exists());
    }

    #[test]
    fn test_run_cluster_missing_facts_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let config = seeded();
        let input = FactInput::Json(tmp.path().join("missing.json"));
        let err = run_cluster(&ClusterRun {
            project: "demo",
            input: &input,
            directories: &[],
            outputs_dir: tmp.path(),
            config: &config,
            plots: false,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_run_cluster_scans_sources_and_caches_facts() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("lib")).unwrap();
        std::fs::write(src.join("lib/util.h"), "#define UTIL_MAX 4\nint util_add(int a, int b);\n").unwrap();
        std::fs::write(
            src.join("lib/util.c"),
            "#include \"lib/util.h\"\nint util_add(int a, int b) { return a + b; }\n",
        )
        .unwrap();
        std::fs::write(
            src.join("lib/use.c"),
            "#include \"util.h\"\nint twice(int a) { return util_add(a, UTIL_MAX); }\n",
        )
        .unwrap();
        let config = seeded();
        let dirs = vec!["lib".to_string()];
        let input = FactInput::Scan(src);
        let run = ClusterRun {
            project: "demo",
            input: &input,
            directories: &dirs,
            outputs_dir: &tmp.path().join("out"),
            config: &config,
            plots: false,
        };
        let first = run_cluster(&run).unwrap();
        assert!(first.output_dir.join("demo_facts.bin").exists());
        let second = run_cluster(&run).unwrap();
        assert_eq!(
            std::fs::read_to_string(first.summary_csv).unwrap(),
            std::fs::read_to_string(second.summary_csv).unwrap()
        );
    }
}
