use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use clustermq::cli_output::{print_run_summary, print_written};
use clustermq::{ClusterRun, Config, DependencyMode, Error, FactInput, Result, run_cluster, scan_facts, write_facts_json};
use std::path::PathBuf;

/// clustermq - Hierarchical MQ clustering of C file dependencies
#[derive(Parser, Debug)]
#[command(name = "clustermq", version, about = "Hierarchical MQ clustering of C file dependencies")]
struct Cli {
    /// Use specified config file instead of defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan C sources and write their file facts as JSON
    Scan {
        /// Source root; file identifiers are relative to it
        source_dir: PathBuf,

        /// Directories to scan, relative to the source root
        #[arg(short = 'd', long = "directories", num_args = 1.., required = true)]
        directories: Vec<String>,

        /// Output file (defaults to stdout)
        #[arg(long, short)]
        out: Option<PathBuf>,

        #[arg(long)]
        macros_only: bool,

        #[arg(long)]
        functions_only: bool,
    },
    /// Cluster a project directory by directory and write reports
    Cluster {
        #[arg(short, long)]
        project: String,

        /// JSON fact file
        #[arg(long, conflicts_with = "source_dir", required_unless_present = "source_dir")]
        facts: Option<PathBuf>,

        /// Source root to scan instead of reading a fact file
        #[arg(short, long)]
        source_dir: Option<PathBuf>,

        /// Directories of interest (defaults to every directory)
        #[arg(short = 'd', long = "directories", num_args = 1..)]
        directories: Vec<String>,

        #[arg(short, long)]
        outputs_dir: PathBuf,

        /// local-search, genetic, local-search-weighted, genetic-weighted (or 0-3)
        #[arg(short, long)]
        algorithm: Option<String>,

        /// dynamic, heatmap or a fixed count
        #[arg(long, allow_hyphen_values = true)]
        clusters: Option<String>,

        #[arg(long)]
        random_samples: Option<usize>,

        #[arg(long)]
        macros_only: bool,

        #[arg(long)]
        functions_only: bool,

        /// Cluster header/source companions separately
        #[arg(long)]
        no_joint_files: bool,

        #[arg(long)]
        max_plot_depth: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Skip the DOT plots
        #[arg(long)]
        no_plots: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Load config (from --config flag or default locations)
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Scan {
            source_dir,
            directories,
            out,
            macros_only,
            functions_only,
        } => {
            let mode = DependencyMode::from_flags(macros_only, functions_only)?.unwrap_or(config.dependency_mode);
            let facts = scan_facts(&source_dir, &directories, mode)?;
            match out {
                Some(path) => {
                    write_facts_json(&path, &facts)?;
                    print_written(&path);
                }
                None => {
                    let text = serde_json::to_string_pretty(&facts).map_err(|source| Error::Json {
                        path: PathBuf::from("-"),
                        source,
                    })?;
                    println!("{text}");
                }
            }
        }
        Commands::Cluster {
            project,
            facts,
            source_dir,
            directories,
            outputs_dir,
            algorithm,
            clusters,
            random_samples,
            macros_only,
            functions_only,
            no_joint_files,
            max_plot_depth,
            seed,
            no_plots,
        } => {
            if let Some(a) = algorithm {
                config.algorithm = a.parse()?;
            }
            if let Some(c) = clusters {
                config.cluster_count = c.parse()?;
            }
            if let Some(n) = random_samples {
                config.random_samples = n;
            }
            if let Some(mode) = DependencyMode::from_flags(macros_only, functions_only)? {
                config.dependency_mode = mode;
            }
            if no_joint_files {
                config.joint_files = false;
            }
            if let Some(d) = max_plot_depth {
                config.max_plot_depth = d;
            }
            if seed.is_some() {
                config.seed = seed;
            }

            let Some(input) = facts.map(FactInput::Json).or(source_dir.map(FactInput::Scan)) else {
                Cli::command()
                    .error(ErrorKind::MissingRequiredArgument, "one of --facts or --source-dir is required")
                    .exit();
            };
            let outputs = run_cluster(&ClusterRun {
                project: &project,
                input: &input,
                directories: &directories,
                outputs_dir: &outputs_dir,
                config: &config,
                plots: !no_plots,
            })?;

            print_run_summary(&project, &outputs.summary);
            print_written(&outputs.levels_csv);
            print_written(&outputs.summary_csv);
            for plot in &outputs.plots {
                print_written(plot);
            }
        }
    }
    Ok(())
}
