use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fspm_core::{
    simulate_season, simulate_step, AppleTree, Environment, MetamerId, SeasonConfig, TreeSpec,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fspm")]
#[command(about = "Apple tree growth simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a seasonal simulation from a request file
    Run {
        /// Path to request file (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Output directory for summary and snapshot (optional)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a fixed number of steps under one environment
    Step {
        /// Path to request file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of steps to run
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
    /// Dump the default run request to stdout
    DumpDefaultConfig,
}

/// Input of `fspm run`.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
struct RunRequest {
    tree: TreeSpec,
    /// Metamers pruned, in order, before the season starts.
    prune: Vec<MetamerId>,
    season: SeasonConfig,
}

/// Input of `fspm step`.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
struct StepRequest {
    tree: TreeSpec,
    environment: Environment,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    let file = File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn build_tree(spec: &TreeSpec, prune: &[MetamerId]) -> Result<AppleTree> {
    let mut tree = spec.build().context("invalid tree specification")?;
    for &target in prune {
        tree.prune(target)
            .with_context(|| format!("failed to prune metamer {target}"))?;
    }
    Ok(tree)
}

fn run(config: &Path, out: Option<PathBuf>) -> Result<()> {
    let request: RunRequest = load_json(config)?;
    request
        .season
        .validate()
        .context("season config validation error")?;
    let mut tree = build_tree(&request.tree, &request.prune)?;

    info!(path = %config.display(), days = request.season.days, "simulating season");
    let summary = simulate_season(&mut tree, &request.season)?;

    if let Some(out_dir) = out {
        std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
        write_json(&out_dir, "summary.json", &summary)?;
        write_json(&out_dir, "snapshot.json", &tree.snapshot())?;
        println!("Run complete. Results saved to {:?}", out_dir);
    } else {
        println!(
            "Run complete. Assimilation: {:.2}, new metamers: {}, live metamers: {}",
            summary.total_assimilation,
            summary.new_metamers.len(),
            tree.live_count()
        );
    }
    Ok(())
}

fn step(config: Option<&Path>, steps: usize) -> Result<()> {
    let request: StepRequest = match config {
        Some(path) => load_json(path)?,
        None => StepRequest::default(),
    };
    request
        .environment
        .validate()
        .context("environment validation error")?;
    let mut tree = build_tree(&request.tree, &[])?;

    for _ in 0..steps {
        let summary = simulate_step(&mut tree, &request.environment);
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::DumpDefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&RunRequest::default())?);
        }
        Commands::Run { config, out } => run(&config, out)?,
        Commands::Step { config, steps } => step(config.as_deref(), steps)?,
    }
    Ok(())
}
