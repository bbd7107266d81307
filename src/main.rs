use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use schemenet::{report, sweep, Problem, RunConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Trains small sigmoid networks with weight-sharing schemes on toy problems
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// TOML file with run settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enumerate weight-sharing schemes
    #[arg(short, long)]
    schemes: bool,

    /// Amount of hidden layers [default: 2]
    #[arg(short, long)]
    layers: Option<usize>,

    /// Amount of nodes in each hidden layer, bias excluded [default: 2]
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Amount of epochs to run [default: 20000]
    #[arg(short, long)]
    epochs: Option<u64>,

    /// Learning rate [default: 0.5]
    #[arg(short, long)]
    alpha: Option<f64>,

    /// Seed of the network [default: 1230]
    #[arg(short = 'd', long)]
    seed: Option<u64>,

    /// Problem to train on [default: xor]
    #[arg(short, long, value_enum)]
    test: Option<Problem>,

    /// Print results to the terminal instead of to files
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Folder to store the results in [default: output]
    #[arg(short, long)]
    folder: Option<PathBuf>,

    /// Run every scheme over the configured seed range
    #[arg(long)]
    sweep: bool,

    /// Only enumerate schemes with at most this many distinct letters
    #[arg(long)]
    max_letters: Option<usize>,

    /// Stop after this many schemes
    #[arg(long)]
    limit: Option<usize>,

    /// Do not pull tied weights together during training
    #[arg(long)]
    no_pull: bool,

    /// Log every finished run
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Loads the config file, if any, then lets the flags override it.
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let config = match &self.config {
            Some(path) => RunConfig::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RunConfig::default(),
        };

        let config = self.apply(config);
        config.validate()?;

        Ok(config)
    }

    fn apply(self, mut config: RunConfig) -> RunConfig {
        config.use_schemes |= self.schemes;
        config.sweep |= self.sweep;
        config.pull &= !self.no_pull;
        config.to_file &= !self.stdout;

        if let Some(layers) = self.layers {
            config.hidden_layers = layers;
        }
        if let Some(nodes) = self.nodes {
            config.hidden_nodes = nodes;
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(test) = self.test {
            config.problem = test;
        }
        if let Some(folder) = self.folder {
            config.output_dir = folder;
        }
        if self.max_letters.is_some() {
            config.max_letters = self.max_letters;
        }
        if self.limit.is_some() {
            config.scheme_limit = self.limit;
        }

        config
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.into_config()?;

    info!(
        problem = config.problem.name(),
        layers = config.hidden_layers,
        nodes = config.hidden_nodes,
        epochs = config.epochs,
        alpha = config.alpha,
        "training"
    );

    let outcomes = sweep::sweep(&config)?;
    let summary = report::write_report(&config, &outcomes)?;

    if let Some(best) = &summary.lowest {
        info!(
            scheme = %best.scheme.as_ref().map(ToString::to_string).unwrap_or_default(),
            error = best.total_error,
            "lowest error"
        );
    }

    Ok(())
}
