//! pairq CLI - learn, solve and compare pair-connection orders
//!
//! The agent's table lives for the process lifetime only, so every command
//! learns first and then reports.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{compare, learn, solve};
use config::Config;

#[derive(Parser)]
#[command(name = "pairq")]
#[command(author, version, about = "pairq - learn orders for connecting pairs of points", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    overrides: Overrides,
}

/// Command line overrides for configuration values
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Points per problem
    #[arg(short = 'n', long, global = true)]
    points: Option<usize>,

    /// Round coordinates to multiples of this before canonicalizing
    #[arg(short, long, global = true)]
    rounding: Option<i64>,

    /// Episodes to learn from
    #[arg(short, long, global = true)]
    episodes: Option<usize>,

    /// Generate problems inside a square of this width (0 = unconstrained)
    #[arg(long, global = true)]
    square_size: Option<u32>,

    /// Concurrent learning workers
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// RNG seed for reproducible runs
    #[arg(long, global = true, env = "PAIRQ_SEED")]
    seed: Option<u64>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(points) = self.points {
            config.agent.number_of_points = points;
        }
        if let Some(rounding) = self.rounding {
            config.agent.rounding_unit = rounding;
        }
        if let Some(episodes) = self.episodes {
            config.learning.episodes = episodes;
        }
        if let Some(size) = self.square_size {
            config.learning.square_size = size;
        }
        if let Some(workers) = self.workers {
            config.learning.workers = workers;
        }
        if self.seed.is_some() {
            config.agent.seed = self.seed;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Learn from generated problems and report success over the run
    Learn(learn::LearnArgs),

    /// Learn, then solve a problem read from a JSON file
    Solve(solve::SolveArgs),

    /// Learn, then compare the agent against baseline orderings
    Compare(compare::CompareArgs),

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from pairq.env file (before parsing args)
    pairq_core::util::load_env_file();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    cli.overrides.apply(&mut config);
    config.agent.validate()?;

    // Initialize logging based on verbosity
    let log_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pairq={log_level}").into());
    let json_logs = config.logging.json;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    match cli.command {
        Commands::Learn(args) => learn::run(args, &config, cli.json).await,
        Commands::Solve(args) => solve::run(args, config, cli.json).await,
        Commands::Compare(args) => compare::run(args, &config, cli.json).await,
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
