use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use roofline_rs::{ChannelIndexing, HARDWARE_PROFILE_VAR};

mod logging;
mod report;

/// Roofline cost estimates for conv2d kernels.
#[derive(Parser)]
#[command(name = "roofline", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict naive and vectorized runtimes for a conv2d query
    Estimate {
        /// JSON query with input/weight sizes and strides, output sizes and itemsize
        #[arg(long)]
        query: PathBuf,
        /// JSON hardware profile
        #[arg(long, env = HARDWARE_PROFILE_VAR)]
        profile: Option<PathBuf>,
        /// Where channel counts are read from
        #[arg(long, value_enum)]
        channel_indexing: Option<IndexingArg>,
        /// Include every intermediate term of the model
        #[arg(long)]
        breakdown: bool,
    },
    /// Print the fixed-width description of a query
    Repr {
        #[arg(long)]
        query: PathBuf,
    },
    /// Print the fingerprint of a query
    Key {
        #[arg(long)]
        query: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IndexingArg {
    Source,
    Conv2d,
}

impl From<IndexingArg> for ChannelIndexing {
    fn from(arg: IndexingArg) -> Self {
        match arg {
            IndexingArg::Source => ChannelIndexing::Source,
            IndexingArg::Conv2d => ChannelIndexing::Conv2d,
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Estimate {
            query,
            profile,
            channel_indexing,
            breakdown,
        } => {
            let query = report::load_query(&query)?;
            let profile = report::load_profile(profile.as_deref())?;
            let report = report::estimate_report(
                query,
                profile,
                channel_indexing.map(ChannelIndexing::from),
                breakdown,
            )?;
            tracing::info!(key = %report.key, preferred = ?report.preferred, "estimated conv2d");
            let json =
                serde_json::to_string_pretty(&report).context("failed to encode report")?;
            println!("{json}");
        }
        Commands::Repr { query } => {
            let query = report::load_query(&query)?;
            println!("{}", report::repr_text(&query)?);
        }
        Commands::Key { query } => {
            let query = report::load_query(&query)?;
            println!("{}", report::key_line(&query));
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::init(&logging::LoggingConfig::from_env(cli.verbose)) {
        eprintln!("warning: {err:#}");
    }

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}
