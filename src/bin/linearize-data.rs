//! linearize-data CLI tool
//!
//! Construct a linear, no-fork version of the chain from a node's block files.
//!
//! Settings come from an optional `key=value` config file; flags (or
//! `LINEARIZE_*` environment variables, also read from `.env`) override it.

use anyhow::{Context, Result};
use blk_linearize::{linearize, LinearizeConfig, Settings};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "linearize-data")]
#[command(about = "Construct a linear, no-fork version of the chain from blk*.dat files")]
struct Cli {
    /// Config file with `key=value` lines
    config: Option<PathBuf>,

    /// Directory holding the input blk*.dat files
    #[arg(long, env = "LINEARIZE_INPUT")]
    input: Option<String>,

    /// Output directory for numbered blk*.dat files
    #[arg(long, env = "LINEARIZE_OUTPUT", conflicts_with = "output_file")]
    output: Option<String>,

    /// Single output file
    #[arg(long, env = "LINEARIZE_OUTPUT_FILE")]
    output_file: Option<String>,

    /// Canonical hash list, one hash per line
    #[arg(long, env = "LINEARIZE_HASHLIST")]
    hashlist: Option<String>,

    /// Start a new output file at each calendar month
    #[arg(
        long,
        env = "LINEARIZE_SPLIT_TIMESTAMP",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    split_timestamp: bool,

    /// Size cap per output file in bytes
    #[arg(long, env = "LINEARIZE_MAX_OUT_SZ")]
    max_out_sz: Option<String>,

    /// Network magic, hex encoded
    #[arg(long, env = "LINEARIZE_NETMAGIC")]
    netmagic: Option<String>,

    /// Genesis block hash that must be in the hash list
    #[arg(long, env = "LINEARIZE_GENESIS_HASH")]
    genesis_hash: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?,
            None => Settings::default(),
        };

        // An output given on the command line replaces either kind from the file
        if self.output.is_some() || self.output_file.is_some() {
            settings.remove("output");
            settings.remove("output_file");
        }

        let overrides = [
            ("input", &self.input),
            ("output", &self.output),
            ("output_file", &self.output_file),
            ("hashlist", &self.hashlist),
            ("max_out_sz", &self.max_out_sz),
            ("netmagic", &self.netmagic),
            ("genesis_hash", &self.genesis_hash),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                settings.set(key, value.as_str());
            }
        }
        if self.split_timestamp {
            settings.set("split_timestamp", "1");
        }
        Ok(settings)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = LinearizeConfig::from_settings(&cli.settings()?)?;
    let start_time = Instant::now();

    let summary = linearize(&config)?;

    tracing::info!(
        "Time: {:.1}s ({} records read from {} input file(s))",
        start_time.elapsed().as_secs_f64(),
        summary.records_read,
        summary.input_files
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    // Optional .env is loaded before clap reads LINEARIZE_* variables
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
