mod address;
mod config;
mod dedup;
mod engine;
mod geocode;
mod identity;
mod models;
mod notify;
mod pipeline;
mod scrapers;
mod storage;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "auction-scout", version, about = "Property listing scraper with auction cross-checking")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "config/scout.yaml")]
    config: PathBuf,

    /// Cap on pages fetched per source and pass.
    #[arg(short = 'n', long)]
    pages: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every source, then remove listings that duplicate auctions.
    Run,
    /// Scrape one source (or all of them) without the dedup sweep.
    Scrape {
        #[arg(long)]
        source: Option<String>,
    },
    /// Only remove listings that duplicate auction data already stored.
    Dedup,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    let pipeline = Pipeline::new(config, cli.pages);

    let clean = match cli.command {
        Command::Run => pipeline.run_all().await?,
        Command::Scrape { source } => pipeline.scrape(source.as_deref()).await?,
        Command::Dedup => pipeline.dedup().await?,
    };

    if !clean {
        process::exit(1);
    }
    Ok(())
}
