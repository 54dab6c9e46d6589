use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::LoggerConfig;
use crate::models::IndexState;
use crate::plugin::LoggerPlugin;
use crate::utils::format_path_with_tilde;

#[derive(Parser)]
#[command(name = "transcript-indexer")]
#[command(version = "0.1.0")]
#[command(about = "Maintain the full-text search index over transcript logs", long_about = None)]
pub struct Cli {
    /// Log base directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub logs_dir: Option<PathBuf>,

    /// Index directory (defaults to the platform cache directory)
    #[arg(long, global = true)]
    pub index_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Re-index every transcript from scratch
    Rebuild,
    /// Search the index and print matching transcript identifiers
    Search {
        /// Terms to match (all must appear)
        query: String,
    },
    /// Show index statistics
    Stats,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = LoggerConfig {
        log_base_dir: cli.logs_dir.clone(),
        index_dir: cli.index_dir.clone(),
        ..Default::default()
    };

    match &cli.command {
        Some(Commands::Rebuild) => rebuild(config)?,
        Some(Commands::Search { query }) => search(config, query)?,
        Some(Commands::Stats) => show_stats(config)?,
        None => {
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn rebuild(config: LoggerConfig) -> Result<()> {
    let plugin = LoggerPlugin::new(config)?;
    plugin.start()?;
    if plugin.index_state() == IndexState::Disabled {
        anyhow::bail!("Indexing is disabled; nothing to rebuild");
    }

    let marked = plugin.mark_all_dirty()?;
    eprintln!("Re-indexing {} transcripts", marked);

    while !plugin.wait_until_idle(Duration::from_millis(500)) {
        let progress = plugin.indexing_progress();
        eprintln!("Indexed {}", progress);
    }

    let progress = plugin.indexing_progress();
    eprintln!("Done: {} transcripts indexed", progress.logs_indexed);
    plugin.shutdown();
    Ok(())
}

fn search(config: LoggerConfig, query: &str) -> Result<()> {
    let plugin = LoggerPlugin::new(config)?;
    plugin.start()?;

    let matches = plugin.search(query);
    if matches.is_empty() {
        eprintln!("No transcripts match '{}'", query);
    } else {
        for id in &matches {
            println!("{}", id);
        }
        eprintln!("{} transcripts match", matches.len());
    }

    plugin.shutdown();
    Ok(())
}

fn show_stats(config: LoggerConfig) -> Result<()> {
    let logs_dir = config.resolved_log_base_dir()?;
    let index_dir = config.resolved_index_dir()?;
    let plugin = LoggerPlugin::new(config)?;
    plugin.start()?;

    let progress = plugin.indexing_progress();
    println!("Transcript Index Statistics");
    println!("===========================");
    println!("State: {}", plugin.index_state());
    println!("Pending re-index: {}", progress.logs_to_index - progress.logs_indexed);
    println!();
    println!("Log directory: {}", format_path_with_tilde(&logs_dir));
    println!("Index directory: {}", format_path_with_tilde(&index_dir));

    plugin.shutdown();
    Ok(())
}
