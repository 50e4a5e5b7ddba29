//! CLI for the SDM download queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sdm_core::config;
use std::path::PathBuf;

use commands::{run_config, run_get, GetOptions};

/// Top-level CLI for the SDM download queue.
#[derive(Debug, Parser)]
#[command(name = "sdm")]
#[command(about = "SDM: prioritized download queue", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of ~/.config/sdm/config.toml.
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs through the queue.
    Get {
        /// Direct HTTP/HTTPS URLs, queued in the order given.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Priority for these downloads (lower runs first).
        #[arg(short, long, default_value = "5")]
        priority: u32,
        /// Number of dispatcher threads (overrides config).
        #[arg(short = 'j', long, value_name = "N")]
        dispatchers: Option<usize>,
        /// Directory to save into (overrides config; default current directory).
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Show the config file location and effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match cli.config_file.as_deref() {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                urls,
                priority,
                dispatchers,
                dir,
            } => {
                let opts = GetOptions {
                    priority,
                    dispatchers,
                    dir,
                };
                run_get(&cfg, urls, opts).await?;
            }
            CliCommand::Config => run_config(&cfg, cli.config_file.as_deref())?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
