//! # AgentOS CLI
//!
//! Scriptable access to the AgentOS core layer: agent metadata, installed LLM
//! bridges and markdown splitting.
//!
//! Every command prints JSON on stdout. Logs go to stderr. Core failures are
//! printed to stderr as an `ErrorEnvelope` JSON line with exit code 2.
//!
//! ```text
//! <home>/
//!     ├── config.toml        optional
//!     ├── agents/<id>.json
//!     └── bridges/<id>.json, bridges/_active.json
//! ```

mod agents;
mod bridges;
mod config;
mod output;
mod split;

use agents::AgentsCommand;
use anyhow::Result;
use bridges::BridgesCommand;
use clap::{Parser, Subcommand};
use split::SplitArgs;
use std::path::PathBuf;

pub use config::{resolve_home, AgentOsConfig, CONFIG_FILE_NAME, HOME_ENV};
pub use output::{report_error, CORE_ERROR_EXIT};

#[derive(Parser)]
#[command(name = "agentos")]
#[command(about = "Manage AgentOS agents, bridges and knowledge chunks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (overrides AGENTOS_HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log errors only
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Agent metadata records
    #[command(subcommand)]
    Agents(AgentsCommand),

    /// Installed LLM bridges
    #[command(subcommand)]
    Bridges(BridgesCommand),

    /// Split a markdown file into knowledge chunks
    Split(SplitArgs),
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let home = resolve_home(cli.home.clone())?;
    let config = AgentOsConfig::load(&home)?;
    log::debug!("Using AgentOS home {}", home.display());

    match cli.command {
        Commands::Agents(command) => agents::run(command, &config.agents_dir(&home)).await,
        Commands::Bridges(command) => {
            bridges::run(command, &config.bridges_base_dir(&home)).await
        }
        Commands::Split(args) => split::run(args, config.splitter),
    }
}
