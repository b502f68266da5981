use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "adloom")]
#[command(version, about = "Multi-agent marketing campaign orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to adloom.toml. Defaults to ./adloom.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a campaign from a JSON brief
    Run {
        /// Path to the campaign brief (JSON object)
        brief: PathBuf,

        /// Where to write the final campaign state
        #[arg(short, long, default_value = "campaign.json")]
        output: PathBuf,

        /// Override the wall-clock budget in seconds
        #[arg(long)]
        max_duration: Option<u64>,

        /// Override the revision cap
        #[arg(long)]
        max_revisions: Option<u32>,
    },
    /// Print the compiled workflow topology
    Graph,
    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Write a default adloom.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "adloom=debug" } else { "adloom=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Run {
            brief,
            output,
            max_duration,
            max_revisions,
        } => {
            cmd::cmd_run(
                brief,
                cli.config.as_deref(),
                output,
                *max_duration,
                *max_revisions,
            )
            .await?;
        }
        Commands::Graph => cmd::cmd_graph(cli.config.as_deref())?,
        Commands::Config { command } => match command.clone().unwrap_or(ConfigCommands::Show) {
            ConfigCommands::Show => cmd::cmd_config_show(cli.config.as_deref())?,
            ConfigCommands::Init => cmd::cmd_config_init()?,
        },
    }

    Ok(())
}
