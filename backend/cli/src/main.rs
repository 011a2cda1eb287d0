mod check_cmd;
mod run_cmd;
mod serve_cmd;
mod wiring;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use slackbud_config::{config_dir, config_file_path, load_and_prepare, SlackBudConfig};

#[derive(Parser)]
#[command(name = "slackbud")]
#[command(about = "SlackBud: chat-ops command bot for Slack")]
#[command(version)]
struct Cli {
    /// Config file (default: $SLACKBUD_CONFIG_DIR/config.yaml or ~/.slackbud/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Slack webhook server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one command line locally and print the response JSON
    Run {
        /// Slack user id to run as
        #[arg(short, long)]
        user: String,
        /// Display name for the user
        #[arg(short, long, default_value = "")]
        name: String,
        /// Environment name (default: slack.default_environment)
        #[arg(short, long)]
        env: Option<String>,
        /// Use a throwaway in-memory store instead of the configured database
        #[arg(long)]
        in_memory: bool,
        /// The command line, e.g. "cmd history -n 5"
        line: String,
    },
    /// Validate the config and print the effective (redacted) settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&path).await?;

    match cli.command {
        Commands::Serve { port } => {
            init_logging(&config)?;
            serve_cmd::run(config, port).await?;
        }
        Commands::Run {
            user,
            name,
            env,
            in_memory,
            line,
        } => {
            init_logging(&config)?;
            run_cmd::run(&config, run_cmd::RunArgs {
                user,
                name,
                env,
                in_memory,
                line,
            })
            .await?;
        }
        Commands::CheckConfig => check_cmd::run(&path, &config).await?,
    }

    Ok(())
}

fn init_logging(config: &SlackBudConfig) -> Result<()> {
    let dir = config
        .logging
        .dir
        .clone()
        .unwrap_or_else(|| config_dir().join("logs"));
    slackbud_logging::init_logger(dir, &config.logging.level)
}
