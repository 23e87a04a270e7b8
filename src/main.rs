use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "reviewd")]
#[command(version, about = "Structured code review service with a heuristic fallback")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the review HTTP server
    Serve {
        /// Port to serve on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    reviewd::config::load_dotenv_files();
    init_tracing();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Serve { port, bind } => cmd::cmd_serve(*port, bind.clone()).await?,
        Commands::Config { command } => cmd::cmd_config(command.clone())?,
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reviewd=info".into()),
        )
        .init();
}
