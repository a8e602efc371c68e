//! Master binary

use clap::{Parser, Subcommand};
use ringkv::common::Config;
use ringkv::Master;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ringkv-master")]
#[command(about = "ringkv master: HTTP front end and cluster coordinator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the master server
    Serve {
        /// Bind address for the HTTP API
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            // Config file first, CLI flags on top
            let mut config = Config::load().master.unwrap_or_default();
            if let Some(bind) = bind {
                config.bind_addr = bind.parse()?;
            }

            Master::new(config).serve().await?;
        }
    }

    Ok(())
}
