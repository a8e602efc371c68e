//! Storage node binary

use clap::Parser;
use ringkv::common::Config;
use ringkv::NodeServer;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ringkv-node")]
#[command(about = "ringkv storage node")]
struct Args {
    /// Node ID. When set, the node keeps a persistent identity across
    /// restarts and closes its storage on shutdown; when omitted, a random
    /// ID is generated and the storage is destroyed on exit.
    #[arg(long)]
    id: Option<String>,

    /// Bind address for the storage RPC service
    #[arg(long)]
    bind: Option<String>,

    /// Master HTTP address
    #[arg(long)]
    master: Option<String>,

    /// Root directory for local storage
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Config file first, CLI flags on top
    let mut config = Config::load().node.unwrap_or_default();
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse()?;
    }
    if let Some(master) = args.master {
        config.master_addr = master;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if args.id.is_some() {
        config.node_id = args.id;
    }

    NodeServer::new(config).serve().await?;

    Ok(())
}
