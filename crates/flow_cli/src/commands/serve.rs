//! Serve command - Run the HTTP API.

use anyhow::{Context, Result};
use clap::Args;

use flow_server::FlowConfig;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding the stock wireframe PNGs
    #[arg(long)]
    assets_dir: Option<std::path::PathBuf>,
}

pub async fn execute(args: ServeArgs, mut config: FlowConfig) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.assets_dir {
        config.server.assets_dir = Some(dir);
    }

    println!("🚀 FlowMaster API listening on http://{}", config.bind_addr());

    flow_server::run(config).await.context("HTTP server failed")
}
