//! Clear command - Delete a stored session.

use anyhow::Result;
use clap::Args;
use tracing::info;

use flow_server::FlowConfig;
use flow_store::StoreError;

#[derive(Args)]
pub struct ClearArgs {
    /// Session id to delete
    id: String,
}

pub async fn execute(args: ClearArgs, config: FlowConfig) -> Result<()> {
    let store = config.open_store();
    if !store.clear(&args.id)? {
        return Err(StoreError::SessionNotFound(args.id).into());
    }
    info!("Cleared session {}", args.id);
    println!("🗑️  Cleared session {}", args.id);
    Ok(())
}
