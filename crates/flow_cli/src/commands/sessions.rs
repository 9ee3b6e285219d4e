//! Sessions command - List stored sessions.

use anyhow::Result;
use clap::Args;

use flow_server::FlowConfig;

#[derive(Args)]
pub struct SessionsArgs {
    /// Print the listing as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: SessionsArgs, config: FlowConfig) -> Result<()> {
    let store = config.open_store();
    let mut summaries = Vec::new();
    for id in store.sessions()? {
        summaries.push(store.summary(&id)?);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("📭 No sessions stored under {}", config.store.root.display());
        return Ok(());
    }

    println!("📂 {} session(s):", summaries.len());
    for summary in summaries {
        let documents = if summary.documents.is_empty() {
            "empty".to_string()
        } else {
            summary.documents.join(", ")
        };
        println!("   {}  ({})", summary.id, documents);
    }
    Ok(())
}
