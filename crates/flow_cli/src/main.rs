//! FlowMaster CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Provider failure
//! - 4: Storage failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};
use flow_agents::AgentError;
use flow_core::CoreError;
use flow_llm::LlmError;
use flow_server::{FlowConfig, ServerError};
use flow_store::StoreError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const PROVIDER_FAILURE: u8 = 3;
    pub const STORAGE_FAILURE: u8 = 4;
}

/// Crates whose logs are shown at `info` by default.
const LOG_CRATES: [&str; 6] = [
    "flow_cli",
    "flow_core",
    "flow_store",
    "flow_llm",
    "flow_agents",
    "flow_server",
];

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match FlowConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            return ExitCode::from(ExitCodes::INVALID_ARGS);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Generate(args) => commands::generate::execute(args, config, cli.quiet).await,
        Commands::Play(args) => commands::play::execute(args, config, cli.quiet).await,
        Commands::Sessions(args) => commands::sessions::execute(args, config).await,
        Commands::Clear(args) => commands::clear::execute(args, config).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut directives = vec!["warn".to_string()];
    directives.extend(LOG_CRATES.iter().map(|c| format!("{}={}", c, level)));
    directives.join(",")
}

fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose)))
    };

    let log_result = if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<LlmError>().is_some() {
            return ExitCodes::PROVIDER_FAILURE;
        }
        if cause.downcast_ref::<StoreError>().is_some() {
            return ExitCodes::STORAGE_FAILURE;
        }
        match cause.downcast_ref::<AgentError>() {
            Some(AgentError::InvalidInput(_)) => return ExitCodes::INVALID_ARGS,
            Some(AgentError::Io(_)) => return ExitCodes::STORAGE_FAILURE,
            _ => {}
        }
        if let Some(CoreError::UnknownProfile(_)) = cause.downcast_ref::<CoreError>() {
            return ExitCodes::INVALID_ARGS;
        }
        if let Some(ServerError::Config(_) | ServerError::ConfigParse(_)) = cause.downcast_ref::<ServerError>() {
            return ExitCodes::INVALID_ARGS;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("argument") || msg.contains("required") || msg.contains("unsupported") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
