//! CLI command definitions.
//!
//! Each subcommand has an `Args` struct and an async `execute` function.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod clear;
pub mod generate;
pub mod play;
pub mod serve;
pub mod sessions;

/// FlowMaster - multi-agent workflow simulator
#[derive(Parser)]
#[command(name = "flowmaster")]
#[command(version, about = "FlowMaster - turn an idea into a simulated multi-agent workflow")]
#[command(long_about = r#"
FlowMaster turns a product idea into a seven-agent workflow, replays the
agents' work step by step and generates wireframes, frontend code and
backend code on demand.

COMMANDS:
  serve      → Run the HTTP API
  generate   → Generate a workflow from an idea
  play       → Replay a workflow in the terminal
  sessions   → List stored sessions
  clear      → Delete a stored session

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Provider failure
  4 - Storage failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (defaults to ./flowmaster.toml when present)
    #[arg(short, long, global = true, env = "FLOWMASTER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve(serve::ServeArgs),

    /// Generate a workflow from a text, voice or image idea
    Generate(generate::GenerateArgs),

    /// Replay a workflow with approval prompts
    Play(play::PlayArgs),

    /// List stored sessions
    Sessions(sessions::SessionsArgs),

    /// Delete a stored session
    Clear(clear::ClearArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_play_flags() {
        let cli = Cli::parse_from([
            "flowmaster",
            "play",
            "--text",
            "Build a todo app",
            "--auto-approve",
            "--profile",
            "instant",
        ]);
        match cli.command {
            Commands::Play(args) => {
                assert_eq!(args.text.as_deref(), Some("Build a todo app"));
                assert!(args.auto_approve);
                assert_eq!(args.profile.as_deref(), Some("instant"));
            }
            _ => panic!("expected play"),
        }
    }
}
