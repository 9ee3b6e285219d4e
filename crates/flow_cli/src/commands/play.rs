//! Play command - Replay a workflow in the terminal.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

use flow_agents::IdeaInput;
use flow_core::{
    CoreResult, Message, MessageKind, NullSink, PacingProfile, PlaybackHandle, PlaybackMachine, PlaybackOptions,
    PlaybackSession, SimulationSink, SimulationState, WorkflowData,
};
use flow_server::{AppState, FlowConfig};

use super::generate;

#[derive(Args)]
pub struct PlayArgs {
    /// Session whose workflow (and saved progress) to replay
    #[arg(short, long)]
    pub session: Option<String>,

    /// Generate a fresh workflow from this idea first
    #[arg(short, long)]
    pub text: Option<String>,

    /// Approve every hand-off without prompting
    #[arg(long)]
    pub auto_approve: bool,

    /// Pacing profile: brisk, deliberate or instant
    #[arg(long)]
    pub profile: Option<String>,
}

enum Decision {
    Approve,
    Stop,
}

pub async fn execute(args: PlayArgs, config: FlowConfig, quiet: bool) -> Result<()> {
    let profile = match args.profile.as_deref() {
        Some(name) => name.parse::<PacingProfile>()?,
        None => config.playback.profile,
    };
    let auto_approve = args.auto_approve || config.playback.auto_approve;
    let state = AppState::from_config(config)?;

    let workflow = match (&args.session, &args.text) {
        (_, Some(text)) => {
            let workflow = generate::generate(&state.studio, &IdeaInput::text(text.clone()), quiet).await?;
            if let Some(id) = &args.session {
                generate::store_workflow(&state.store, id, &workflow)?;
            }
            workflow
        }
        (Some(id), None) => {
            state.store.require(id)?;
            match state.store.load::<WorkflowData>(id)? {
                Some(workflow) => workflow,
                None => bail!(
                    "Session {} has no workflow; run `flowmaster generate --session {}` first",
                    id,
                    id
                ),
            }
        }
        (None, None) => bail!("Either --session or --text is required"),
    };

    let (saved, sink): (Option<SimulationState>, Arc<dyn SimulationSink>) = match &args.session {
        Some(id) => (
            state.store.load::<SimulationState>(id)?,
            Arc::new(state.store.simulation_sink(id)?),
        ),
        None => (None, Arc::new(NullSink)),
    };

    let options = PlaybackOptions::default()
        .with_profile(profile)
        .with_auto_approve(auto_approve);
    let machine = PlaybackMachine::restore(workflow.agent_workflow.clone(), saved, options);
    let resumed = machine.snapshot().state.messages.len();
    if machine.was_restored() {
        println!("⏯️  Resuming {} after {} message(s)", workflow.project_name, resumed);
    } else {
        println!("▶️  Playing {} ({} agents, {} pacing)", workflow.project_name, workflow.agent_workflow.len(), profile);
    }

    let handle = launch(machine, sink)?;
    info!("Playback started");

    let mut rx = handle.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = resumed;
    let mut prompted: Option<usize> = None;

    loop {
        let snapshot = rx.borrow_and_update().clone();
        for message in snapshot.state.messages.iter().skip(printed) {
            print_message(message);
        }
        printed = printed.max(snapshot.state.messages.len());

        if snapshot.state.is_complete {
            println!();
            println!("🎉 Workflow complete: all {} agents signed off", snapshot.total_agents);
            break;
        }

        if let Some(step) = snapshot.pending_approval {
            if prompted != Some(step) {
                prompted = Some(step);
                let agent = workflow
                    .agent_workflow
                    .get(step)
                    .map(|a| a.agent.as_str())
                    .unwrap_or("this agent");
                match prompt_approval(&mut stdin, agent).await? {
                    Decision::Approve => handle.approve_step(step)?,
                    Decision::Stop => {
                        handle.stop().await;
                        if args.session.is_some() {
                            println!("⏸️  Stopped. Progress is saved in the session.");
                        } else {
                            println!("⏸️  Stopped.");
                        }
                        break;
                    }
                }
            }
        }

        if rx.changed().await.is_err() {
            debug!("Playback task ended");
            break;
        }
    }

    Ok(())
}

/// Spawn and start the playback. Progress saved while paused is resumed,
/// since the terminal offers no other way to unpause it.
fn launch(machine: PlaybackMachine, sink: Arc<dyn SimulationSink>) -> CoreResult<PlaybackHandle> {
    let paused = machine.snapshot().state.is_paused;
    let handle = PlaybackSession::spawn(machine, sink);
    handle.start()?;
    if paused {
        println!("⏯️  Resuming paused playback");
        handle.set_paused(false)?;
    }
    Ok(handle)
}

async fn prompt_approval(stdin: &mut Lines<BufReader<Stdin>>, agent: &str) -> Result<Decision> {
    print!("\n👉 Approve {}'s work and hand off to the next agent? [Y/n] ", agent);
    std::io::stdout().flush()?;

    match stdin.next_line().await? {
        Some(line) => Ok(parse_decision(&line)),
        None => Ok(Decision::Stop),
    }
}

fn parse_decision(line: &str) -> Decision {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" => Decision::Approve,
        _ => Decision::Stop,
    }
}

fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Initial => "💡 Initial output",
        MessageKind::Critic => "🔍 Critic review",
        MessageKind::Improver => "🛠️  Improver refinement",
        MessageKind::Approval => "✅ Final approval",
    }
}

fn print_message(message: &Message) {
    let phase = &message.phase;
    println!();
    println!(
        "[{}] {} · {}",
        phase.timestamp.as_deref().unwrap_or("--:--:--"),
        message.agent_name,
        kind_label(message.kind)
    );

    for thought in &phase.thoughts {
        println!("   💭 {}", thought);
    }
    if let Some(output) = &phase.output {
        println!("   {}", output);
    }
    for strength in &phase.strengths {
        println!("   + {}", strength);
    }
    for issue in &phase.issues {
        println!("   ! [{}] {}", issue.severity, issue.description);
    }
    for item in phase.recommendations.iter().chain(&phase.improvements) {
        println!("   → {}", item);
    }
    for validation in &phase.validations {
        println!("   ✓ {}", validation);
    }
    if let Some(wireframes) = &phase.wireframes {
        println!("   🖼️  {} wireframe(s)", wireframes.len());
    }
    if let Some(files) = &phase.frontend_code {
        println!("   📦 {} frontend file(s)", files.len());
    }
    if let Some(files) = &phase.backend_code {
        println!("   📦 {} backend file(s)", files.len());
    }
    if let Some(score) = phase.quality_score {
        println!("   Quality score: {:.0}/100", score);
    }
    if let Some(status) = &phase.status {
        println!("   Status: {}", status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{Agent, Phase, PhaseType};

    fn agents(n: u32) -> Vec<Agent> {
        (0..n)
            .map(|i| {
                PhaseType::ORDER.iter().fold(
                    Agent::new(i + 1, format!("Agent {}", i), "role", "#336699"),
                    |agent, phase_type| agent.with_phase(Phase::new(*phase_type)),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_paused_progress_is_resumed() {
        let saved = SimulationState {
            current_step: 0,
            is_paused: true,
            ..Default::default()
        };
        let options = PlaybackOptions::default()
            .with_profile(PacingProfile::Instant)
            .with_auto_approve(true);
        let machine = PlaybackMachine::restore(agents(2), Some(saved), options);
        assert!(machine.was_restored());

        let handle = launch(machine, Arc::new(NullSink)).unwrap();
        let done = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            handle.wait_until(|s| s.state.is_complete),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!done.state.is_paused);
        assert_eq!(done.state.messages.len(), 8);
        handle.stop().await;
    }

    #[test]
    fn test_blank_answer_approves() {
        assert!(matches!(parse_decision("\n"), Decision::Approve));
        assert!(matches!(parse_decision(" Yes "), Decision::Approve));
        assert!(matches!(parse_decision("n"), Decision::Stop));
        assert!(matches!(parse_decision("quit"), Decision::Stop));
    }
}
