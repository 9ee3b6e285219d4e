//! Generate command - Build a workflow from an idea.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;
use tracing::info;

use flow_agents::{AgentStudio, IdeaInput};
use flow_core::{PendingArtifactJob, SimulationState, WorkflowData};
use flow_llm::ImageInput;
use flow_server::{AppState, FlowConfig};
use flow_store::SessionStore;

/// Shown in turn while the agents are working.
pub const STATUS_MESSAGES: [&str; 7] = [
    "Polishing your idea to perfection...",
    "Adding some AI magic ✨",
    "Crafting the perfect workflow...",
    "Transforming chaos into order...",
    "Brewing the perfect solution...",
    "Connecting the dots...",
    "Making it awesome...",
];

const STATUS_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Args)]
pub struct GenerateArgs {
    /// Idea as text
    #[arg(short, long)]
    pub text: Option<String>,

    /// Transcribed voice description
    #[arg(long)]
    pub voice_text: Option<String>,

    /// Sketch or screenshot (png, jpg, gif, webp)
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Store the workflow in this session (created if missing)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Print the workflow as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    fn idea(&self) -> Result<IdeaInput> {
        let mut idea = IdeaInput {
            text: self.text.clone(),
            ..Default::default()
        };
        if let Some(voice) = &self.voice_text {
            idea = idea.with_voice_text(voice.clone());
        }
        if let Some(path) = &self.image {
            idea = idea.with_image(read_image(path)?);
        }
        Ok(idea)
    }
}

pub async fn execute(args: GenerateArgs, config: FlowConfig, quiet: bool) -> Result<()> {
    let idea = args.idea()?;
    if idea.is_empty() {
        bail!("One of --text, --voice-text or --image is required");
    }

    let state = AppState::from_config(config)?;
    let workflow = generate(&state.studio, &idea, quiet).await?;

    if let Some(session_id) = &args.session {
        store_workflow(&state.store, session_id, &workflow)?;
        info!("Stored workflow in session {}", session_id);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&workflow)?);
    } else if !quiet {
        print_summary(&workflow, args.session.as_deref());
    }
    Ok(())
}

/// Generate with rotating status lines on stdout.
pub async fn generate(studio: &AgentStudio, idea: &IdeaInput, quiet: bool) -> Result<WorkflowData> {
    let workflow = with_status(quiet, studio.generate_workflow(idea))
        .await
        .context("Workflow generation failed")?;
    Ok(workflow)
}

/// Replace the session's workflow and drop progress tied to the old one.
pub fn store_workflow(store: &SessionStore, session_id: &str, workflow: &WorkflowData) -> Result<()> {
    store.ensure_session(session_id)?;
    store.remove::<SimulationState>(session_id)?;
    store.remove::<PendingArtifactJob>(session_id)?;
    store.save(session_id, workflow)?;
    Ok(())
}

/// Drive `fut` to completion, printing the next status message every few seconds.
async fn with_status<F: Future>(quiet: bool, fut: F) -> F::Output {
    tokio::pin!(fut);
    let mut ticker = tokio::time::interval(STATUS_INTERVAL);
    let mut shown = 0usize;

    loop {
        tokio::select! {
            output = &mut fut => return output,
            _ = ticker.tick() => {
                if !quiet {
                    println!("⏳ {}", STATUS_MESSAGES[shown % STATUS_MESSAGES.len()]);
                }
                shown += 1;
            }
        }
    }
}

fn read_image(path: &Path) -> Result<ImageInput> {
    let mime = image_mime(path)?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(ImageInput::new(mime, STANDARD.encode(bytes)))
}

fn image_mime(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => bail!("Unsupported image type: {}", path.display()),
    }
}

fn print_summary(workflow: &WorkflowData, session: Option<&str>) {
    println!();
    println!("✅ Workflow ready: {}", workflow.project_name);
    if !workflow.clarified_brief.title.is_empty() {
        println!("   {}", workflow.clarified_brief.title);
    }
    if !workflow.clarified_brief.description.is_empty() {
        println!("   {}", workflow.clarified_brief.description);
    }
    println!();
    for agent in &workflow.agent_workflow {
        println!("   {}. {} ({})", agent.step, agent.agent, agent.role);
    }
    if let Some(id) = session {
        println!();
        println!("💾 Saved to session {}", id);
        println!("   Replay with: flowmaster play --session {}", id);
    }
}
