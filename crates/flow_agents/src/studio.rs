//! Generation services backed by the provider chain.
//!
//! Every operation degrades to deterministic content when no provider is
//! configured, every provider fails or the response cannot be parsed.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use flow_core::{
    extract_as, Agent, ArtifactBundle, ArtifactKind, CodeFile, PendingArtifactJob, PhaseType, Wireframe, WorkflowData,
};
use flow_llm::{CompletionRequest, ProviderChain};

use crate::catalog::WireframeCatalog;
use crate::error::{AgentError, AgentResult};
use crate::fallback;
use crate::normalize::{normalize_feedback, normalize_workflow, FeedbackDraft, WorkflowDraft};
use crate::prompts;
use crate::requests::{
    ApprovalReceipt, ApproveRequest, BackendCodeRequest, FeedbackRequest, FeedbackResponse, FrontendCodeRequest,
    IdeaInput, PrdDocument, PrdRequest, RegenerateRequest, RegeneratedOutput, ThinkingRequest,
    WireframeSelectionRequest, WireframesRequest,
};
use crate::roster::Roster;

const WORKFLOW_MAX_TOKENS: u32 = 8192;
const CODE_MAX_TOKENS: u32 = 8000;
const THINKING_MAX_TOKENS: u32 = 500;

#[derive(Deserialize)]
struct WireframesPayload {
    #[serde(default)]
    wireframes: Vec<Wireframe>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrontendPayload {
    #[serde(default)]
    frontend_code: Vec<CodeFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendPayload {
    #[serde(default)]
    backend_code: Vec<CodeFile>,
}

/// The agent services: workflow generation, artifacts and reviews.
#[derive(Clone)]
pub struct AgentStudio {
    chain: ProviderChain,
    roster: Arc<Roster>,
    catalog: WireframeCatalog,
}

impl AgentStudio {
    pub fn new(chain: ProviderChain, roster: Roster) -> Self {
        Self {
            chain,
            roster: Arc::new(roster),
            catalog: WireframeCatalog::new(),
        }
    }

    /// Studio with the built-in roster.
    pub fn builtin(chain: ProviderChain) -> AgentResult<Self> {
        Ok(Self::new(chain, Roster::builtin()?))
    }

    pub fn with_catalog(mut self, catalog: WireframeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn catalog(&self) -> &WireframeCatalog {
        &self.catalog
    }

    async fn complete_text(&self, task: &str, request: CompletionRequest) -> Option<String> {
        if self.chain.is_empty() {
            debug!("{}: no provider configured", task);
            return None;
        }
        match self.chain.complete(&request).await {
            Ok(completion) => {
                debug!("{}: {} answered with {}", task, completion.provider, completion.model);
                Some(completion.content)
            }
            Err(e) => {
                warn!("{}: {}", task, e);
                None
            }
        }
    }

    async fn complete_json<T: DeserializeOwned>(&self, task: &str, request: CompletionRequest) -> Option<T> {
        let content = self.complete_text(task, request).await?;
        match extract_as::<T>(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{}: could not parse response: {}", task, e);
                None
            }
        }
    }

    /// Generate a full workflow for the user's idea.
    ///
    /// The result always has one agent per roster entry with four phases in
    /// canonical order.
    pub async fn generate_workflow(&self, idea: &IdeaInput) -> AgentResult<WorkflowData> {
        if idea.is_empty() {
            return Err(AgentError::invalid_input("Provide a text idea, voice text or an image"));
        }
        let prompt = idea.user_prompt();
        info!("Generating workflow for \"{}\"", prompt);

        let mut request = CompletionRequest::new(prompts::workflow(&idea.user_input(), &prompt, &self.roster))
            .with_system(prompts::JSON_ONLY_SYSTEM)
            .with_max_tokens(WORKFLOW_MAX_TOKENS);
        if let Some(image) = &idea.image {
            request = request.with_image(image.clone());
        }

        let draft: Option<WorkflowDraft> = self.complete_json("workflow", request).await;
        let workflow = match draft.and_then(|d| normalize_workflow(d, &prompt, &self.roster, &self.catalog)) {
            Some(workflow) => workflow,
            None => {
                info!("Using fallback workflow for \"{}\"", prompt);
                fallback::workflow(&prompt, &self.roster, &self.catalog)
            }
        };
        Ok(workflow)
    }

    /// Pick stock wireframes for a prompt.
    pub fn select_wireframes(&self, request: &WireframeSelectionRequest) -> Vec<Wireframe> {
        self.catalog.select(&request.user_prompt, &mut rand::thread_rng())
    }

    pub async fn generate_wireframes(&self, request: &WireframesRequest) -> Vec<Wireframe> {
        let completion = CompletionRequest::new(prompts::wireframes(
            &request.prd,
            &request.requirements,
            &request.user_prompt,
        ))
        .with_system(prompts::JSON_ONLY_SYSTEM);

        match self.complete_json::<WireframesPayload>("wireframes", completion).await {
            Some(payload) if !payload.wireframes.is_empty() => payload.wireframes,
            _ => fallback::wireframes(&request.user_prompt, &self.catalog),
        }
    }

    pub async fn generate_frontend_code(&self, request: &FrontendCodeRequest) -> Vec<CodeFile> {
        let completion = CompletionRequest::new(prompts::frontend(
            &request.wireframes,
            &request.requirements,
            &request.user_prompt,
        ))
        .with_system(prompts::JSON_ONLY_SYSTEM)
        .with_max_tokens(CODE_MAX_TOKENS);

        match self.complete_json::<FrontendPayload>("frontend code", completion).await {
            Some(payload) if !payload.frontend_code.is_empty() => payload.frontend_code,
            _ => {
                let screens = serde_json::from_value::<Vec<Wireframe>>(request.wireframes.clone())
                    .ok()
                    .filter(|w| !w.is_empty())
                    .unwrap_or_else(|| fallback::wireframes(&request.user_prompt, &self.catalog));
                fallback::frontend_code(&fallback::project_name(&request.user_prompt), &screens)
            }
        }
    }

    pub async fn generate_backend_code(&self, request: &BackendCodeRequest) -> Vec<CodeFile> {
        let completion = CompletionRequest::new(prompts::backend(
            &request.requirements,
            &request.user_prompt,
            &request.frontend_code,
        ))
        .with_system(prompts::BACKEND_SYSTEM)
        .with_temperature(0.7)
        .with_max_tokens(CODE_MAX_TOKENS);

        match self.complete_json::<BackendPayload>("backend code", completion).await {
            Some(payload) if !payload.backend_code.is_empty() => payload.backend_code,
            _ => fallback::backend_code(&fallback::project_name(&request.user_prompt)),
        }
    }

    /// Rewrite an agent's output to address user feedback.
    pub async fn regenerate_output(&self, request: &RegenerateRequest) -> RegeneratedOutput {
        let completion = CompletionRequest::new(prompts::regenerate(
            &request.agent_name,
            &request.agent_role,
            &request.previous_output,
            &request.feedback,
            &request.user_prompt,
            &request.requirements,
        ))
        .with_temperature(0.7);

        let text = self
            .complete_text("regenerate", completion)
            .await
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback::REGENERATE_FALLBACK.to_string());

        RegeneratedOutput {
            regenerated_output: text,
            timestamp: Utc::now(),
        }
    }

    /// Critic pass over user feedback on an artifact.
    pub async fn review_artifact(&self, request: &FeedbackRequest) -> FeedbackResponse {
        let completion = CompletionRequest::new(prompts::artifact_feedback(
            &request.artifact_type,
            &request.artifact_data,
            &request.feedback,
            &request.workflow_data,
        ))
        .with_system(prompts::JSON_ONLY_SYSTEM)
        .with_max_tokens(CODE_MAX_TOKENS);

        match self.complete_json::<FeedbackDraft>("artifact feedback", completion).await {
            Some(draft) => normalize_feedback(draft, request),
            None => fallback::feedback(request),
        }
    }

    /// Acknowledge an artifact approval.
    pub fn approve_artifact(&self, request: &ApproveRequest) -> ApprovalReceipt {
        info!("Approved {} {}", request.artifact_type, request.artifact_id);
        ApprovalReceipt {
            success: true,
            message: format!("{} {} approved", request.artifact_type, request.artifact_id),
            workflow_id: request.workflow_id.clone(),
        }
    }

    pub async fn agent_thinking(&self, request: &ThinkingRequest) -> String {
        let completion = CompletionRequest::new(prompts::thinking(&request.user_prompt))
            .with_system(prompts::thinking_system(&request.agent_name, &request.agent_role))
            .with_temperature(0.8)
            .with_max_tokens(THINKING_MAX_TOKENS);

        self.complete_text("thinking", completion)
            .await
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback::thinking(&self.roster, &request.agent_name, &request.user_prompt))
    }

    /// Plain-text PRD export.
    pub async fn prd_document(&self, request: &PrdRequest) -> PrdDocument {
        let project = request
            .project_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("Project")
            .to_string();

        let completion = CompletionRequest::new(prompts::prd(&request.prd_content, &project, &request.user_prompt));
        let content = self
            .complete_text("prd", completion)
            .await
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback::prd_document(&request.prd_content, &project, &request.user_prompt));

        PrdDocument {
            pdf_content: content,
            filename: format!("{}_PRD.txt", project),
            success: true,
        }
    }

    /// Produce the artifacts a pending job asks for.
    ///
    /// Wireframe jobs write the selection back into `workflow` so later
    /// frontend jobs build on it.
    pub async fn run_artifact_job(
        &self,
        job: &PendingArtifactJob,
        workflow: &mut WorkflowData,
    ) -> AgentResult<ArtifactBundle> {
        if job.agent_index >= workflow.agent_workflow.len() {
            return Err(AgentError::NotFound(format!("agent #{}", job.agent_index)));
        }
        info!("Running {} job for {}", job.kind.as_str(), job.project_name);

        let requirements = Value::String(workflow.clarified_brief.description.clone());
        let mut bundle = ArtifactBundle::default();

        match job.kind {
            ArtifactKind::Wireframes => {
                let wireframes = self.select_wireframes(&WireframeSelectionRequest {
                    user_prompt: workflow.user_prompt.clone(),
                });
                let agent = &mut workflow.agent_workflow[job.agent_index];
                if let Some(phase) = agent.phases.iter_mut().find(|p| p.phase_type == PhaseType::InitialOutput) {
                    phase.wireframes = Some(wireframes.clone());
                }
                bundle.wireframes = Some(wireframes);
            }
            ArtifactKind::Frontend => {
                let wireframes = artifact_value(workflow, ArtifactKind::Wireframes);
                let code = self
                    .generate_frontend_code(&FrontendCodeRequest {
                        wireframes,
                        requirements,
                        user_prompt: workflow.user_prompt.clone(),
                    })
                    .await;
                bundle.frontend_code = Some(code);
            }
            ArtifactKind::Backend => {
                let frontend_code = artifact_value(workflow, ArtifactKind::Frontend);
                let code = self
                    .generate_backend_code(&BackendCodeRequest {
                        requirements,
                        user_prompt: workflow.user_prompt.clone(),
                        frontend_code,
                    })
                    .await;
                bundle.backend_code = Some(code);
            }
        }

        bundle.agent = workflow.agent_workflow.get(job.agent_index).cloned();
        bundle.workflow = Some(workflow.clone());
        Ok(bundle)
    }
}

/// The first initial-output artifacts of `kind` in `workflow`, as JSON.
fn artifact_value(workflow: &WorkflowData, kind: ArtifactKind) -> Value {
    let Some(index) = workflow.agent_index_for(kind) else {
        return Value::Null;
    };
    let agent: &Agent = &workflow.agent_workflow[index];
    let found = agent.phases.iter().find_map(|phase| match kind {
        ArtifactKind::Wireframes => phase.wireframes.as_ref().and_then(|w| serde_json::to_value(w).ok()),
        ArtifactKind::Frontend => phase.frontend_code.as_ref().and_then(|c| serde_json::to_value(c).ok()),
        ArtifactKind::Backend => phase.backend_code.as_ref().and_then(|c| serde_json::to_value(c).ok()),
    });
    found.unwrap_or(Value::Null)
}
