//! # flow_agents
//!
//! The FlowMaster agent pipeline: the seven-agent roster, the prompts sent
//! to each model and the services that turn model output into workflows,
//! wireframes, code and reviews.
//!
//! Every service falls back to deterministic content derived from the
//! roster, so callers always get a usable answer.
//!
//! # Example
//!
//! ```rust,ignore
//! use flow_agents::{AgentStudio, IdeaInput};
//! use flow_llm::{LlmSettings, ProviderChain};
//!
//! let chain = ProviderChain::from_settings(&LlmSettings::default());
//! let studio = AgentStudio::builtin(chain)?;
//! let workflow = studio.generate_workflow(&IdeaInput::text("Build a todo app")).await?;
//! assert_eq!(workflow.agent_workflow.len(), 7);
//! ```

pub mod catalog;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod prompts;
pub mod requests;
pub mod roster;
pub mod studio;

pub use catalog::{placeholder_svg, CatalogEntry, WireframeCatalog, CATALOG};
pub use error::{AgentError, AgentResult};
pub use normalize::{dedupe_phases, normalize_feedback, normalize_workflow, FeedbackDraft, WorkflowDraft};
pub use requests::{
    ApprovalReceipt, ApproveRequest, BackendCodeRequest, CriticReview, FeedbackRequest, FeedbackResponse,
    FrontendCodeRequest, IdeaInput, Improvement, PrdDocument, PrdRequest, RegenerateRequest, RegeneratedOutput,
    ReviewStatus, ThinkingRequest, WireframeSelectionRequest, WireframesRequest,
};
pub use roster::{Roster, RosterEntry};
pub use studio::AgentStudio;
