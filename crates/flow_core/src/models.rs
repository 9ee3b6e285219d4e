//! Workflow data model.
//!
//! These types mirror the JSON documents exchanged with the HTTP API and
//! stored in sessions, so field names follow the camelCase wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage of an agent's work. Order within an agent is fixed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    InitialOutput,
    CriticReview,
    ImproverRefinement,
    FinalApproval,
}

impl PhaseType {
    /// Canonical phase order for every agent.
    pub const ORDER: [PhaseType; 4] = [
        PhaseType::InitialOutput,
        PhaseType::CriticReview,
        PhaseType::ImproverRefinement,
        PhaseType::FinalApproval,
    ];

    /// Wire name (`initial_output`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialOutput => "initial_output",
            Self::CriticReview => "critic_review",
            Self::ImproverRefinement => "improver_refinement",
            Self::FinalApproval => "final_approval",
        }
    }

    /// Position in [`PhaseType::ORDER`].
    pub fn position(&self) -> usize {
        match self {
            Self::InitialOutput => 0,
            Self::CriticReview => 1,
            Self::ImproverRefinement => 2,
            Self::FinalApproval => 3,
        }
    }

    /// Message category shown for this phase.
    pub fn message_kind(&self) -> MessageKind {
        match self {
            Self::InitialOutput => MessageKind::Initial,
            Self::CriticReview => MessageKind::Critic,
            Self::ImproverRefinement => MessageKind::Improver,
            Self::FinalApproval => MessageKind::Approval,
        }
    }
}

impl std::fmt::Display for PhaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem raised by a critic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub severity: String,
    pub description: String,
}

impl Issue {
    pub fn new(severity: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: severity.into(),
            description: description.into(),
        }
    }
}

/// A generated source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeFile {
    pub path: String,
    pub code: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CodeFile {
    pub fn new(path: impl Into<String>, language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            language: language.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A wireframe descriptor. `data` holds a base64 data URL when an image
/// exists; generated wireframes describe layout in text instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wireframe {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interactions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Wireframe {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            layout: None,
            components: Vec::new(),
            interactions: Vec::new(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// One stage of an agent's output.
///
/// The `type` tag selects which of the optional fields are meaningful.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thoughts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireframes: Option<Vec<Wireframe>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_code: Option<Vec<CodeFile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_code: Option<Vec<CodeFile>>,
}

impl Phase {
    /// Create an empty phase of the given type.
    pub fn new(phase_type: PhaseType) -> Self {
        Self {
            phase_type,
            thoughts: Vec::new(),
            output: None,
            strengths: Vec::new(),
            issues: Vec::new(),
            recommendations: Vec::new(),
            improvements: Vec::new(),
            validations: Vec::new(),
            quality_score: None,
            status: None,
            timestamp: None,
            wireframes: None,
            frontend_code: None,
            backend_code: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_thoughts<I, S>(mut self, thoughts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.thoughts = thoughts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// True when any artifact list is attached.
    pub fn has_artifacts(&self) -> bool {
        self.wireframes.is_some() || self.frontend_code.is_some() || self.backend_code.is_some()
    }
}

/// A named role in the simulated pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub step: u32,
    pub agent: String,
    pub role: String,
    pub color: String,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

impl Agent {
    pub fn new(step: u32, name: impl Into<String>, role: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            step,
            agent: name.into(),
            role: role.into(),
            color: color.into(),
            phases: Vec::new(),
        }
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.agent
    }
}

/// UI category of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Initial,
    Critic,
    Improver,
    Approval,
}

/// Displayable projection of one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub agent_name: String,
    pub agent_color: String,
    pub phase: Phase,
    pub phase_index: usize,
}

impl Message {
    /// Build the message for `agent.phases[phase_index]`.
    ///
    /// The id combines step, agent name, phase index, phase type and a
    /// monotonic counter so restored and replayed messages never collide.
    pub fn for_phase(step_index: usize, agent: &Agent, phase_index: usize, counter: u64) -> Option<Self> {
        let phase = agent.phases.get(phase_index)?;
        Some(Self {
            id: message_id(step_index, &agent.agent, phase_index, phase.phase_type, counter),
            kind: phase.phase_type.message_kind(),
            agent_name: agent.agent.clone(),
            agent_color: agent.color.clone(),
            phase: phase.clone(),
            phase_index,
        })
    }
}

/// `{step}-{agent name, whitespace runs as '-'}-{phase}-{type}-{counter}`
pub fn message_id(step_index: usize, agent_name: &str, phase_index: usize, phase_type: PhaseType, counter: u64) -> String {
    let name = agent_name.split_whitespace().collect::<Vec<_>>().join("-");
    format!("{}-{}-{}-{}-{}", step_index, name, phase_index, phase_type, counter)
}

/// Persisted playback progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub current_step: usize,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub is_paused: bool,
}

/// Refined version of the user's idea.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClarifiedBrief {
    pub title: String,
    pub description: String,
}

/// A generated workflow together with the prompt that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowData {
    pub user_prompt: String,
    pub project_name: String,
    pub clarified_brief: ClarifiedBrief,
    pub agent_workflow: Vec<Agent>,
}

impl WorkflowData {
    /// Index of the first agent whose initial output carries `kind` artifacts.
    pub fn agent_index_for(&self, kind: ArtifactKind) -> Option<usize> {
        self.agent_workflow.iter().position(|agent| {
            agent.phases.iter().any(|phase| match kind {
                ArtifactKind::Wireframes => phase.wireframes.is_some(),
                ArtifactKind::Frontend => phase.frontend_code.is_some(),
                ArtifactKind::Backend => phase.backend_code.is_some(),
            })
        })
    }
}

/// Kind of generated deliverable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Wireframes,
    Frontend,
    Backend,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wireframes => "wireframes",
            Self::Frontend => "frontend",
            Self::Backend => "backend",
        }
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wireframes" | "wireframe" => Ok(Self::Wireframes),
            "frontend" | "frontendcode" | "frontend-code" => Ok(Self::Frontend),
            "backend" | "backendcode" | "backend-code" => Ok(Self::Backend),
            other => Err(format!("unknown artifact kind: {}", other)),
        }
    }
}

/// Last viewed artifact bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireframes: Option<Vec<Wireframe>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_code: Option<Vec<CodeFile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_code: Option<Vec<CodeFile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
}

impl ArtifactBundle {
    /// Whether the bundle holds artifacts of `kind`.
    pub fn has(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Wireframes => self.wireframes.as_ref().is_some_and(|w| !w.is_empty()),
            ArtifactKind::Frontend => self.frontend_code.as_ref().is_some_and(|c| !c.is_empty()),
            ArtifactKind::Backend => self.backend_code.as_ref().is_some_and(|c| !c.is_empty()),
        }
    }
}

/// Hand-off descriptor for artifact generation that runs behind a loading view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingArtifactJob {
    pub kind: ArtifactKind,
    pub agent_index: usize,
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PendingArtifactJob {
    pub fn new(kind: ArtifactKind, agent_index: usize, project_name: impl Into<String>) -> Self {
        Self {
            kind,
            agent_index,
            project_name: project_name.into(),
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
