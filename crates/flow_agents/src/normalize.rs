//! Coerce model output into well-formed workflows and reviews.
//!
//! Models drop phases, repeat them, reorder them and forget artifacts. The
//! result of [`normalize_workflow`] always has one agent per roster entry,
//! each with the four phases in canonical order.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use flow_core::{Agent, ArtifactKind, ClarifiedBrief, Issue, Phase, PhaseType, WorkflowData};

use crate::catalog::WireframeCatalog;
use crate::fallback;
use crate::requests::{CriticReview, FeedbackRequest, FeedbackResponse, Improvement, ReviewStatus};
use crate::roster::{Roster, RosterEntry};

/// Loosely typed workflow as returned by a model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowDraft {
    pub project_name: Option<String>,
    pub clarified_brief: Option<Value>,
    pub agent_workflow: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AgentDraft {
    agent: Option<String>,
    role: Option<String>,
    color: Option<String>,
    phases: Vec<Value>,
}

/// Build a workflow from `draft`, filling every gap from the roster.
///
/// Returns `None` when the draft has no `agentWorkflow` array at all.
pub fn normalize_workflow(
    draft: WorkflowDraft,
    prompt: &str,
    roster: &Roster,
    catalog: &WireframeCatalog,
) -> Option<WorkflowData> {
    let drafts = draft.agent_workflow.filter(|agents| !agents.is_empty())?;

    let project = draft
        .project_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && n != "ProjectName")
        .unwrap_or_else(|| fallback::project_name(prompt));

    let brief = draft
        .clarified_brief
        .and_then(|v| serde_json::from_value::<ClarifiedBrief>(v).ok())
        .map(|b| fill_brief(b, &project, prompt))
        .unwrap_or_else(|| fallback::brief(&project, prompt));

    if drafts.len() != roster.len() {
        debug!("Model returned {} agents; roster has {}", drafts.len(), roster.len());
    }

    let mut agents: Vec<Agent> = Vec::with_capacity(roster.len());
    for (index, entry) in roster.entries().iter().enumerate() {
        let agent_draft = drafts
            .get(index)
            .cloned()
            .and_then(|v| serde_json::from_value::<AgentDraft>(v).ok())
            .unwrap_or_default();
        let agent = normalize_agent(agent_draft, entry, index, &project, prompt, catalog, &agents);
        agents.push(agent);
    }

    Some(WorkflowData {
        user_prompt: prompt.to_string(),
        project_name: project,
        clarified_brief: brief,
        agent_workflow: agents,
    })
}

fn fill_brief(mut brief: ClarifiedBrief, project: &str, prompt: &str) -> ClarifiedBrief {
    let defaults = fallback::brief(project, prompt);
    if brief.title.trim().is_empty() {
        brief.title = defaults.title;
    }
    if brief.description.trim().is_empty() {
        brief.description = defaults.description;
    }
    brief
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn is_hex_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn normalize_agent(
    draft: AgentDraft,
    entry: &RosterEntry,
    index: usize,
    project: &str,
    prompt: &str,
    catalog: &WireframeCatalog,
    previous: &[Agent],
) -> Agent {
    let name = non_empty(draft.agent).unwrap_or_else(|| entry.name.clone());
    let role = non_empty(draft.role).unwrap_or_else(|| entry.role.clone());
    let color = non_empty(draft.color)
        .filter(|c| is_hex_color(c))
        .unwrap_or_else(|| entry.color.clone());

    let parsed = dedupe_phases(
        draft
            .phases
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Phase>(v).ok())
            .collect(),
    );

    let mut agent = Agent::new(index as u32 + 1, name, role, color);
    for phase_type in PhaseType::ORDER {
        let mut phase = match parsed.iter().find(|p| p.phase_type == phase_type) {
            Some(found) => clean_phase(found.clone(), index),
            None => fallback::phase(entry, index, phase_type, project, prompt),
        };

        if phase_type == PhaseType::InitialOutput {
            if let Some(kind) = entry.artifact {
                let missing = match kind {
                    ArtifactKind::Wireframes => phase.wireframes.as_ref().map_or(true, Vec::is_empty),
                    ArtifactKind::Frontend => phase.frontend_code.as_ref().map_or(true, Vec::is_empty),
                    ArtifactKind::Backend => phase.backend_code.as_ref().map_or(true, Vec::is_empty),
                };
                if missing {
                    debug!("Filling {} artifacts for {}", kind.as_str(), entry.name);
                    let screens = fallback::collected_wireframes(previous);
                    fallback::attach_artifacts(&mut phase, kind, project, prompt, catalog, &screens);
                }
            }
        }
        agent.phases.push(phase);
    }
    agent
}

/// Keep the first phase of each type.
pub fn dedupe_phases(phases: Vec<Phase>) -> Vec<Phase> {
    let mut seen = HashSet::new();
    phases
        .into_iter()
        .filter(|p| seen.insert(p.phase_type))
        .collect()
}

fn clean_phase(mut phase: Phase, index: usize) -> Phase {
    if phase.timestamp.as_deref().map_or(true, |t| t.trim().is_empty()) {
        phase.timestamp = Some(fallback::timestamp(index, phase.phase_type));
    }
    if let Some(score) = phase.quality_score {
        phase.quality_score = Some(if score.is_finite() { score.clamp(0.0, 100.0) } else { 0.0 });
    }
    if let Some(status) = phase.status.take() {
        let status = ReviewStatus::parse_lenient(&status);
        phase.status = Some(fallback::status_str(status).to_string());
    }
    phase
}

/// Loosely typed critic response as returned by a model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackDraft {
    pub critic_review: Option<ReviewDraft>,
    pub improvements: Vec<Value>,
    pub updated_artifact: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewDraft {
    pub strengths: Vec<String>,
    pub issues: Vec<Value>,
    pub recommendations: Vec<String>,
    pub status: Option<String>,
}

fn issue_from(value: Value) -> Option<Issue> {
    match value {
        Value::String(description) => Some(Issue::new("medium", description)),
        other => serde_json::from_value(other).ok(),
    }
}

fn improvement_from(value: Value) -> Option<Improvement> {
    match value {
        Value::String(text) => Some(Improvement::new(text.clone(), text)),
        other => serde_json::from_value(other).ok(),
    }
}

/// Build a feedback response from `draft`.
///
/// Unknown statuses read as `needs_improvement`, and a `needs_improvement`
/// review always leaves with at least one improvement: derived from the
/// issues first, then from the user's feedback. A missing or empty updated
/// artifact falls back to the submitted one.
pub fn normalize_feedback(draft: FeedbackDraft, request: &FeedbackRequest) -> FeedbackResponse {
    let review = draft.critic_review.unwrap_or_default();
    let status = review
        .status
        .as_deref()
        .map(ReviewStatus::parse_lenient)
        .unwrap_or_default();
    let issues: Vec<Issue> = review.issues.into_iter().filter_map(issue_from).collect();
    let mut improvements: Vec<Improvement> = draft.improvements.into_iter().filter_map(improvement_from).collect();

    if status == ReviewStatus::NeedsImprovement && improvements.is_empty() {
        improvements = issues
            .iter()
            .enumerate()
            .map(|(i, issue)| {
                let solution = review
                    .recommendations
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("Address: {}", issue.description));
                Improvement::new(issue.description.clone(), solution)
            })
            .collect();
    }
    if status == ReviewStatus::NeedsImprovement && improvements.is_empty() {
        improvements = fallback::feedback(request).improvements;
    }
    if status == ReviewStatus::NeedsImprovement && improvements.is_empty() {
        improvements.push(Improvement::new(
            "Overall quality",
            "Refine the artifact following the critic recommendations",
        ));
    }

    let updated_artifact = match draft.updated_artifact {
        Some(Value::Null) | None => request.artifact_data.clone(),
        Some(Value::Object(map)) if map.is_empty() => request.artifact_data.clone(),
        Some(value) => value,
    };

    FeedbackResponse {
        critic_review: CriticReview {
            strengths: review.strengths,
            issues,
            recommendations: review.recommendations,
            status,
        },
        improvements,
        updated_artifact,
    }
}
