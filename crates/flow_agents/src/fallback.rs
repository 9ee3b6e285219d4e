//! Deterministic content used when no provider answers.
//!
//! Everything here is derived from the roster and the user's prompt, so the
//! same input always yields the same workflow.

use rand::rngs::StdRng;
use rand::SeedableRng;

use flow_core::{Agent, ArtifactKind, ClarifiedBrief, CodeFile, Issue, Phase, PhaseType, Wireframe, WorkflowData};

use crate::catalog::{CatalogEntry, WireframeCatalog};
use crate::prompts::PRD_SECTIONS;
use crate::requests::{CriticReview, FeedbackRequest, FeedbackResponse, Improvement, ReviewStatus};
use crate::roster::{Roster, RosterEntry};

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "build", "create", "make", "develop", "design", "i", "want", "to", "need", "for", "with",
    "and", "of", "my", "me", "please", "that", "app", "application", "simple",
];

const SECONDS_PER_AGENT: u32 = 8;
const PHASE_OFFSETS: [u32; 4] = [0, 1, 3, 4];

/// Project name built from the first significant words of `prompt`.
///
/// `"Build a todo app"` becomes `"TodoApp"`; prompts with no usable words
/// become `"FlowProject"`.
pub fn project_name(prompt: &str) -> String {
    let words: Vec<String> = prompt
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .take(2)
        .map(capitalize)
        .collect();

    if words.is_empty() {
        "FlowProject".to_string()
    } else {
        format!("{}App", words.join(""))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `"00:MM:SS"` offset of a phase on the simulated timeline.
pub fn timestamp(agent_index: usize, phase_type: PhaseType) -> String {
    let total = agent_index as u32 * SECONDS_PER_AGENT + 2 + PHASE_OFFSETS[phase_type.position()];
    format!("00:{:02}:{:02}", total / 60, total % 60)
}

fn fill(template: &str, project: &str, idea: &str) -> String {
    template.replace("{project}", project).replace("{idea}", idea)
}

/// One canned phase for a roster agent.
pub fn phase(entry: &RosterEntry, agent_index: usize, phase_type: PhaseType, project: &str, idea: &str) -> Phase {
    let mut phase = Phase::new(phase_type).with_timestamp(timestamp(agent_index, phase_type));
    match phase_type {
        PhaseType::InitialOutput => {
            phase.thoughts = entry.thoughts.clone();
            phase.output = Some(fill(&entry.output, project, idea));
        }
        PhaseType::CriticReview => {
            phase.strengths = entry.strengths.clone();
            phase.issues = entry.issues.clone();
            phase.recommendations = entry.recommendations.clone();
            let status = if entry.issues.is_empty() {
                ReviewStatus::Approved
            } else {
                ReviewStatus::NeedsImprovement
            };
            phase.status = Some(status_str(status).to_string());
        }
        PhaseType::ImproverRefinement => {
            phase.improvements = entry.improvements.clone();
            phase.output = Some(fill(&entry.refined_output, project, idea));
        }
        PhaseType::FinalApproval => {
            phase.validations = entry.validations.clone();
            phase.quality_score = Some(entry.quality_score);
            phase.status = Some(status_str(ReviewStatus::Approved).to_string());
        }
    }
    phase
}

pub(crate) fn status_str(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Approved => "approved",
        ReviewStatus::NeedsImprovement => "needs_improvement",
    }
}

/// Catalog wireframes described in text, with images when available.
///
/// Uses a fixed seed so the extra pick for Home-only prompts is stable.
pub fn wireframes(prompt: &str, catalog: &WireframeCatalog) -> Vec<Wireframe> {
    let mut rng = StdRng::seed_from_u64(0);
    catalog
        .select_entries(prompt, &mut rng)
        .into_iter()
        .map(|entry| describe(catalog.load(entry), entry))
        .collect()
}

fn describe(mut wireframe: Wireframe, entry: &CatalogEntry) -> Wireframe {
    let (layout, components, interactions): (&str, &[&str], &[&str]) = match entry.id {
        "wf2" => (
            "Sidebar navigation with a grid of summary cards and a main chart area",
            &["Sidebar", "StatCard", "Chart", "RecentActivity"],
            &["Filter by date range", "Open item details"],
        ),
        "wf3" => (
            "Single column with mission statement, team grid and history timeline",
            &["Header", "TeamGrid", "Timeline", "Footer"],
            &["Open team member profile"],
        ),
        "wf4" => (
            "Two columns: contact form on the left, details and map on the right",
            &["Header", "ContactForm", "ContactDetails", "Footer"],
            &["Submit form with validation", "Copy email address"],
        ),
        _ => (
            "Top navigation, full-width hero with call to action, three feature cards",
            &["NavBar", "Hero", "FeatureCard", "Footer"],
            &["Click primary call to action", "Navigate between sections"],
        ),
    };
    wireframe.layout = Some(layout.to_string());
    wireframe.components = components.iter().map(|c| c.to_string()).collect();
    wireframe.interactions = interactions.iter().map(|i| i.to_string()).collect();
    wireframe
}

const PAGE_TEMPLATE: &str = r#"import React from "react"

interface {component}Props {
  title?: string
}

export default function {component}({ title = "{screen}" }: {component}Props) {
  return (
    <main className="min-h-screen bg-slate-950 text-white">
      <section className="mx-auto max-w-5xl px-6 py-16">
        <h1 className="text-4xl font-bold">{title}</h1>
        <p className="mt-4 text-slate-300">{description}</p>
      </section>
    </main>
  )
}
"#;

const APP_TEMPLATE: &str = r#"import React from "react"
{imports}

export default function App() {
  const [page, setPage] = React.useState("{first}")

  return (
    <div>
      <nav className="flex gap-4 p-4">
{links}
      </nav>
{pages}
    </div>
  )
}
"#;

fn component_name(screen: &str) -> String {
    let base: String = screen
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();
    if base.is_empty() {
        "ScreenPage".to_string()
    } else {
        format!("{}Page", base)
    }
}

/// React components for each wireframe plus an app shell.
pub fn frontend_code(project: &str, wireframes: &[Wireframe]) -> Vec<CodeFile> {
    let screens: Vec<(String, &Wireframe)> = wireframes.iter().map(|w| (component_name(&w.name), w)).collect();

    let mut files: Vec<CodeFile> = screens
        .iter()
        .map(|(component, wireframe)| {
            let code = PAGE_TEMPLATE
                .replace("{component}", component)
                .replace("{screen}", &wireframe.name)
                .replace("{description}", &wireframe.description);
            CodeFile::new(format!("components/{}.tsx", component), "tsx", code)
                .with_description(format!("{} screen for {}", wireframe.name, project))
        })
        .collect();

    let imports = screens
        .iter()
        .map(|(c, _)| format!("import {c} from \"../components/{c}\"", c = c))
        .collect::<Vec<_>>()
        .join("\n");
    let links = screens
        .iter()
        .map(|(c, w)| format!("        <button onClick={{() => setPage(\"{}\")}}>{}</button>", c, w.name))
        .collect::<Vec<_>>()
        .join("\n");
    let pages = screens
        .iter()
        .map(|(c, _)| format!("      {{page === \"{c}\" && <{c} />}}", c = c))
        .collect::<Vec<_>>()
        .join("\n");
    let first = screens.first().map(|(c, _)| c.as_str()).unwrap_or("HomePage");
    let app = APP_TEMPLATE
        .replace("{imports}", &imports)
        .replace("{first}", first)
        .replace("{links}", &links)
        .replace("{pages}", &pages);
    files.push(CodeFile::new("app/page.tsx", "tsx", app).with_description(format!("{} app shell", project)));
    files
}

const ROUTE_TEMPLATE: &str = r#"import { NextResponse } from "next/server"
import { db } from "@/lib/db"
import type { Item } from "@/types"

export async function GET() {
  const items: Item[] = await db.query("SELECT * FROM items ORDER BY created_at DESC")
  return NextResponse.json({ items })
}

export async function POST(request: Request) {
  const body = await request.json()
  if (typeof body.title !== "string" || body.title.trim() === "") {
    return NextResponse.json({ error: "title is required" }, { status: 400 })
  }
  const [item] = await db.query("INSERT INTO items (title) VALUES ($1) RETURNING *", [body.title])
  return NextResponse.json({ item }, { status: 201 })
}
"#;

const DB_TEMPLATE: &str = r#"import { Pool } from "pg"

const pool = new Pool({
  connectionString: process.env.DATABASE_URL ?? "postgres://localhost/{database}",
})

export const db = {
  async query(text: string, params: unknown[] = []) {
    const result = await pool.query(text, params)
    return result.rows
  },
}
"#;

const TYPES_TEMPLATE: &str = r#"export interface User {
  id: number
  email: string
  createdAt: string
}

export interface Item {
  id: number
  userId: number
  title: string
  completed: boolean
  createdAt: string
}
"#;

const SCHEMA_TEMPLATE: &str = r#"-- Schema for {project}
CREATE TABLE users (
  id SERIAL PRIMARY KEY,
  email TEXT NOT NULL UNIQUE,
  created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE items (
  id SERIAL PRIMARY KEY,
  user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
  title TEXT NOT NULL,
  completed BOOLEAN NOT NULL DEFAULT false,
  created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

/// API route, database helper, shared types and SQL schema.
pub fn backend_code(project: &str) -> Vec<CodeFile> {
    let database: String = project
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    vec![
        CodeFile::new("api/items/route.ts", "typescript", ROUTE_TEMPLATE).with_description("Item API routes"),
        CodeFile::new("lib/db.ts", "typescript", DB_TEMPLATE.replace("{database}", &database))
            .with_description("Database connection"),
        CodeFile::new("types/index.ts", "typescript", TYPES_TEMPLATE).with_description("Shared types"),
        CodeFile::new("schema.sql", "sql", SCHEMA_TEMPLATE.replace("{project}", project))
            .with_description("Database schema"),
    ]
}

/// Attach canned artifacts of `kind` to an initial-output phase.
pub fn attach_artifacts(
    phase: &mut Phase,
    kind: ArtifactKind,
    project: &str,
    prompt: &str,
    catalog: &WireframeCatalog,
    wireframes_so_far: &[Wireframe],
) {
    match kind {
        ArtifactKind::Wireframes => phase.wireframes = Some(wireframes(prompt, catalog)),
        ArtifactKind::Frontend => {
            let screens = if wireframes_so_far.is_empty() {
                wireframes(prompt, catalog)
            } else {
                wireframes_so_far.to_vec()
            };
            phase.frontend_code = Some(frontend_code(project, &screens));
        }
        ArtifactKind::Backend => phase.backend_code = Some(backend_code(project)),
    }
}

/// Canned agent with all four phases and any artifacts it owns.
pub fn agent(
    entry: &RosterEntry,
    index: usize,
    project: &str,
    prompt: &str,
    catalog: &WireframeCatalog,
    wireframes_so_far: &[Wireframe],
) -> Agent {
    let mut agent = Agent::new(index as u32 + 1, &entry.name, &entry.role, &entry.color);
    for phase_type in PhaseType::ORDER {
        let mut phase = phase(entry, index, phase_type, project, prompt);
        if phase_type == PhaseType::InitialOutput {
            if let Some(kind) = entry.artifact {
                attach_artifacts(&mut phase, kind, project, prompt, catalog, wireframes_so_far);
            }
        }
        agent.phases.push(phase);
    }
    agent
}

/// A complete workflow for `prompt` built only from the roster.
pub fn workflow(prompt: &str, roster: &Roster, catalog: &WireframeCatalog) -> WorkflowData {
    let project = project_name(prompt);
    let mut agents: Vec<Agent> = Vec::with_capacity(roster.len());
    for (index, entry) in roster.entries().iter().enumerate() {
        let screens = collected_wireframes(&agents);
        agents.push(agent(entry, index, &project, prompt, catalog, &screens));
    }

    WorkflowData {
        user_prompt: prompt.to_string(),
        clarified_brief: brief(&project, prompt),
        project_name: project,
        agent_workflow: agents,
    }
}

pub fn brief(project: &str, prompt: &str) -> ClarifiedBrief {
    ClarifiedBrief {
        title: project.to_string(),
        description: format!("A focused product that delivers: {}", prompt),
    }
}

pub(crate) fn collected_wireframes(agents: &[Agent]) -> Vec<Wireframe> {
    agents
        .iter()
        .flat_map(|a| a.phases.iter())
        .filter_map(|p| p.wireframes.clone())
        .flatten()
        .collect()
}

/// Critic verdict derived from the feedback text alone.
pub fn feedback(request: &FeedbackRequest) -> FeedbackResponse {
    let artifact = if request.artifact_type.trim().is_empty() {
        "artifact"
    } else {
        request.artifact_type.trim()
    };
    let text = request.feedback.trim();

    let critic_review = if text.is_empty() {
        CriticReview {
            strengths: vec![format!("The {} covers the requested scope", artifact)],
            issues: Vec::new(),
            recommendations: Vec::new(),
            status: ReviewStatus::Approved,
        }
    } else {
        CriticReview {
            strengths: vec![format!("The {} covers the requested scope", artifact)],
            issues: vec![Issue::new("medium", format!("User feedback: {}", text))],
            recommendations: vec![format!("Revise the {} to address: {}", artifact, text)],
            status: ReviewStatus::NeedsImprovement,
        }
    };

    let improvements = if text.is_empty() {
        Vec::new()
    } else {
        vec![Improvement::new(
            text,
            format!("Revised the {} to address the feedback: {}", artifact, text),
        )]
    };

    FeedbackResponse {
        critic_review,
        improvements,
        updated_artifact: request.artifact_data.clone(),
    }
}

pub const THINKING_FALLBACK: &str = "Thinking about the task...";

pub const REGENERATE_FALLBACK: &str = "Regenerated output based on feedback";

/// First-person musings from the roster, or a generic line for unknown agents.
pub fn thinking(roster: &Roster, agent_name: &str, prompt: &str) -> String {
    match roster.find(agent_name) {
        Some(entry) if !entry.thoughts.is_empty() => {
            let mut text = format!("Okay, \"{}\". ", prompt.trim());
            text.push_str(&entry.thoughts.join(". "));
            text.push('.');
            text
        }
        _ => THINKING_FALLBACK.to_string(),
    }
}

/// Plain-text PRD with every standard section.
pub fn prd_document(prd_content: &str, project: &str, prompt: &str) -> String {
    let mut doc = format!("PRODUCT REQUIREMENTS DOCUMENT\n{}\n\n", project);
    for (i, section) in PRD_SECTIONS.iter().enumerate() {
        doc.push_str(&format!("{}. {}\n", i + 1, section.to_uppercase()));
        let body = match *section {
            "Executive Summary" => format!("{} turns the idea \"{}\" into a shippable product.", project, prompt),
            "Project Overview" if !prd_content.trim().is_empty() => prd_content.trim().to_string(),
            "Project Overview" => format!("Original idea: {}", prompt),
            _ => "To be refined with the product team.".to_string(),
        };
        doc.push_str(&body);
        doc.push_str("\n\n");
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name() {
        assert_eq!(project_name("Build a todo app"), "TodoApp");
        assert_eq!(project_name("recipe sharing platform for chefs"), "RecipeSharingApp");
        assert_eq!(project_name("   "), "FlowProject");
    }

    #[test]
    fn test_timestamps_follow_timeline() {
        assert_eq!(timestamp(0, PhaseType::InitialOutput), "00:00:02");
        assert_eq!(timestamp(0, PhaseType::FinalApproval), "00:00:06");
        assert_eq!(timestamp(2, PhaseType::InitialOutput), "00:00:18");
        assert_eq!(timestamp(7, PhaseType::FinalApproval), "00:01:02");
    }

    #[test]
    fn test_fallback_workflow_shape() {
        let roster = Roster::builtin().unwrap();
        let workflow = workflow("Build a todo app", &roster, &WireframeCatalog::new());

        assert_eq!(workflow.project_name, "TodoApp");
        assert_eq!(workflow.agent_workflow.len(), 7);
        for agent in &workflow.agent_workflow {
            let types: Vec<_> = agent.phases.iter().map(|p| p.phase_type).collect();
            assert_eq!(types, PhaseType::ORDER.to_vec());
        }
        assert_eq!(workflow.agent_index_for(ArtifactKind::Wireframes), Some(2));
        assert_eq!(workflow.agent_index_for(ArtifactKind::Frontend), Some(3));
        assert_eq!(workflow.agent_index_for(ArtifactKind::Backend), Some(4));

        let frontend = workflow.agent_workflow[3].phases[0].frontend_code.as_ref().unwrap();
        let screens = workflow.agent_workflow[2].phases[0].wireframes.as_ref().unwrap();
        assert_eq!(frontend.len(), screens.len() + 1);
        assert!(frontend.iter().any(|f| f.path == "components/HomePage.tsx"));

        // Same input, same output.
        assert_eq!(workflow, super::workflow("Build a todo app", &roster, &WireframeCatalog::new()));
    }

    #[test]
    fn test_feedback_fallback_status() {
        let request = FeedbackRequest {
            artifact_type: "wireframes".to_string(),
            feedback: "needs better spacing".to_string(),
            artifact_data: serde_json::json!({"id": "wf1"}),
            ..Default::default()
        };
        let response = feedback(&request);
        assert_eq!(response.critic_review.status, ReviewStatus::NeedsImprovement);
        assert!(!response.improvements.is_empty());
        assert_eq!(response.updated_artifact, serde_json::json!({"id": "wf1"}));

        let empty = feedback(&FeedbackRequest::default());
        assert_eq!(empty.critic_review.status, ReviewStatus::Approved);
        assert!(empty.improvements.is_empty());
    }

    #[test]
    fn test_prd_document_has_sections() {
        let doc = prd_document("Users track tasks.", "TodoApp", "Build a todo app");
        for section in PRD_SECTIONS {
            assert!(doc.contains(&section.to_uppercase()));
        }
        assert!(doc.contains("Users track tasks."));
    }
}
