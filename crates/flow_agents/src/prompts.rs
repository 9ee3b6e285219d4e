//! Prompt text for each generation task.

use serde_json::Value;

use crate::roster::Roster;

pub const JSON_ONLY_SYSTEM: &str =
    "Always return valid JSON only, no markdown formatting, no code fences, no commentary.";

pub const BACKEND_SYSTEM: &str = "You are a Backend Engineer Agent creating API routes and database schemas. \
Always return valid JSON only, no markdown formatting.";

const WORKFLOW_RULES: &str = r#"IMPORTANT:
- Every agent has exactly four phases in this order: initial_output, critic_review, improver_refinement, final_approval
- UX Designer Agent (step 3) MUST include a "wireframes" array in its initial_output phase
- Frontend Engineer Agent (step 4) MUST include a "frontendCode" array in its initial_output phase
- Backend Engineer Agent (step 5) MUST include a "backendCode" array in its initial_output phase
- critic_review phases carry strengths, issues [{"severity", "description"}], recommendations and a status of "approved" or "needs_improvement"
- final_approval phases carry validations, a qualityScore between 0 and 100 and status "approved"
- Timestamps use the form "00:00:SS"

CRITICAL: Return ONLY a valid JSON object with NO markdown formatting, NO code blocks and NO extra text. Start with { and end with }."#;

/// Render a JSON value for inclusion in a prompt.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Full workflow simulation prompt.
pub fn workflow(user_input: &str, user_prompt: &str, roster: &Roster) -> String {
    let agents = roster
        .entries()
        .iter()
        .map(|e| {
            format!(
                "  {}. {} ({}), color {}",
                e.step, e.name, e.role, e.color
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r##"You are FlowMaster - an AI system that simulates a multi-agent workflow collaboration.

Given this user idea:
{user_input}
Generate a COMPLETE workflow simulation showing these {count} agents working sequentially with realistic feedback cycles:
{agents}

{rules}

{{
  "userPrompt": {prompt_json},
  "projectName": "ProjectName",
  "clarifiedBrief": {{"title": "Brief title", "description": "Clear description of what's being built"}},
  "agentWorkflow": [
    {{
      "step": 1,
      "agent": "CEO Agent",
      "role": "Defines vision and strategy",
      "color": "#00d4ff",
      "phases": [
        {{"type": "initial_output", "thoughts": ["..."], "output": "...", "timestamp": "00:00:02"}},
        {{"type": "critic_review", "strengths": ["..."], "issues": [{{"severity": "medium", "description": "..."}}], "recommendations": ["..."], "status": "needs_improvement", "timestamp": "00:00:03"}},
        {{"type": "improver_refinement", "improvements": ["..."], "output": "...", "timestamp": "00:00:05"}},
        {{"type": "final_approval", "validations": ["..."], "qualityScore": 92, "status": "approved", "timestamp": "00:00:06"}}
      ]
    }}
  ]
}}"##,
        user_input = user_input,
        count = roster.len(),
        agents = agents,
        rules = WORKFLOW_RULES,
        prompt_json = Value::String(user_prompt.to_string()),
    )
}

pub fn wireframes(prd: &str, requirements: &Value, user_prompt: &str) -> String {
    format!(
        r#"You are a UX Designer Agent creating wireframes for a project.

Project Requirements:
{requirements}

PRD Summary:
{prd}

User Prompt: {user_prompt}

Generate detailed wireframe descriptions for the main screens. For each wireframe provide the screen name, a description of layout and components, key user interactions and the component hierarchy.

Return JSON format:
{{
  "wireframes": [
    {{
      "id": "wf1",
      "name": "Homepage",
      "description": "Detailed wireframe description",
      "layout": "Description of layout structure",
      "components": ["Component1", "Component2"],
      "interactions": ["Interaction1", "Interaction2"]
    }}
  ]
}}"#,
        requirements = render_value(requirements),
        prd = prd,
        user_prompt = user_prompt,
    )
}

pub fn frontend(wireframes: &Value, requirements: &Value, user_prompt: &str) -> String {
    format!(
        r#"You are a Frontend Engineer Agent creating React/Next.js components.

Wireframes:
{wireframes}

Requirements: {requirements}
User Prompt: {user_prompt}

Generate React/Next.js component code based on the wireframes, with Tailwind CSS styling, typed props and basic functionality.

Return JSON format:
{{
  "frontendCode": [
    {{
      "path": "components/HomePage.tsx",
      "code": "// Complete React component code here",
      "language": "tsx",
      "description": "Homepage component"
    }}
  ]
}}"#,
        wireframes = render_value(wireframes),
        requirements = render_value(requirements),
        user_prompt = user_prompt,
    )
}

pub fn backend(requirements: &Value, user_prompt: &str, frontend_code: &Value) -> String {
    format!(
        r#"Create backend code for this project.

Requirements: {requirements}
User Prompt: {user_prompt}
Frontend Code Context: {frontend}

Generate 3-4 essential backend files:
1. api/users/route.ts - API route handlers
2. lib/db.ts - database connection
3. types/index.ts - TypeScript types
4. schema.sql - database schema

Return JSON format:
{{
  "backendCode": [
    {{"path": "api/users/route.ts", "code": "...", "language": "typescript", "description": "User API routes"}}
  ]
}}"#,
        requirements = render_value(requirements),
        user_prompt = user_prompt,
        frontend = render_value(frontend_code),
    )
}

pub fn regenerate(
    agent_name: &str,
    agent_role: &str,
    previous_output: &str,
    feedback: &str,
    user_prompt: &str,
    requirements: &Value,
) -> String {
    format!(
        r#"You are {agent_name}, responsible for: {agent_role}.

Project: {user_prompt}
Requirements: {requirements}

Your previous output was:
{previous_output}

The user gave this feedback:
{feedback}

Rewrite your output so it fully addresses the feedback while keeping what already worked. Return only the revised output text."#,
        agent_name = agent_name,
        agent_role = agent_role,
        user_prompt = user_prompt,
        requirements = render_value(requirements),
        previous_output = previous_output,
        feedback = feedback,
    )
}

pub fn artifact_feedback(artifact_type: &str, artifact: &Value, feedback: &str, workflow: &Value) -> String {
    format!(
        r#"You are a Critic Agent reviewing {artifact_type} based on user feedback.

Artifact:
{artifact}

User feedback:
{feedback}

Workflow context:
{workflow}

Review the artifact against the feedback. List strengths, issues with a severity of high, medium or low, and recommendations. If the status is "needs_improvement", also act as the Improver Agent: describe each improvement and return the updated artifact.

Return JSON format:
{{
  "criticReview": {{
    "strengths": ["..."],
    "issues": [{{"severity": "low|medium|high", "description": "..."}}],
    "recommendations": ["..."],
    "status": "approved|needs_improvement"
  }},
  "improvements": [{{"issue": "...", "solution": "..."}}],
  "updatedArtifact": {{}}
}}"#,
        artifact_type = artifact_type,
        artifact = render_value(artifact),
        feedback = feedback,
        workflow = render_value(workflow),
    )
}

pub fn thinking_system(agent_name: &str, agent_role: &str) -> String {
    format!(
        "You are {}, a {}. Share your inner stream of consciousness as you start working: \
         short first-person sentences, concrete and specific to the project. No lists, no headings.",
        agent_name, agent_role
    )
}

pub fn thinking(user_prompt: &str) -> String {
    format!("The project is: {}\n\nWhat are you thinking as you begin?", user_prompt)
}

/// Sections every PRD document contains, in order.
pub const PRD_SECTIONS: [&str; 8] = [
    "Executive Summary",
    "Project Overview",
    "Objectives and Goals",
    "User Stories",
    "Functional Requirements",
    "Technical Requirements",
    "Success Metrics",
    "Timeline and Milestones",
];

pub fn prd(prd_content: &str, project_name: &str, user_prompt: &str) -> String {
    let sections = PRD_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Create a professional Product Requirements Document for {project_name}.

Original idea: {user_prompt}

Working notes:
{prd_content}

Use these sections:
{sections}

Return plain text suitable for export. Do not use markdown."#,
        project_name = project_name,
        user_prompt = user_prompt,
        prd_content = prd_content,
        sections = sections,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_prompt_lists_roster() {
        let roster = Roster::builtin().unwrap();
        let prompt = workflow("Text idea: todo\n", "todo \"app\"", &roster);
        assert!(prompt.contains("7. Global Critic Agent"));
        assert!(prompt.contains(r#""userPrompt": "todo \"app\"""#));
        assert!(prompt.contains("frontendCode"));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&Value::String("plain".into())), "plain");
        assert_eq!(render_value(&Value::Null), "");
        assert!(render_value(&serde_json::json!({"a": 1})).contains("\"a\": 1"));
    }
}
