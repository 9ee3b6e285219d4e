//! End-to-end checks of the agent services without a provider.

use flow_agents::{AgentStudio, FeedbackRequest, IdeaInput, ReviewStatus, WireframeCatalog};
use flow_core::{ArtifactKind, PendingArtifactJob, PhaseType};
use flow_llm::ProviderChain;
use tempfile::tempdir;

fn studio() -> AgentStudio {
    AgentStudio::builtin(ProviderChain::empty()).unwrap()
}

#[tokio::test]
async fn test_todo_app_workflow_is_complete() {
    let workflow = studio()
        .generate_workflow(&IdeaInput::text("Build a todo app"))
        .await
        .unwrap();

    assert_eq!(workflow.user_prompt, "Build a todo app");
    assert_eq!(workflow.agent_workflow.len(), 7);
    for (index, agent) in workflow.agent_workflow.iter().enumerate() {
        assert_eq!(agent.step as usize, index + 1);
        let types: Vec<PhaseType> = agent.phases.iter().map(|p| p.phase_type).collect();
        assert_eq!(types, PhaseType::ORDER.to_vec(), "agent {}", agent.agent);
    }

    let json = serde_json::to_value(&workflow).unwrap();
    assert_eq!(json["agentWorkflow"][0]["phases"][0]["type"], "initial_output");
    assert!(json["agentWorkflow"][3]["phases"][0]["frontendCode"].is_array());
}

#[tokio::test]
async fn test_spacing_feedback_satisfies_status_contract() {
    let response = studio()
        .review_artifact(&FeedbackRequest {
            artifact_type: "wireframes".to_string(),
            artifact_data: serde_json::json!([{"id": "wf1", "name": "Home"}]),
            feedback: "needs better spacing".to_string(),
            ..Default::default()
        })
        .await;

    match response.critic_review.status {
        ReviewStatus::Approved => {}
        ReviewStatus::NeedsImprovement => assert!(!response.improvements.is_empty()),
    }
    let json = serde_json::to_value(&response).unwrap();
    let status = json["criticReview"]["status"].as_str().unwrap();
    assert!(status == "approved" || status == "needs_improvement");
}

#[tokio::test]
async fn test_artifact_jobs_chain_through_workflow() {
    let assets = tempdir().unwrap();
    std::fs::write(assets.path().join("home.png"), b"png").unwrap();
    let studio = studio().with_catalog(WireframeCatalog::new().with_assets_dir(assets.path()));

    let mut workflow = studio
        .generate_workflow(&IdeaInput::text("Contact form for support"))
        .await
        .unwrap();

    let wireframes = studio
        .run_artifact_job(
            &PendingArtifactJob::new(ArtifactKind::Wireframes, 2, &workflow.project_name),
            &mut workflow,
        )
        .await
        .unwrap();
    let selected = wireframes.wireframes.unwrap();
    assert!(selected[0].data.as_deref().unwrap().starts_with("data:image/png;base64,"));
    assert!(selected.iter().any(|w| w.name == "Contact"));

    let frontend = studio
        .run_artifact_job(
            &PendingArtifactJob::new(ArtifactKind::Frontend, 3, &workflow.project_name),
            &mut workflow,
        )
        .await
        .unwrap();
    let code = frontend.frontend_code.unwrap();
    assert!(code.iter().any(|f| f.path == "components/ContactPage.tsx"));
    assert!(frontend.workflow.is_some());
}
