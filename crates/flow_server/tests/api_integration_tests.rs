//! HTTP-level tests against an in-process service with no providers.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::{header, StatusCode};
use async_trait::async_trait;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use tempfile::tempdir;

use flow_agents::AgentStudio;
use flow_core::{ArtifactBundle, ArtifactKind, PendingArtifactJob, PhaseType, WorkflowData};
use flow_llm::{Completion, CompletionProvider, CompletionRequest, LlmError, LlmResult, ProviderChain, ProviderKind};
use flow_server::{routes, AppState, FlowConfig};
use flow_store::SessionStore;

fn state(root: &std::path::Path) -> AppState {
    let mut config = FlowConfig::default();
    config.playback.profile = flow_core::PacingProfile::Instant;
    let studio = AgentStudio::builtin(ProviderChain::empty()).unwrap();
    AppState::new(config, SessionStore::file(root), studio)
}

/// Provider that never answers within a test's patience.
struct StalledProvider;

#[async_trait]
impl CompletionProvider for StalledProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    fn model(&self) -> String {
        "stalled".to_string()
    }

    async fn complete(&self, _request: &CompletionRequest) -> LlmResult<Completion> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(LlmError::NotConfigured)
    }
}

const BOUNDARY: &str = "flowmaster-test-boundary";

fn multipart(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body.into_bytes()
}

#[actix_web::test]
async fn test_health() {
    let dir = tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path())))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "FlowMaster API");
    assert_eq!(body["providers"], json!([]));
}

#[actix_web::test]
async fn test_generate_workflow_into_session() {
    let dir = tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path())))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post().uri("/api/sessions").to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let session_id = created["sessionId"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/generate-workflow")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart(&[("text", "Build a todo app"), ("sessionId", &session_id)]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["workflow"]["agentWorkflow"].as_array().unwrap().len(), 7);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/workflow", session_id))
        .to_request();
    let stored: WorkflowData = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stored.user_prompt, "Build a todo app");
    for agent in &stored.agent_workflow {
        let types: Vec<PhaseType> = agent.phases.iter().map(|p| p.phase_type).collect();
        assert_eq!(types, PhaseType::ORDER.to_vec());
    }
}

#[actix_web::test]
async fn test_empty_idea_is_bad_request() {
    let dir = tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path())))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/generate-workflow")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart(&[("text", "   ")]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_regenerate_rejects_invalid_json() {
    let dir = tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path())))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/regenerate-agent-output")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid JSON in request body");

    let req = test::TestRequest::post()
        .uri("/api/regenerate-agent-output")
        .set_json(json!({"agentName": "CEO Agent", "feedback": "more detail"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["regeneratedOutput"], "Regenerated output based on feedback");
    assert!(body["timestamp"].is_string());
}

#[actix_web::test]
async fn test_feedback_and_approval() {
    let dir = tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path())))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/submit-artifact-feedback")
        .set_json(json!({
            "artifactType": "wireframes",
            "artifactData": [{"id": "wf1"}],
            "feedback": "needs better spacing"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let status = body["criticReview"]["status"].as_str().unwrap();
    assert!(status == "approved" || status == "needs_improvement");
    if status == "needs_improvement" {
        assert!(!body["improvements"].as_array().unwrap().is_empty());
    }
    assert_eq!(body["updatedArtifact"], json!([{"id": "wf1"}]));

    let req = test::TestRequest::post()
        .uri("/api/approve-artifact")
        .set_json(json!({"artifactType": "frontend", "artifactId": "app", "workflowId": "w1"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "frontend app approved");
    assert_eq!(body["workflowId"], "w1");

    let req = test::TestRequest::post()
        .uri("/api/generate-pdf")
        .set_json(json!({"prdContent": "Tasks", "projectName": "Tasky"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["filename"], "Tasky_PRD.txt");
}

#[actix_web::test]
async fn test_review_without_artifacts_redirects() {
    let dir = tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(dir.path())))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post().uri("/api/sessions").to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let session_id = created["sessionId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/review/backend", session_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["redirect"], "/workflow");

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/review/database", session_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/sessions/no-such-session/review/backend")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_artifact_job_then_review() {
    let dir = tempdir().unwrap();
    let state = state(dir.path());
    let session_id = state.store.create_session().unwrap();
    let workflow = state
        .studio
        .generate_workflow(&flow_agents::IdeaInput::text("Team dashboard"))
        .await
        .unwrap();
    state.store.save(&session_id, &workflow).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let job = PendingArtifactJob::new(ArtifactKind::Wireframes, 2, &workflow.project_name);
    let req = test::TestRequest::put()
        .uri(&format!("/api/sessions/{}/pending-job", session_id))
        .set_json(&job)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/artifact-job", session_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["redirect"], "/wireframes");
    let names: Vec<&str> = body["artifact"]["wireframes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Home", "Dashboard", "About"]);

    // The job descriptor is consumed.
    assert!(state.store.load::<PendingArtifactJob>(&session_id).unwrap().is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/review/wireframes", session_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/artifact-job", session_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_playback_runs_to_completion() {
    let dir = tempdir().unwrap();
    let state = state(dir.path());
    let session_id = state.store.create_session().unwrap();
    let workflow = state
        .studio
        .generate_workflow(&flow_agents::IdeaInput::text("Build a todo app"))
        .await
        .unwrap();
    state.store.save(&session_id, &workflow).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/playback/pause", session_id))
        .set_json(json!({"paused": true}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/playback", session_id))
        .set_json(json!({"profile": "instant"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["totalAgents"], 7);

    // Wait for the first approval gate.
    let mut gate = Value::Null;
    for _ in 0..100 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/sessions/{}/playback", session_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        if body["pendingApproval"] == json!(0) {
            gate = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(gate["messages"].as_array().unwrap().len(), 4);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/playback/approve", session_id))
        .set_json(json!({"step": 0}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["approved"], true);
    assert_ne!(body["playback"]["pendingApproval"], json!(0));

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/playback/approve", session_id))
        .set_json(json!({"step": 0}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["approved"], false);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/playback/auto-approve", session_id))
        .set_json(json!({"enabled": true}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let mut done = Value::Null;
    for _ in 0..200 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/sessions/{}/playback", session_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        if body["isComplete"] == json!(true) {
            done = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(done["messages"].as_array().unwrap().len(), 28);
    assert_eq!(done["status"], "complete");
}

#[actix_web::test]
async fn test_artifact_job_timeout_redirects_to_ideas() {
    let dir = tempdir().unwrap();
    let store = SessionStore::file(dir.path());
    let session_id = store.create_session().unwrap();
    let workflow = AgentStudio::builtin(ProviderChain::empty())
        .unwrap()
        .generate_workflow(&flow_agents::IdeaInput::text("Build a todo app"))
        .await
        .unwrap();
    store.save(&session_id, &workflow).unwrap();
    store
        .save(
            &session_id,
            &PendingArtifactJob::new(ArtifactKind::Frontend, 3, &workflow.project_name),
        )
        .unwrap();

    let mut config = FlowConfig::default();
    config.jobs.timeout_secs = 1;
    let chain = ProviderChain::empty().with_provider(Arc::new(StalledProvider));
    let studio = AgentStudio::builtin(chain).unwrap();
    let state = AppState::new(config, store, studio);

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/artifact-job", session_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["redirect"], "/ideas");
    assert!(body["error"].as_str().unwrap().contains("timed out"));

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/pending-job", session_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    assert!(state.store.load::<ArtifactBundle>(&session_id).unwrap().is_none());
}

#[actix_web::test]
async fn test_clearing_session_during_playback_sticks() {
    let dir = tempdir().unwrap();
    let state = state(dir.path());
    let session_id = state.store.create_session().unwrap();
    let workflow = state
        .studio
        .generate_workflow(&flow_agents::IdeaInput::text("Build a todo app"))
        .await
        .unwrap();
    state.store.save(&session_id, &workflow).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/playback", session_id))
        .set_json(json!({"profile": "instant", "autoApprove": true}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/sessions/{}", session_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!state.store.exists(&session_id).unwrap());
    assert_eq!(state.playbacks.active(), 0);
}
