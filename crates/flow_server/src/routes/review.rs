//! Review endpoints: regenerate, critic feedback, approvals, thinking and PRD export.

use actix_web::{web, HttpResponse};

use flow_agents::{ApproveRequest, FeedbackRequest, PrdRequest, RegenerateRequest, ThinkingRequest};

use crate::error::ApiError;
use crate::state::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/regenerate-agent-output").route(web::post().to(regenerate_output)));
    cfg.service(web::resource("/api/submit-artifact-feedback").route(web::post().to(submit_feedback)));
    cfg.service(web::resource("/api/approve-artifact").route(web::post().to(approve_artifact)));
    cfg.service(web::resource("/api/generate-agent-thinking").route(web::post().to(agent_thinking)));
    cfg.service(web::resource("/api/generate-pdf").route(web::post().to(generate_pdf)));
}

async fn regenerate_output(
    state: web::Data<AppState>,
    body: web::Json<RegenerateRequest>,
) -> Result<HttpResponse, ApiError> {
    let output = state.studio.regenerate_output(&body).await;
    Ok(HttpResponse::Ok().json(output))
}

async fn submit_feedback(
    state: web::Data<AppState>,
    body: web::Json<FeedbackRequest>,
) -> Result<HttpResponse, ApiError> {
    let response = state.studio.review_artifact(&body).await;
    Ok(HttpResponse::Ok().json(response))
}

async fn approve_artifact(
    state: web::Data<AppState>,
    body: web::Json<ApproveRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.artifact_type.trim().is_empty() {
        return Err(ApiError::bad_request("artifactType is required"));
    }
    Ok(HttpResponse::Ok().json(state.studio.approve_artifact(&body)))
}

async fn agent_thinking(
    state: web::Data<AppState>,
    body: web::Json<ThinkingRequest>,
) -> Result<HttpResponse, ApiError> {
    let thinking = state.studio.agent_thinking(&body).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "thinking": thinking })))
}

async fn generate_pdf(state: web::Data<AppState>, body: web::Json<PrdRequest>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.studio.prd_document(&body).await))
}
