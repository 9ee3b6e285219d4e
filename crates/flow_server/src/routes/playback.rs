//! Playback control for a session's workflow.

use std::time::Duration;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;

use flow_core::{
    PacingProfile, PlaybackHandle, PlaybackMachine, PlaybackOptions, PlaybackSnapshot, PlaybackStatus, SimulationState,
};

use crate::error::ApiError;
use crate::state::{AppState, PlaybackStart};

/// How long a control request waits for the playback task to reflect it.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/sessions/{id}/playback")
            .route(web::post().to(start_playback))
            .route(web::get().to(get_playback))
            .route(web::delete().to(reset_playback)),
    );
    cfg.service(web::resource("/api/sessions/{id}/playback/approve").route(web::post().to(approve_step)));
    cfg.service(web::resource("/api/sessions/{id}/playback/pause").route(web::post().to(set_paused)));
    cfg.service(web::resource("/api/sessions/{id}/playback/auto-approve").route(web::post().to(set_auto_approve)));
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StartBody {
    auto_approve: Option<bool>,
    profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApproveBody {
    step: usize,
}

#[derive(Debug, Deserialize)]
struct PauseBody {
    paused: bool,
}

#[derive(Debug, Deserialize)]
struct AutoApproveBody {
    enabled: bool,
}

fn running(state: &AppState, id: &str) -> Result<PlaybackHandle, ApiError> {
    state
        .playbacks
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("No active playback for session {}", id)))
}

/// Wait briefly for the task to reach a state matching `predicate`.
async fn settle<F>(handle: &PlaybackHandle, predicate: F) -> PlaybackSnapshot
where
    F: FnMut(&PlaybackSnapshot) -> bool,
{
    match tokio::time::timeout(SETTLE_TIMEOUT, handle.wait_until(predicate)).await {
        Ok(Ok(snapshot)) => snapshot,
        _ => handle.snapshot(),
    }
}

async fn start_playback(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<StartBody>>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let workflow = state.require_workflow(&id)?;

    let profile = match body.profile.as_deref() {
        Some(name) => name.parse::<PacingProfile>()?,
        None => state.config.playback.profile,
    };
    let params = PlaybackStart {
        profile,
        auto_approve: body.auto_approve.unwrap_or(state.config.playback.auto_approve),
    };

    let handle = state.playbacks.start(&state.store, &id, workflow, params)?;
    if let Some(enabled) = body.auto_approve {
        handle.set_auto_approve(enabled)?;
    }
    let snapshot = settle(&handle, |s| s.status != PlaybackStatus::Idle).await;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Live snapshot, or the stored progress when no task is running.
async fn get_playback(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if let Some(handle) = state.playbacks.get(&id) {
        return Ok(HttpResponse::Ok().json(handle.snapshot()));
    }

    let workflow = state.require_workflow(&id)?;
    let saved = state.store.load::<SimulationState>(&id)?;
    let options = PlaybackOptions::default()
        .with_profile(state.config.playback.profile)
        .with_auto_approve(state.config.playback.auto_approve);
    let machine = PlaybackMachine::restore(workflow.agent_workflow, saved, options);
    Ok(HttpResponse::Ok().json(machine.snapshot()))
}

/// Stop the task and discard stored progress.
async fn reset_playback(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    state.store.require(&id)?;
    let stopped = state.playbacks.stop(&id).await;
    let removed = state.store.remove::<SimulationState>(&id)?;
    info!("Reset playback for session {}", id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "sessionId": id,
        "stopped": stopped,
        "removed": removed,
    })))
}

async fn approve_step(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ApproveBody>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let handle = running(&state, &id)?;
    let approved = handle.approve(body.step).await?;
    let snapshot = handle.snapshot();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "approved": approved,
        "playback": snapshot,
    })))
}

async fn set_paused(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PauseBody>,
) -> Result<HttpResponse, ApiError> {
    let handle = running(&state, &path)?;
    let paused = body.paused;
    handle.set_paused(paused)?;
    let snapshot = settle(&handle, |s| s.state.is_paused == paused).await;
    Ok(HttpResponse::Ok().json(snapshot))
}

async fn set_auto_approve(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AutoApproveBody>,
) -> Result<HttpResponse, ApiError> {
    let handle = running(&state, &path)?;
    let enabled = body.enabled;
    handle.set_auto_approve(enabled)?;
    let snapshot = settle(&handle, |s| s.auto_approve == enabled).await;
    Ok(HttpResponse::Ok().json(snapshot))
}
