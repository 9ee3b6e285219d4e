//! Session documents, artifact jobs and review views.

use std::time::Duration;

use actix_web::{web, HttpResponse};
use tracing::{info, warn};

use flow_core::{ArtifactBundle, ArtifactKind, PendingArtifactJob, WorkflowData};
use flow_store::Document;

use crate::error::ApiError;
use crate::state::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/sessions")
            .route(web::post().to(create_session))
            .route(web::get().to(list_sessions)),
    );
    cfg.service(
        web::resource("/api/sessions/{id}")
            .route(web::get().to(get_session))
            .route(web::delete().to(clear_session)),
    );
    cfg.service(
        web::resource("/api/sessions/{id}/workflow")
            .route(web::get().to(get_document::<WorkflowData>))
            .route(web::put().to(put_document::<WorkflowData>))
            .route(web::delete().to(delete_document::<WorkflowData>)),
    );
    cfg.service(
        web::resource("/api/sessions/{id}/artifact")
            .route(web::get().to(get_document::<ArtifactBundle>))
            .route(web::put().to(put_document::<ArtifactBundle>))
            .route(web::delete().to(delete_document::<ArtifactBundle>)),
    );
    cfg.service(
        web::resource("/api/sessions/{id}/pending-job")
            .route(web::get().to(get_document::<PendingArtifactJob>))
            .route(web::put().to(put_document::<PendingArtifactJob>))
            .route(web::delete().to(delete_document::<PendingArtifactJob>)),
    );
    cfg.service(web::resource("/api/sessions/{id}/artifact-job").route(web::post().to(run_artifact_job)));
    cfg.service(web::resource("/api/sessions/{id}/review/{kind}").route(web::get().to(review_artifact)));
}

async fn create_session(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let id = state.store.create_session()?;
    info!("Created session {}", id);
    Ok(HttpResponse::Created().json(serde_json::json!({ "sessionId": id })))
}

async fn list_sessions(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let sessions = state
        .store
        .sessions()?
        .iter()
        .map(|id| state.store.summary(id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "sessions": sessions })))
}

async fn get_session(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.store.summary(&path)?))
}

async fn clear_session(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    state.playbacks.stop(&id).await;
    let cleared = state.store.clear(&id)?;
    if !cleared {
        return Err(ApiError::NotFound(format!("Session not found: {}", id)));
    }
    info!("Cleared session {}", id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "sessionId": id, "cleared": true })))
}

async fn get_document<D: Document>(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    state.store.require(&id)?;
    match state.store.load::<D>(&id)? {
        Some(doc) => Ok(HttpResponse::Ok().json(doc)),
        None => Err(ApiError::NotFound(format!("No {} stored for session {}", D::KEY, id))),
    }
}

async fn put_document<D: Document>(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<D>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    state.store.require(&id)?;
    state.store.save(&id, &body.into_inner())?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "sessionId": id, "saved": D::KEY })))
}

async fn delete_document<D: Document>(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    state.store.require(&id)?;
    let removed = state.store.remove::<D>(&id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "sessionId": id, "removed": removed })))
}

/// Page that displays artifacts of `kind`.
fn review_page(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Wireframes => "/wireframes",
        ArtifactKind::Frontend => "/frontend-code",
        ArtifactKind::Backend => "/backend-code",
    }
}

/// Run the stored pending job under the configured timeout.
///
/// The job descriptor is removed whatever the outcome, so an abandoned job
/// never blocks the next one.
async fn run_artifact_job(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut workflow = state.require_workflow(&id)?;
    let job = state
        .store
        .load::<PendingArtifactJob>(&id)?
        .ok_or_else(|| ApiError::redirect("No pending artifact job for this session", "/workflow"))?;

    let limit = Duration::from_secs(state.config.jobs.timeout_secs.max(1));
    let outcome = tokio::time::timeout(limit, state.studio.run_artifact_job(&job, &mut workflow)).await;
    state.store.remove::<PendingArtifactJob>(&id)?;

    let bundle = match outcome {
        Ok(result) => result?,
        Err(_) => {
            warn!("{} job for session {} timed out after {:?}", job.kind.as_str(), id, limit);
            return Err(ApiError::redirect("Artifact generation timed out", "/ideas"));
        }
    };

    if job.kind == ArtifactKind::Wireframes {
        state.store.save::<WorkflowData>(&id, &workflow)?;
    }
    state.store.save::<ArtifactBundle>(&id, &bundle)?;
    info!("Stored {} artifacts for session {}", job.kind.as_str(), id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "artifact": bundle,
        "redirect": review_page(job.kind),
    })))
}

/// Artifacts for a review page, or a redirect back to the workflow when
/// there is nothing to show.
async fn review_artifact(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, kind) = path.into_inner();
    let kind: ArtifactKind = kind.parse().map_err(ApiError::BadRequest)?;
    state.store.require(&id)?;

    match state.store.load::<ArtifactBundle>(&id)? {
        Some(bundle) if bundle.has(kind) => Ok(HttpResponse::Ok().json(bundle)),
        _ => Err(ApiError::redirect(
            format!("No {} available for review", kind.as_str()),
            "/workflow",
        )),
    }
}
