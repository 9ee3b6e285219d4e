//! Generation endpoints: workflow, wireframes and code.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::TryStreamExt;
use tracing::{debug, info};

use flow_agents::{BackendCodeRequest, FrontendCodeRequest, IdeaInput, WireframeSelectionRequest, WireframesRequest};
use flow_core::{PendingArtifactJob, SimulationState, WorkflowData};
use flow_llm::ImageInput;

use crate::error::ApiError;
use crate::state::AppState;

/// Upper bound for a single multipart field.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/generate-workflow").route(web::post().to(generate_workflow)));
    cfg.service(web::resource("/api/generate-wireframes").route(web::post().to(generate_wireframes)));
    cfg.service(web::resource("/api/select-wireframes").route(web::post().to(select_wireframes)));
    cfg.service(web::resource("/api/generate-frontend-code").route(web::post().to(generate_frontend_code)));
    cfg.service(web::resource("/api/generate-backend-code").route(web::post().to(generate_backend_code)));
}

#[derive(Debug, Default)]
struct WorkflowForm {
    idea: IdeaInput,
    session_id: Option<String>,
}

fn form_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::bad_request(format!("Invalid form data: {}", err))
}

fn field_text(name: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
    String::from_utf8(bytes).map_err(|_| ApiError::bad_request(format!("Form field {} is not valid UTF-8", name)))
}

async fn read_form(mut payload: Multipart) -> Result<WorkflowForm, ApiError> {
    let mut form = WorkflowForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(form_error)? {
        let name = field.content_disposition().get_name().unwrap_or_default().to_string();
        let mime = field.content_type().map(|m| m.essence_str().to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(form_error)? {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(ApiError::bad_request(format!("Form field {} exceeds 10 MiB", name)));
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "text" => form.idea.text = Some(field_text(&name, bytes)?),
            "voiceText" => form.idea.voice_text = Some(field_text(&name, bytes)?),
            "sessionId" => {
                let id = field_text(&name, bytes)?;
                form.session_id = Some(id.trim().to_string()).filter(|id| !id.is_empty());
            }
            "image" if !bytes.is_empty() => {
                let mime = mime.unwrap_or_else(|| "image/png".to_string());
                debug!("Received {} byte {} image", bytes.len(), mime);
                form.idea.image = Some(ImageInput::new(mime, STANDARD.encode(&bytes)));
            }
            other => debug!("Ignoring form field {:?}", other),
        }
    }

    Ok(form)
}

async fn generate_workflow(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload).await?;
    let workflow = state.studio.generate_workflow(&form.idea).await?;

    if let Some(session_id) = &form.session_id {
        state.store.ensure_session(session_id)?;
        state.playbacks.stop(session_id).await;
        state.store.remove::<SimulationState>(session_id)?;
        state.store.remove::<PendingArtifactJob>(session_id)?;
        state.store.save::<WorkflowData>(session_id, &workflow)?;
        info!("Stored workflow {} in session {}", workflow.project_name, session_id);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "workflow": workflow })))
}

async fn generate_wireframes(
    state: web::Data<AppState>,
    body: web::Json<WireframesRequest>,
) -> Result<HttpResponse, ApiError> {
    let wireframes = state.studio.generate_wireframes(&body).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "wireframes": wireframes })))
}

async fn select_wireframes(
    state: web::Data<AppState>,
    body: web::Json<WireframeSelectionRequest>,
) -> Result<HttpResponse, ApiError> {
    let wireframes = state.studio.select_wireframes(&body);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "wireframes": wireframes })))
}

async fn generate_frontend_code(
    state: web::Data<AppState>,
    body: web::Json<FrontendCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    let code = state.studio.generate_frontend_code(&body).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "frontendCode": code })))
}

async fn generate_backend_code(
    state: web::Data<AppState>,
    body: web::Json<BackendCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    let code = state.studio.generate_backend_code(&body).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "backendCode": code })))
}
