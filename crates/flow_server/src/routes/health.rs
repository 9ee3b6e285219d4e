use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
}

async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "FlowMaster API",
        "version": VERSION,
        "providers": state.studio.chain().describe(),
        "activePlaybacks": state.playbacks.active(),
    }))
}
