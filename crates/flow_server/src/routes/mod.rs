//! HTTP routes.
//!
//! Each module exposes a `config` function registering its resources.

pub mod generate;
pub mod health;
pub mod playback;
pub mod review;
pub mod sessions;

use actix_web::web;
use tracing::warn;

use crate::error::ApiError;

/// Largest accepted JSON body. Artifacts can carry inline images.
pub const JSON_LIMIT: usize = 16 * 1024 * 1024;

/// Register every route plus the shared JSON extractor settings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    health::config(cfg);
    generate::config(cfg);
    review::config(cfg);
    sessions::config(cfg);
    playback::config(cfg);
}

/// Malformed bodies are answered with `400 {"error": "Invalid JSON in request body"}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| {
            warn!("Rejected request body: {}", err);
            ApiError::bad_request("Invalid JSON in request body").into()
        })
}
