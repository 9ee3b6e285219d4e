//! HTTP server startup.

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::info;

use crate::config::FlowConfig;
use crate::error::ServerResult;
use crate::routes;
use crate::state::AppState;

/// Serve the API until the process is interrupted.
pub async fn run(config: FlowConfig) -> ServerResult<()> {
    let bind_addr = config.bind_addr();
    let state = AppState::from_config(config)?;

    info!("FlowMaster API listening on http://{}", bind_addr);
    info!(
        "Providers: {}",
        if state.studio.chain().is_empty() {
            "none (fallback content)".to_string()
        } else {
            state.studio.chain().describe().join(", ")
        }
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(routes::configure)
    })
    .bind(bind_addr.as_str())?
    .run()
    .await?;

    info!("FlowMaster API stopped");
    Ok(())
}
