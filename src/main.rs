use actix_web::middleware::{Logger, NormalizePath, from_fn};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod gate;
mod model;
mod routes;
mod state;
mod utils;
mod workflow;

use config::Config;
use docs::ApiDoc;
use gate::maintenance_gate;
use state::ServiceStatus;
use workflow::Engine;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    // Resolves before the server binds; never fails, degrades instead.
    let status = Data::new(ServiceStatus::new());
    let store = db::bootstrap::bootstrap(&config.database, &status).await;
    info!(mode = ?status.mode(), live = store.is_live(), "Bootstrap finished");

    let engine = Data::new(Engine::new(store.clone()));
    let store = Data::new(store);
    let openapi = ApiDoc::openapi();
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(maintenance_gate))
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .app_data(store.clone())
            .app_data(engine.clone())
            .app_data(status.clone())
            .app_data(Data::new(config.clone()))
            .service(
                // wildcard {_:.*} matches the UI's JS/CSS assets
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
