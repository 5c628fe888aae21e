//! netdiag server binary: WebSocket endpoint for streaming network
//! diagnostics.

mod config;
mod messages;
mod registry;
mod ws;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::registry::ConnectionRegistry;

async fn index() -> impl Responder {
    HttpResponse::Ok().body("netdiag WebSocket server. Connect via /ws.")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load(config::DEFAULT_CONFIG_PATH)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let registry = web::Data::new(ConnectionRegistry::new());

    tracing::info!("netdiag server listening on {}:{}", config.bind, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(registry.clone())
            .route("/", web::get().to(index))
            .route("/ws", web::get().to(ws::diagnostics_ws))
    })
    .workers(num_cpus::get())
    .bind((config.bind.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
