use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use credential_gate::config::CorsConfig;
use credential_gate::{configure_routes, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn build_cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // No origin allowed
        return Cors::default();
    }

    Cors::default()
        .allowed_origin(&config.allowed_origin)
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec!["Content-Type"])
        .max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new().context("failed to load configuration")?;
    info!(environment = %config.environment, "Configuration loaded successfully");

    let state = AppState::new(config.clone())
        .await
        .context("failed to initialize application state")?;
    let state = web::Data::new(state);

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_config))
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await?;

    Ok(())
}
