use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::{Context, Result};
use hrdocs::{
    config::Config,
    db::init_db,
    docs::ApiDoc,
    model::company::CompanyDirectory,
    routes,
    state::AppState,
    store::{MemoryStore, MySqlStore, Store},
};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HR document service"
}

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::DEBUG);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    // `--memory` runs without MySQL; records vanish on exit
    let in_memory = std::env::args().any(|arg| arg == "--memory");
    let store: Arc<dyn Store> = if in_memory {
        warn!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set unless --memory is given")?;
        Arc::new(MySqlStore::new(init_db(url).await?))
    };

    let companies = CompanyDirectory::load(&config.companies_file)?;
    info!(companies = companies.all().len(), "Companies loaded");

    let state = Data::new(AppState::from_config(&config, store, companies));
    let config_data = Data::new(config.clone());
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
