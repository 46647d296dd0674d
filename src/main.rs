use anyhow::Context;
use astra::Server;
use listing_pipeline::config::PipelineConfig;
use listing_pipeline::runs::ThreadLauncher;
use listing_pipeline::templates::html_error_response;
use listing_pipeline::{handle, init_db, AppState, Database};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,listing_pipeline=debug")))
        .with(fmt::layer())
        .init();

    let config = PipelineConfig::from_env().context("invalid configuration")?;

    let db = Database::new(config.database_path.clone());
    init_db(&db, &config.schema_path)
        .with_context(|| format!("initializing database at {}", config.database_path))?;

    let addr = config.bind_addr;
    let workers = config.server_workers;
    let app = AppState::new(db, config, Arc::new(ThreadLauncher));

    tracing::info!(%addr, workers, "🚀 dashboard listening");

    Server::bind(&addr)
        .max_workers(workers)
        .serve(move |req, _info| match handle(req, &app) {
            Ok(resp) => resp,
            Err(err) => html_error_response(err),
        })
        .context("server stopped with an error")?;

    tracing::info!("server shut down cleanly");
    Ok(())
}
