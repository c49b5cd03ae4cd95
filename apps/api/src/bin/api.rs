//! Submission/read service: accepts jobs, answers status/result polls.
//! Execution happens in the separate `worker` binary.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use api::config::Config;
use api::routes::build_router;
use api::state::AppState;
use api::store::redis::RedisJobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    api::init_tracing(&config.rust_log);
    info!("Starting resume jobs API v{}", env!("CARGO_PKG_VERSION"));

    // The job store is the only shared mutable state.
    let store = Arc::new(RedisJobStore::connect(&config.redis_url).await?);
    info!("Job store connected");

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
