//! Worker service: drains the job queues and runs the background
//! sweeper. Any number of these processes can share one queue.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use api::collaborators::LiveCollaborators;
use api::config::Config;
use api::llm_client::LlmClient;
use api::storage::{build_s3_client, S3ArtifactStorage};
use api::store::redis::RedisJobStore;
use api::store::JobStore;
use api::worker::sweeper::{Sweeper, SweeperSettings};
use api::worker::{WorkerPool, WorkerSettings};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    api::init_tracing(&config.rust_log);
    info!("Starting resume jobs worker v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn JobStore> = Arc::new(RedisJobStore::connect(&config.redis_url).await?);
    info!("Job store connected");

    // Collaborator clients are worker-local; every process builds its own.
    let s3 = build_s3_client(&config).await;
    let storage = Arc::new(S3ArtifactStorage::new(s3, config.s3_bucket.clone()));
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    let collaborators = Arc::new(LiveCollaborators::new(llm, storage));
    info!("Collaborators initialized (model: {})", api::llm_client::MODEL);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = Sweeper::new(
        Arc::clone(&store),
        SweeperSettings::from_config(&config),
        shutdown_rx.clone(),
    );
    let sweeper_task = tokio::spawn(sweeper.run());

    let pool = WorkerPool::new(
        store,
        collaborators,
        WorkerSettings::from_config(&config),
        shutdown_rx,
    );
    let pool_task = tokio::spawn(pool.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining in-flight jobs");
    shutdown_tx.send(true)?;

    pool_task.await?;
    sweeper_task.await?;
    info!("Worker stopped");

    Ok(())
}
