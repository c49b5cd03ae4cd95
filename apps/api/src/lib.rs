//! Asynchronous resume-processing job service.
//!
//! Two binaries share this library: `api` (submission and read paths)
//! and `worker` (execution slots plus the background sweeper). They
//! coordinate only through the job store.

pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod jobs;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod store;
pub mod worker;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging the same way in both binaries.
pub fn init_tracing(rust_log: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
