pub mod health;
pub mod jobs;
pub mod templates;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/ready", get(health::ready_handler))
        // Job API: submit, poll, fetch, cancel. Submission endpoints are
        // static segments so they can sit beside the :job_id routes.
        .route("/api/v1/jobs/analyze", post(jobs::handle_submit_analyze))
        .route("/api/v1/jobs/improve", post(jobs::handle_submit_improve))
        .route("/api/v1/jobs/generate", post(jobs::handle_submit_generate))
        .route("/api/v1/jobs/:job_id/status", get(jobs::handle_status))
        .route("/api/v1/jobs/:job_id/result", get(jobs::handle_result))
        .route("/api/v1/jobs/:job_id/cancel", post(jobs::handle_cancel))
        // Template catalog
        .route("/api/v1/templates", get(templates::handle_list_templates))
        .with_state(state)
}
