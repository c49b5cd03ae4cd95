//! Axum route handlers for the Job API.
//!
//! Submission and reads complete in one store round trip; only workers
//! ever block on collaborator work. `result` answers differently per
//! state: payload on complete, stored error on failed, 409 with the
//! current status while the job is still moving.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dispatch::{self, SubmitReceipt, SubmitRequest};
use crate::errors::AppError;
use crate::jobs::{JobError, JobRecord, JobStatus, JobType};
use crate::state::AppState;
use crate::store::JobStore;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub enqueued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
}

impl From<JobRecord> for StatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.job_id,
            status: record.status,
            enqueued_at: record.enqueued_at,
            started_at: record.started_at,
            completed_at: record.completed_at,
            retry_count: record.retry_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub status: JobStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/analyze
///
/// 202 with a submission receipt; resubmission of a known id returns that
/// job's current state instead of enqueueing twice.
pub async fn handle_submit_analyze(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitReceipt>), AppError> {
    submit(state, JobType::Analyze, request).await
}

/// POST /api/v1/jobs/improve
pub async fn handle_submit_improve(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitReceipt>), AppError> {
    submit(state, JobType::Improve, request).await
}

/// POST /api/v1/jobs/generate
pub async fn handle_submit_generate(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitReceipt>), AppError> {
    submit(state, JobType::Generate, request).await
}

async fn submit(
    state: AppState,
    job_type: JobType,
    request: SubmitRequest,
) -> Result<(StatusCode, Json<SubmitReceipt>), AppError> {
    let receipt = dispatch::submit(state.store.as_ref(), job_type, request).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /api/v1/jobs/:job_id/status
pub async fn handle_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let record = fetch(&state, &job_id).await?;
    Ok(Json(record.into()))
}

/// GET /api/v1/jobs/:job_id/result
///
/// Idempotent: repeated calls return the same payload until eviction.
pub async fn handle_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ResultResponse>, AppError> {
    let record = fetch(&state, &job_id).await?;
    match record.status {
        JobStatus::Complete => Ok(Json(ResultResponse {
            job_id: record.job_id,
            status: record.status,
            result: record.result,
            error: None,
        })),
        JobStatus::Failed => Ok(Json(ResultResponse {
            job_id: record.job_id,
            status: record.status,
            result: None,
            error: record.error,
        })),
        status => Err(AppError::NotReady(status)),
    }
}

/// POST /api/v1/jobs/:job_id/cancel
///
/// Only queued jobs can be cancelled; a claimed job runs to completion.
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let record = fetch(&state, &job_id).await?;
    if record.status != JobStatus::Queued {
        return Err(AppError::Conflict(format!(
            "only queued jobs can be cancelled (status: {})",
            record.status.as_str()
        )));
    }
    let cancelled = state
        .store
        .cancel(&job_id, "cancelled by caller", Utc::now())
        .await?;
    if !cancelled {
        // A worker claimed it between the read and the cancel.
        return Err(AppError::Conflict(
            "job was claimed before it could be cancelled".to_string(),
        ));
    }
    Ok(Json(CancelResponse {
        job_id,
        status: JobStatus::Failed,
    }))
}

async fn fetch(state: &AppState, job_id: &str) -> Result<JobRecord, AppError> {
    state
        .store
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job '{job_id}' not found or expired")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::build_router;
    use crate::store::memory::MemoryJobStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> (Arc<MemoryJobStore>, AppState) {
        let store = Arc::new(MemoryJobStore::new());
        let config = Config {
            redis_url: "redis://localhost".to_string(),
            s3_bucket: "test".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            anthropic_api_key: "test".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            worker_slots: 1,
            job_timeout: Duration::from_secs(300),
            max_retries: 3,
            retry_backoff: Duration::from_secs(10),
            result_retention: Duration::from_secs(3600),
            lease: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(120),
            poll_timeout: Duration::from_secs(5),
        };
        let state = AppState {
            store: store.clone(),
            config,
        };
        (store, state)
    }

    async fn request(router: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn submit_body() -> Value {
        json!({"input": {"resume_url": "https://storage.example.com/r.pdf"}})
    }

    #[tokio::test]
    async fn submit_then_poll_status() {
        let (_store, state) = test_state();
        let router = build_router(state);

        let (status, body) = request(
            router.clone(),
            "POST",
            "/api/v1/jobs/analyze",
            Some(submit_body()),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "queued");
        let job_id = body["job_id"].as_str().unwrap().to_string();
        assert_eq!(body["status_url"], format!("/api/v1/jobs/{job_id}/status"));

        let (status, body) =
            request(router, "GET", &format!("/api/v1/jobs/{job_id}/status"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "queued");
        assert_eq!(body["retry_count"], 0);
    }

    #[tokio::test]
    async fn unknown_job_type_is_rejected() {
        let (_store, state) = test_state();
        let (status, _body) = request(
            build_router(state),
            "POST",
            "/api/v1/jobs/transcribe",
            Some(submit_body()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected() {
        let (_store, state) = test_state();
        let (status, body) = request(
            build_router(state),
            "POST",
            "/api/v1/jobs/analyze",
            Some(json!({"input": {"resume_url": "not-a-url"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_not_found() {
        let (_store, state) = test_state();
        let router = build_router(state);
        let (status, body) = request(router.clone(), "GET", "/api/v1/jobs/ghost/status", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = request(router, "GET", "/api/v1/jobs/ghost/result", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn result_on_queued_job_is_not_ready_with_status() {
        let (_store, state) = test_state();
        let router = build_router(state);
        let (_, body) = request(
            router.clone(),
            "POST",
            "/api/v1/jobs/analyze",
            Some(json!({"job_id": "pending-1", "input": {"resume_url": "https://x.example/r.pdf"}})),
        )
        .await;
        assert_eq!(body["job_id"], "pending-1");

        let (status, body) =
            request(router, "GET", "/api/v1/jobs/pending-1/result", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "NOT_READY");
        assert_eq!(body["error"]["status"], "queued");
    }

    #[tokio::test]
    async fn result_round_trips_worker_payload() {
        let (store, state) = test_state();
        let router = build_router(state);
        let (_, receipt) = request(
            router.clone(),
            "POST",
            "/api/v1/jobs/analyze",
            Some(json!({"job_id": "done-1", "input": {"resume_url": "https://x.example/r.pdf"}})),
        )
        .await;
        assert_eq!(receipt["status"], "queued");

        // Simulate a worker finishing the job.
        let payload = json!({"scores": {"overall_score": 72.5}, "issues": []});
        store.claim("done-1", Utc::now()).await.unwrap().unwrap();
        store.complete("done-1", payload.clone(), Utc::now()).await.unwrap();

        let (status, body) = request(router, "GET", "/api/v1/jobs/done-1/result", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "complete");
        assert_eq!(body["result"], payload);
    }

    #[tokio::test]
    async fn result_of_failed_job_returns_stored_error() {
        let (store, state) = test_state();
        let router = build_router(state);
        request(
            router.clone(),
            "POST",
            "/api/v1/jobs/analyze",
            Some(json!({"job_id": "bad-1", "input": {"resume_url": "https://x.example/r.pdf"}})),
        )
        .await;
        store.claim("bad-1", Utc::now()).await.unwrap().unwrap();
        store
            .fail(
                "bad-1",
                JobError::new(crate::jobs::JobErrorKind::Permanent, "document text extraction failed"),
                Utc::now(),
            )
            .await
            .unwrap();

        let (status, body) = request(router, "GET", "/api/v1/jobs/bad-1/result", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "failed");
        assert_eq!(body["error"]["kind"], "permanent");
        assert!(body["error"]["message"].as_str().unwrap().contains("extraction"));
    }

    #[tokio::test]
    async fn cancel_queued_job() {
        let (store, state) = test_state();
        let router = build_router(state);
        request(
            router.clone(),
            "POST",
            "/api/v1/jobs/generate",
            Some(json!({
                "job_id": "cancel-1",
                "input": {
                    "resume_improvement_id": "imp-1",
                    "template": "modern",
                    "content": {},
                    "user_id": "user-1"
                }
            })),
        )
        .await;

        let (status, body) =
            request(router.clone(), "POST", "/api/v1/jobs/cancel-1/cancel", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "failed");

        // Cancelling again conflicts: the job is already terminal.
        let (status, _) = request(router, "POST", "/api/v1/jobs/cancel-1/cancel", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        // And its queue entry is gone.
        assert!(store
            .pop_any(&JobType::ALL, Duration::from_millis(20))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn cancel_claimed_job_conflicts() {
        let (store, state) = test_state();
        let router = build_router(state);
        request(
            router.clone(),
            "POST",
            "/api/v1/jobs/analyze",
            Some(json!({"job_id": "claimed-1", "input": {"resume_url": "https://x.example/r.pdf"}})),
        )
        .await;
        store.claim("claimed-1", Utc::now()).await.unwrap().unwrap();

        let (status, body) = request(router, "POST", "/api/v1/jobs/claimed-1/cancel", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn idempotent_resubmission_over_http() {
        let (store, state) = test_state();
        let router = build_router(state);
        let body = json!({"job_id": "twice", "input": {"resume_url": "https://x.example/r.pdf"}});
        let (status, first) =
            request(router.clone(), "POST", "/api/v1/jobs/analyze", Some(body.clone())).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let (status, second) =
            request(router, "POST", "/api/v1/jobs/analyze", Some(body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(first["job_id"], second["job_id"]);

        // One queue entry total.
        assert!(store.pop_any(&JobType::ALL, Duration::from_millis(20)).await.unwrap().is_some());
        assert!(store.pop_any(&JobType::ALL, Duration::from_millis(20)).await.unwrap().is_none());
    }
}
