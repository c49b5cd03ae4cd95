//! Dispatcher: the submission path.
//!
//! Validates, creates the job record, enqueues, and returns immediately.
//! Resubmission of an existing id answers with that job's current state
//! instead of creating a second queue entry, which guards against
//! client-side retry storms. Total time on this path is dominated by one
//! store round trip.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::{payload, JobRecord, JobStatus, JobType};
use crate::store::{InsertOutcome, JobStore};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Caller-supplied idempotency key; generated when omitted.
    #[serde(default)]
    pub job_id: Option<String>,
    pub input: Value,
}

#[derive(Debug, Serialize)]
pub struct SubmitReceipt {
    pub job_id: String,
    pub status: JobStatus,
    pub status_url: String,
    pub result_url: String,
    /// Advisory only; the caller polls `status_url` for truth.
    pub eta_seconds: u32,
}

fn receipt(job_id: String, status: JobStatus, job_type: JobType) -> SubmitReceipt {
    SubmitReceipt {
        status_url: format!("/api/v1/jobs/{job_id}/status"),
        result_url: format!("/api/v1/jobs/{job_id}/result"),
        eta_seconds: job_type.eta_seconds(),
        job_id,
        status,
    }
}

/// Validate and enqueue. Validation happens before any persistence; an
/// invalid payload never creates a record.
pub async fn submit(
    store: &dyn JobStore,
    job_type: JobType,
    request: SubmitRequest,
) -> Result<SubmitReceipt, AppError> {
    payload::validate(job_type, &request.input).map_err(AppError::Validation)?;

    let job_id = match request.job_id {
        Some(id) => {
            payload::validate_job_id(&id).map_err(AppError::Validation)?;
            id
        }
        None => Uuid::new_v4().to_string(),
    };

    let record = JobRecord::new(job_id.clone(), job_type, request.input, Utc::now());
    match store.insert(record).await? {
        InsertOutcome::Created => {
            info!(%job_id, %job_type, "job enqueued");
            Ok(receipt(job_id, JobStatus::Queued, job_type))
        }
        InsertOutcome::Exists(existing) => {
            info!(%job_id, status = existing.status.as_str(), "resubmission answered from existing job");
            Ok(receipt(job_id, existing.status, existing.job_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryJobStore;
    use serde_json::json;
    use std::time::Duration;

    fn analyze_request(job_id: Option<&str>) -> SubmitRequest {
        SubmitRequest {
            job_id: job_id.map(String::from),
            input: json!({"resume_url": "https://storage.example.com/r.pdf"}),
        }
    }

    #[tokio::test]
    async fn submit_returns_queued_receipt() {
        let store = MemoryJobStore::new();
        let receipt = submit(&store, JobType::Analyze, analyze_request(None))
            .await
            .unwrap();
        assert_eq!(receipt.status, JobStatus::Queued);
        assert_eq!(receipt.status_url, format!("/api/v1/jobs/{}/status", receipt.job_id));
        assert_eq!(receipt.eta_seconds, JobType::Analyze.eta_seconds());

        // Visible immediately after submission, never not_found.
        let record = store.get(&receipt.job_id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn resubmission_is_idempotent() {
        let store = MemoryJobStore::new();
        let first = submit(&store, JobType::Analyze, analyze_request(Some("retry-storm")))
            .await
            .unwrap();
        let second = submit(&store, JobType::Analyze, analyze_request(Some("retry-storm")))
            .await
            .unwrap();
        assert_eq!(first.job_id, second.job_id);
        assert_eq!(second.status, JobStatus::Queued);

        // Exactly one queue entry despite two submissions.
        let timeout = Duration::from_millis(20);
        assert!(store.pop_any(&JobType::ALL, timeout).await.unwrap().is_some());
        assert!(store.pop_any(&JobType::ALL, timeout).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_payload_never_creates_a_record() {
        let store = MemoryJobStore::new();
        let result = submit(
            &store,
            JobType::Analyze,
            SubmitRequest {
                job_id: Some("never-created".to_string()),
                input: json!({"resume_url": "not a url"}),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.get("never-created").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_job_id_rejected() {
        let store = MemoryJobStore::new();
        let result = submit(&store, JobType::Analyze, analyze_request(Some("has spaces")))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
