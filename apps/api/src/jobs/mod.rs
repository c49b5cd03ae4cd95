//! Job records and the lifecycle state machine.
//!
//! A `JobRecord` is the sole persisted entity of the orchestration core.
//! The dispatcher creates it, the worker pool mutates it through the
//! store's compare-and-swap transitions, the status/result service reads
//! it, and the sweeper deletes it. The transition methods here are the
//! single source of truth for what the state machine permits; both store
//! backends enforce the same rules.

pub mod payload;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which external collaborator executes the job. Doubles as the queue
/// class key, so one slow job type never starves another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Analyze,
    Improve,
    Generate,
}

impl JobType {
    pub const ALL: [JobType; 3] = [JobType::Analyze, JobType::Improve, JobType::Generate];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Analyze => "analyze",
            JobType::Improve => "improve",
            JobType::Generate => "generate",
        }
    }

    /// Advisory completion estimate returned in the submission receipt.
    /// Not a guarantee; collaborators run 3-45s in practice.
    pub fn eta_seconds(&self) -> u32 {
        match self {
            JobType::Analyze => 20,
            JobType::Improve => 30,
            JobType::Generate => 10,
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analyze" => Ok(JobType::Analyze),
            "improve" => Ok(JobType::Improve),
            "generate" => Ok(JobType::Generate),
            other => Err(format!("unknown job type '{other}'")),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward-only lifecycle: `queued → in_progress → {complete | failed}`.
/// "not found" is a query outcome, never a stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }
}

/// Machine-checkable failure kind stored on a failed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// Collaborator rejected the input irrecoverably.
    Permanent,
    /// Transient failures persisted past the retry budget.
    RetriesExhausted,
    /// Cancelled by the caller while still queued.
    Cancelled,
    /// Claimed by a worker that never reported back (lease expired).
    WorkerLost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The durable unit of work. `input` is immutable once enqueued; `result`
/// and `error` are mutually exclusive and only set in a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub input: Value,
    pub result: Option<Value>,
    pub error: Option<JobError>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
}

impl JobRecord {
    pub fn new(job_id: String, job_type: JobType, input: Value, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            job_type,
            status: JobStatus::Queued,
            input,
            result: None,
            error: None,
            enqueued_at: now,
            started_at: None,
            completed_at: None,
            retry_count: 0,
        }
    }

    /// `queued → in_progress`. Returns false if the record is not claimable;
    /// the caller (a worker that lost the race) discards and re-polls.
    pub fn claim(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::InProgress;
        self.started_at = Some(now);
        true
    }

    /// `in_progress → complete`, setting the result in the same update.
    pub fn complete(&mut self, result: Value, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::InProgress {
            return false;
        }
        self.status = JobStatus::Complete;
        self.result = Some(result);
        self.completed_at = Some(now);
        true
    }

    /// `in_progress → failed`, setting the error in the same update.
    pub fn fail(&mut self, error: JobError, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::InProgress {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(now);
        true
    }

    /// `in_progress → queued` after a transient failure, consuming one
    /// retry. The started_at timestamp is cleared so the next claim owns
    /// the lease.
    pub fn requeue(&mut self) -> bool {
        if self.status != JobStatus::InProgress {
            return false;
        }
        self.status = JobStatus::Queued;
        self.started_at = None;
        self.retry_count += 1;
        true
    }

    /// `queued → failed` with a cancellation error, without ever being
    /// claimed. An in_progress job is not preemptible.
    pub fn cancel(&mut self, reason: &str, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(JobError::new(JobErrorKind::Cancelled, reason));
        self.completed_at = Some(now);
        true
    }

    /// Timestamp the retention window is measured from: the terminal
    /// timestamp, or enqueued_at for records stuck short of one.
    pub fn expiry_basis(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.enqueued_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> JobRecord {
        JobRecord::new(
            "job-1".to_string(),
            JobType::Analyze,
            json!({"resume_url": "https://example.com/r.pdf"}),
            Utc::now(),
        )
    }

    #[test]
    fn claim_only_from_queued() {
        let mut r = record();
        assert!(r.claim(Utc::now()));
        assert_eq!(r.status, JobStatus::InProgress);
        assert!(r.started_at.is_some());
        // Second claim loses.
        assert!(!r.claim(Utc::now()));
    }

    #[test]
    fn complete_sets_result_and_is_final() {
        let mut r = record();
        assert!(!r.complete(json!({}), Utc::now())); // not claimed yet
        r.claim(Utc::now());
        assert!(r.complete(json!({"overall_score": 72.5}), Utc::now()));
        assert_eq!(r.status, JobStatus::Complete);
        assert!(r.result.is_some());
        assert!(r.error.is_none());
        // No transition out of a terminal state.
        assert!(!r.claim(Utc::now()));
        assert!(!r.fail(JobError::new(JobErrorKind::Permanent, "x"), Utc::now()));
        assert!(!r.requeue());
    }

    #[test]
    fn fail_sets_error_exclusively() {
        let mut r = record();
        r.claim(Utc::now());
        assert!(r.fail(JobError::new(JobErrorKind::Permanent, "bad input"), Utc::now()));
        assert_eq!(r.status, JobStatus::Failed);
        assert!(r.result.is_none());
        assert_eq!(r.error.as_ref().unwrap().kind, JobErrorKind::Permanent);
        assert!(!r.complete(json!({}), Utc::now()));
    }

    #[test]
    fn requeue_consumes_a_retry_and_clears_lease() {
        let mut r = record();
        r.claim(Utc::now());
        assert!(r.requeue());
        assert_eq!(r.status, JobStatus::Queued);
        assert_eq!(r.retry_count, 1);
        assert!(r.started_at.is_none());
    }

    #[test]
    fn cancel_only_from_queued() {
        let mut r = record();
        assert!(r.cancel("caller cancelled", Utc::now()));
        assert_eq!(r.status, JobStatus::Failed);
        assert_eq!(r.error.as_ref().unwrap().kind, JobErrorKind::Cancelled);

        let mut claimed = record();
        claimed.claim(Utc::now());
        assert!(!claimed.cancel("too late", Utc::now()));
    }

    #[test]
    fn expiry_basis_prefers_terminal_timestamp() {
        let mut r = record();
        assert_eq!(r.expiry_basis(), r.enqueued_at);
        r.claim(Utc::now());
        let done = Utc::now();
        r.complete(json!({}), done);
        assert_eq!(r.expiry_basis(), done);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(JobType::Generate.as_str(), "generate");
        assert_eq!("improve".parse::<JobType>().unwrap(), JobType::Improve);
    }
}
