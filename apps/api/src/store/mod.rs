//! Job store: the only shared mutable state in the system.
//!
//! One trait covers both the record store (keyed by job id) and the
//! per-class FIFO queues, because every production deployment backs them
//! with the same Redis instance and every transition must be atomic with
//! its queue side effect. Backends:
//!
//! - [`redis::RedisJobStore`]: production; CAS transitions as Lua scripts.
//! - [`memory::MemoryJobStore`]: tests and single-process development,
//!   same semantics behind a mutex.
//!
//! Workers coordinate exclusively through this trait; they never talk to
//! each other.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::jobs::{JobError, JobRecord, JobType};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("corrupt job record '{job_id}': {reason}")]
    Corrupt { job_id: String, reason: String },
}

/// Result of an idempotent insert.
#[derive(Debug)]
pub enum InsertOutcome {
    Created,
    /// A record with this id already exists; its current state is returned
    /// so the dispatcher can answer the resubmission without a second
    /// queue entry.
    Exists(JobRecord),
}

/// What the lease reaper did in one pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReapStats {
    pub requeued: u32,
    pub failed: u32,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create the record and push it onto its class queue, atomically.
    /// An existing id is returned untouched (idempotent enqueue).
    async fn insert(&self, record: JobRecord) -> Result<InsertOutcome, StoreError>;

    /// O(1) read. `None` means never created or already evicted.
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Blocking pop across the given classes, FIFO within each class.
    /// `None` on timeout so workers can check for shutdown.
    async fn pop_any(
        &self,
        classes: &[JobType],
        timeout: Duration,
    ) -> Result<Option<String>, StoreError>;

    /// CAS `queued → in_progress`. `None` if the record is missing or
    /// already claimed; the caller lost the race and must discard.
    async fn claim(
        &self,
        job_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<JobRecord>, StoreError>;

    /// CAS `in_progress → complete` with the result payload.
    async fn complete(
        &self,
        job_id: &str,
        result: Value,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// CAS `in_progress → failed` with the error payload.
    async fn fail(
        &self,
        job_id: &str,
        error: JobError,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// CAS `in_progress → queued`, consuming one retry. The job becomes
    /// visible after `delay` (exponential backoff); zero means immediately.
    async fn requeue(
        &self,
        job_id: &str,
        delay: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// CAS `queued → failed(cancelled)`. `false` once a worker has
    /// claimed the job or it reached a terminal state.
    async fn cancel(
        &self,
        job_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Move delayed retries whose visibility time has passed onto their
    /// class queues. Returns how many were promoted.
    async fn promote_due(&self, now: DateTime<Utc>) -> Result<u32, StoreError>;

    /// Recycle `in_progress` records whose lease expired (worker crash):
    /// requeued while retry budget remains, failed with `worker_lost`
    /// otherwise.
    async fn reap_stale(
        &self,
        lease: Duration,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Result<ReapStats, StoreError>;

    /// Delete records whose expiry basis is older than the retention
    /// window. Deletion is the only path to the not-found outcome for an
    /// id that once existed.
    async fn sweep_expired(
        &self,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> Result<u32, StoreError>;

    /// Liveness probe backing the readiness endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
