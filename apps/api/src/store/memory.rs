//! In-memory job store, used by the orchestration tests and for
//! single-process development without a Redis.
//!
//! Semantics mirror the Redis backend exactly: idempotent insert, FIFO
//! per class, CAS transitions via the `JobRecord` state machine, delayed
//! visibility for retries. Lock discipline: the mutex is never held
//! across an await.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::jobs::{JobError, JobErrorKind, JobRecord, JobStatus, JobType};
use crate::store::{InsertOutcome, JobStore, ReapStats, StoreError};

#[derive(Default)]
struct Inner {
    records: HashMap<String, JobRecord>,
    ready: HashMap<JobType, VecDeque<String>>,
    delayed: Vec<Delayed>,
}

struct Delayed {
    visible_at: DateTime<Utc>,
    class: JobType,
    job_id: String,
}

#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_pop(&self, classes: &[JobType]) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        for class in classes {
            if let Some(id) = inner.ready.get_mut(class).and_then(VecDeque::pop_front) {
                return Some(id);
            }
        }
        None
    }

    fn push_ready(inner: &mut Inner, class: JobType, job_id: String) {
        inner.ready.entry(class).or_default().push_back(job_id);
    }

    fn drop_from_queues(inner: &mut Inner, job_id: &str) {
        for queue in inner.ready.values_mut() {
            queue.retain(|id| id != job_id);
        }
        inner.delayed.retain(|d| d.job_id != job_id);
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, record: JobRecord) -> Result<InsertOutcome, StoreError> {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(existing) = inner.records.get(&record.job_id) {
                return Ok(InsertOutcome::Exists(existing.clone()));
            }
            let class = record.job_type;
            let job_id = record.job_id.clone();
            inner.records.insert(job_id.clone(), record);
            Self::push_ready(&mut inner, class, job_id);
        }
        self.notify.notify_one();
        Ok(InsertOutcome::Created)
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().records.get(job_id).cloned())
    }

    async fn pop_any(
        &self,
        classes: &[JobType],
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(id) = self.try_pop(classes) {
                return Ok(Some(id));
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                // Deadline hit; one last look in case a push raced the timer.
                return Ok(self.try_pop(classes));
            }
        }
    }

    async fn claim(
        &self,
        job_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<JobRecord>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.records.get_mut(job_id) {
            Some(record) => {
                if record.claim(now) {
                    Ok(Some(record.clone()))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    async fn complete(
        &self,
        job_id: &str,
        result: Value,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .get_mut(job_id)
            .is_some_and(|r| r.complete(result, now)))
    }

    async fn fail(
        &self,
        job_id: &str,
        error: JobError,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .get_mut(job_id)
            .is_some_and(|r| r.fail(error, now)))
    }

    async fn requeue(
        &self,
        job_id: &str,
        delay: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let requeued = {
            let mut inner = self.inner.lock().unwrap();
            let Some(record) = inner.records.get_mut(job_id) else {
                return Ok(false);
            };
            if !record.requeue() {
                return Ok(false);
            }
            let class = record.job_type;
            let job_id = job_id.to_string();
            if delay.is_zero() {
                Self::push_ready(&mut inner, class, job_id);
                true
            } else {
                inner.delayed.push(Delayed {
                    visible_at: now + chrono::Duration::from_std(delay).unwrap_or_default(),
                    class,
                    job_id,
                });
                false
            }
        };
        if requeued {
            self.notify.notify_one();
        }
        Ok(true)
    }

    async fn cancel(
        &self,
        job_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(record) = inner.records.get_mut(job_id) else {
            return Ok(false);
        };
        if !record.cancel(reason, now) {
            return Ok(false);
        }
        Self::drop_from_queues(&mut inner, job_id);
        Ok(true)
    }

    async fn promote_due(&self, now: DateTime<Utc>) -> Result<u32, StoreError> {
        let promoted = {
            let mut inner = self.inner.lock().unwrap();
            let due: Vec<Delayed> = {
                let (due, pending) = std::mem::take(&mut inner.delayed)
                    .into_iter()
                    .partition(|d| d.visible_at <= now);
                inner.delayed = pending;
                due
            };
            let count = due.len() as u32;
            for entry in due {
                Self::push_ready(&mut inner, entry.class, entry.job_id);
            }
            count
        };
        for _ in 0..promoted {
            self.notify.notify_one();
        }
        Ok(promoted)
    }

    async fn reap_stale(
        &self,
        lease: Duration,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Result<ReapStats, StoreError> {
        let lease = chrono::Duration::from_std(lease).unwrap_or_default();
        let mut stats = ReapStats::default();
        {
            let mut inner = self.inner.lock().unwrap();
            let stale: Vec<String> = inner
                .records
                .values()
                .filter(|r| {
                    r.status == JobStatus::InProgress
                        && r.started_at.is_some_and(|t| t + lease <= now)
                })
                .map(|r| r.job_id.clone())
                .collect();
            for job_id in stale {
                let record = inner.records.get_mut(&job_id).unwrap();
                if record.retry_count < max_retries {
                    record.requeue();
                    let class = record.job_type;
                    Self::push_ready(&mut inner, class, job_id);
                    stats.requeued += 1;
                } else {
                    record.fail(
                        JobError::new(JobErrorKind::WorkerLost, "worker lease expired"),
                        now,
                    );
                    stats.failed += 1;
                }
            }
        }
        for _ in 0..stats.requeued {
            self.notify.notify_one();
        }
        Ok(stats)
    }

    async fn sweep_expired(
        &self,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let retention = chrono::Duration::from_std(retention).unwrap_or_default();
        let mut inner = self.inner.lock().unwrap();
        let expired: Vec<String> = inner
            .records
            .values()
            .filter(|r| r.expiry_basis() + retention <= now)
            .map(|r| r.job_id.clone())
            .collect();
        for job_id in &expired {
            inner.records.remove(job_id);
            Self::drop_from_queues(&mut inner, job_id);
        }
        Ok(expired.len() as u32)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
