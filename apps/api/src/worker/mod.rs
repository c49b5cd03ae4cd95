//! Worker pool: concurrent execution slots draining the job queues.
//!
//! Each slot runs the same loop: pop, claim, execute under a hard
//! timeout, record the outcome. Slots share nothing in-process; all
//! coordination goes through the job store, whose CAS claim makes
//! double-execution impossible. No error escapes the loop: collaborator
//! failures, store failures and timeouts all land as record transitions,
//! and the worst outcome for a job is a `failed` record.

pub mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::collaborators::{Collaborators, ExecutionError};
use crate::config::Config;
use crate::jobs::{JobError, JobErrorKind, JobRecord, JobType};
use crate::store::JobStore;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub slots: usize,
    pub job_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub poll_timeout: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            slots: config.worker_slots,
            job_timeout: config.job_timeout,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
            poll_timeout: config.poll_timeout,
        }
    }
}

pub struct WorkerPool {
    store: Arc<dyn JobStore>,
    collaborators: Arc<dyn Collaborators>,
    settings: WorkerSettings,
    shutdown: watch::Receiver<bool>,
}

impl WorkerPool {
    pub fn new(
        store: Arc<dyn JobStore>,
        collaborators: Arc<dyn Collaborators>,
        settings: WorkerSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            collaborators,
            settings,
            shutdown,
        }
    }

    /// Run all slots until shutdown is signalled and each slot finishes
    /// its in-flight job. In_progress work is never abandoned mid-flight
    /// by a clean shutdown.
    pub async fn run(self) {
        info!(slots = self.settings.slots, "worker pool starting");
        let mut slots = JoinSet::new();
        for slot in 0..self.settings.slots {
            slots.spawn(run_slot(
                slot,
                Arc::clone(&self.store),
                Arc::clone(&self.collaborators),
                self.settings.clone(),
                self.shutdown.clone(),
            ));
        }
        while let Some(joined) = slots.join_next().await {
            if let Err(e) = joined {
                error!("worker slot aborted: {e}");
            }
        }
        info!("worker pool stopped");
    }
}

async fn run_slot(
    slot: usize,
    store: Arc<dyn JobStore>,
    collaborators: Arc<dyn Collaborators>,
    settings: WorkerSettings,
    shutdown: watch::Receiver<bool>,
) {
    debug!(slot, "slot started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let job_id = match store.pop_any(&JobType::ALL, settings.poll_timeout).await {
            Ok(Some(job_id)) => job_id,
            Ok(None) => continue, // poll timeout; loop to re-check shutdown
            Err(e) => {
                error!(slot, "queue pop failed: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };
        process_one(slot, store.as_ref(), collaborators.as_ref(), &settings, &job_id).await;
    }
    debug!(slot, "slot stopped");
}

/// Claim and execute one popped job. Store failures are logged and
/// dropped: the lease reaper recycles anything left in_progress.
async fn process_one(
    slot: usize,
    store: &dyn JobStore,
    collaborators: &dyn Collaborators,
    settings: &WorkerSettings,
    job_id: &str,
) {
    let record = match store.claim(job_id, Utc::now()).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            // Claim conflict or evicted record; the loser discards silently.
            debug!(slot, job_id, "claim lost, discarding");
            return;
        }
        Err(e) => {
            error!(slot, job_id, "claim failed: {e}");
            return;
        }
    };

    info!(slot, job_id, job_type = record.job_type.as_str(), attempt = record.retry_count + 1, "executing job");

    let started = std::time::Instant::now();
    let outcome = tokio::time::timeout(
        settings.job_timeout,
        collaborators.execute(record.job_type, &record.input),
    )
    .await;
    let elapsed_ms = started.elapsed().as_millis();

    let result = match outcome {
        Ok(result) => result,
        Err(_) => Err(ExecutionError::Transient(format!(
            "execution timed out after {}s",
            settings.job_timeout.as_secs()
        ))),
    };

    match result {
        Ok(payload) => {
            info!(slot, job_id, elapsed_ms, "job complete");
            if let Err(e) = store.complete(job_id, payload, Utc::now()).await {
                error!(slot, job_id, "failed to record completion: {e}");
            }
        }
        Err(ExecutionError::Permanent(message)) => {
            warn!(slot, job_id, elapsed_ms, "job failed permanently: {message}");
            let error = JobError::new(JobErrorKind::Permanent, message);
            if let Err(e) = store.fail(job_id, error, Utc::now()).await {
                error!(slot, job_id, "failed to record failure: {e}");
            }
        }
        Err(ExecutionError::Transient(message)) => {
            handle_transient(slot, store, settings, &record, message).await;
        }
    }
}

async fn handle_transient(
    slot: usize,
    store: &dyn JobStore,
    settings: &WorkerSettings,
    record: &JobRecord,
    message: String,
) {
    let job_id = record.job_id.as_str();
    if record.retry_count < settings.max_retries {
        let delay = backoff(settings.retry_backoff, record.retry_count);
        warn!(
            slot,
            job_id,
            retry = record.retry_count + 1,
            delay_secs = delay.as_secs(),
            "transient failure, requeueing: {message}"
        );
        if let Err(e) = store.requeue(job_id, delay, Utc::now()).await {
            error!(slot, job_id, "failed to requeue: {e}");
        }
    } else {
        warn!(slot, job_id, retries = record.retry_count, "retry budget exhausted: {message}");
        let error = JobError::new(
            JobErrorKind::RetriesExhausted,
            format!("failed after {} retries: {message}", record.retry_count),
        );
        if let Err(e) = store.fail(job_id, error, Utc::now()).await {
            error!(slot, job_id, "failed to record failure: {e}");
        }
    }
}

/// Exponential backoff: base, 2x, 4x, ... before the retry becomes
/// visible to workers again.
fn backoff(base: Duration, retry_count: u32) -> Duration {
    base.saturating_mul(1u32 << retry_count.min(16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use crate::store::memory::MemoryJobStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted collaborator: pops one outcome per invocation and counts
    /// attempts.
    struct ScriptedCollaborators {
        script: Mutex<VecDeque<Result<Value, ExecutionError>>>,
        attempts: Mutex<u32>,
        hang: bool,
    }

    impl ScriptedCollaborators {
        fn new(outcomes: Vec<Result<Value, ExecutionError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(outcomes.into()),
                attempts: Mutex::new(0),
                hang: false,
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(VecDeque::new()),
                attempts: Mutex::new(0),
                hang: true,
            })
        }

        fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl Collaborators for ScriptedCollaborators {
        async fn execute(&self, _job_type: JobType, _input: &Value) -> Result<Value, ExecutionError> {
            *self.attempts.lock().unwrap() += 1;
            if self.hang {
                // Far longer than any test timeout.
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"default": true})))
        }
    }

    fn settings() -> WorkerSettings {
        WorkerSettings {
            slots: 2,
            job_timeout: Duration::from_millis(200),
            max_retries: 3,
            retry_backoff: Duration::ZERO, // retries visible immediately in tests
            poll_timeout: Duration::from_millis(10),
        }
    }

    async fn submit(store: &MemoryJobStore, job_id: &str) {
        let record = JobRecord::new(
            job_id.to_string(),
            JobType::Analyze,
            json!({"resume_url": "https://example.com/r.pdf"}),
            Utc::now(),
        );
        store.insert(record).await.unwrap();
    }

    /// Runs a pool until the given job reaches a terminal state.
    async fn run_until_terminal(
        store: Arc<MemoryJobStore>,
        collaborators: Arc<dyn Collaborators>,
        job_id: &str,
    ) -> JobRecord {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pool = WorkerPool::new(store.clone(), collaborators, settings(), shutdown_rx);
        let pool_task = tokio::spawn(pool.run());

        let record = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let record = store.get(job_id).await.unwrap().unwrap();
                if record.status.is_terminal() {
                    return record;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("job should reach a terminal state");

        shutdown_tx.send(true).unwrap();
        pool_task.await.unwrap();
        record
    }

    #[tokio::test]
    async fn successful_job_records_result_verbatim() {
        let store = Arc::new(MemoryJobStore::new());
        submit(&store, "happy").await;
        let payload = json!({"scores": {"overall_score": 72.5}, "issues": []});
        let collab = ScriptedCollaborators::new(vec![Ok(payload.clone())]);

        let record = run_until_terminal(store.clone(), collab.clone(), "happy").await;
        assert_eq!(record.status, JobStatus::Complete);
        assert_eq!(record.result, Some(payload));
        assert_eq!(record.retry_count, 0);
        assert!(record.error.is_none());
        assert!(record.started_at.is_some() && record.completed_at.is_some());
        assert_eq!(collab.attempts(), 1);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let store = Arc::new(MemoryJobStore::new());
        submit(&store, "rejected").await;
        let collab = ScriptedCollaborators::new(vec![Err(ExecutionError::Permanent(
            "document text extraction failed".to_string(),
        ))]);

        let record = run_until_terminal(store.clone(), collab.clone(), "rejected").await;
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.retry_count, 0);
        let error = record.error.unwrap();
        assert_eq!(error.kind, JobErrorKind::Permanent);
        assert!(error.message.contains("extraction failed"));
        assert_eq!(collab.attempts(), 1);
    }

    #[tokio::test]
    async fn transient_failures_retry_then_succeed() {
        let store = Arc::new(MemoryJobStore::new());
        submit(&store, "flaky").await;
        let collab = ScriptedCollaborators::new(vec![
            Err(ExecutionError::Transient("llm timeout".to_string())),
            Err(ExecutionError::Transient("llm timeout".to_string())),
            Ok(json!({"ok": true})),
        ]);

        let record = run_until_terminal(store.clone(), collab.clone(), "flaky").await;
        assert_eq!(record.status, JobStatus::Complete);
        assert_eq!(record.retry_count, 2);
        assert_eq!(collab.attempts(), 3);
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_fails_the_job() {
        let store = Arc::new(MemoryJobStore::new());
        submit(&store, "hopeless").await;
        let always_transient: Vec<Result<Value, ExecutionError>> = (0..10)
            .map(|_| Err(ExecutionError::Transient("still down".to_string())))
            .collect();
        let collab = ScriptedCollaborators::new(always_transient);

        let record = run_until_terminal(store.clone(), collab.clone(), "hopeless").await;
        assert_eq!(record.status, JobStatus::Failed);
        // max_retries = 3: one initial attempt plus three retries.
        assert_eq!(record.retry_count, 3);
        assert_eq!(collab.attempts(), 4);
        assert_eq!(record.error.unwrap().kind, JobErrorKind::RetriesExhausted);
    }

    #[tokio::test]
    async fn hung_collaborator_hits_the_execution_timeout() {
        let store = Arc::new(MemoryJobStore::new());
        submit(&store, "hung").await;
        let collab = ScriptedCollaborators::hanging();

        let record = run_until_terminal(store.clone(), collab.clone(), "hung").await;
        // Every attempt times out; the job ends up failed with the
        // timeout surfaced as a transient error that ran out of budget.
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.retry_count, 3);
        let error = record.error.unwrap();
        assert_eq!(error.kind, JobErrorKind::RetriesExhausted);
        assert!(error.message.contains("timed out"));
    }

    #[tokio::test]
    async fn slots_drain_multiple_classes() {
        let store = Arc::new(MemoryJobStore::new());
        for (id, job_type) in [
            ("a1", JobType::Analyze),
            ("i1", JobType::Improve),
            ("g1", JobType::Generate),
        ] {
            let record = JobRecord::new(id.to_string(), job_type, json!({}), Utc::now());
            store.insert(record).await.unwrap();
        }
        let collab = ScriptedCollaborators::new(vec![]);

        for id in ["a1", "i1", "g1"] {
            let record = run_until_terminal(store.clone(), collab.clone(), id).await;
            assert_eq!(record.status, JobStatus::Complete);
        }
        assert_eq!(collab.attempts(), 3);
    }

    #[test]
    fn backoff_doubles() {
        let base = Duration::from_secs(10);
        assert_eq!(backoff(base, 0), Duration::from_secs(10));
        assert_eq!(backoff(base, 1), Duration::from_secs(20));
        assert_eq!(backoff(base, 2), Duration::from_secs(40));
        // Saturates instead of overflowing on absurd retry counts.
        assert!(backoff(base, 40) >= backoff(base, 16));
    }
}
