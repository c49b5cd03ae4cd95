//! Background sweeper: delayed-retry promotion, stale-lease reaping and
//! record expiry on a fixed schedule.
//!
//! Runs inside the worker process next to the pool. Each tick is
//! independent; an error on one tick is logged and the next tick runs
//! anyway.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::store::JobStore;

#[derive(Debug, Clone)]
pub struct SweeperSettings {
    pub interval: Duration,
    pub retention: Duration,
    pub lease: Duration,
    pub max_retries: u32,
}

impl SweeperSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.sweep_interval,
            retention: config.result_retention,
            lease: config.lease,
            max_retries: config.max_retries,
        }
    }
}

pub struct Sweeper {
    store: Arc<dyn JobStore>,
    settings: SweeperSettings,
    shutdown: watch::Receiver<bool>,
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn JobStore>,
        settings: SweeperSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            settings,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            retention_secs = self.settings.retention.as_secs(),
            "sweeper starting"
        );
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.changed() => {}
            }
            if *self.shutdown.borrow() {
                break;
            }
            self.tick().await;
        }
        info!("sweeper stopped");
    }

    /// One maintenance pass. Order matters: promote retries first so a
    /// due job is not double-handled by the reaper in the same pass.
    pub async fn tick(&self) {
        let now = Utc::now();

        match self.store.promote_due(now).await {
            Ok(0) => {}
            Ok(promoted) => debug!(promoted, "promoted delayed retries"),
            Err(e) => error!("delayed promotion failed: {e}"),
        }

        match self
            .store
            .reap_stale(self.settings.lease, self.settings.max_retries, now)
            .await
        {
            Ok(stats) if stats.requeued + stats.failed > 0 => {
                info!(
                    requeued = stats.requeued,
                    failed = stats.failed,
                    "recycled stale leases"
                );
            }
            Ok(_) => {}
            Err(e) => error!("lease reaping failed: {e}"),
        }

        match self.store.sweep_expired(self.settings.retention, now).await {
            Ok(0) => {}
            Ok(deleted) => info!(deleted, "evicted expired job records"),
            Err(e) => error!("expiry sweep failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobErrorKind, JobRecord, JobStatus, JobType};
    use crate::store::memory::MemoryJobStore;
    use serde_json::json;

    fn sweeper(store: Arc<MemoryJobStore>, settings: SweeperSettings) -> Sweeper {
        let (_tx, rx) = watch::channel(false);
        Sweeper::new(store, settings, rx)
    }

    fn settings() -> SweeperSettings {
        SweeperSettings {
            interval: Duration::from_millis(10),
            retention: Duration::from_secs(3600),
            lease: Duration::from_secs(600),
            max_retries: 3,
        }
    }

    async fn insert(store: &MemoryJobStore, id: &str) {
        let record = JobRecord::new(
            id.to_string(),
            JobType::Analyze,
            json!({"resume_url": "https://example.com/r.pdf"}),
            Utc::now(),
        );
        store.insert(record).await.unwrap();
    }

    #[tokio::test]
    async fn tick_promotes_due_retries() {
        let store = Arc::new(MemoryJobStore::new());
        insert(&store, "delayed").await;
        let pop = Duration::from_millis(20);
        store.pop_any(&JobType::ALL, pop).await.unwrap().unwrap();
        store.claim("delayed", Utc::now()).await.unwrap().unwrap();
        // Requeue visible in the past so the next tick promotes it.
        store
            .requeue("delayed", Duration::from_millis(1), Utc::now() - chrono::Duration::seconds(10))
            .await
            .unwrap();

        sweeper(store.clone(), settings()).tick().await;
        assert!(store.pop_any(&JobType::ALL, pop).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn tick_reaps_abandoned_claims() {
        let store = Arc::new(MemoryJobStore::new());
        insert(&store, "abandoned").await;
        store.claim("abandoned", Utc::now()).await.unwrap().unwrap();

        // Zero lease: the claim is immediately stale.
        let mut cfg = settings();
        cfg.lease = Duration::ZERO;
        sweeper(store.clone(), cfg).tick().await;

        let record = store.get("abandoned").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.retry_count, 1);
    }

    #[tokio::test]
    async fn tick_fails_abandoned_claims_out_of_budget() {
        let store = Arc::new(MemoryJobStore::new());
        insert(&store, "lost").await;
        store.claim("lost", Utc::now()).await.unwrap().unwrap();

        let mut cfg = settings();
        cfg.lease = Duration::ZERO;
        cfg.max_retries = 0;
        sweeper(store.clone(), cfg).tick().await;

        let record = store.get("lost").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error.unwrap().kind, JobErrorKind::WorkerLost);
    }

    #[tokio::test]
    async fn tick_evicts_expired_records() {
        let store = Arc::new(MemoryJobStore::new());
        insert(&store, "done").await;
        store.claim("done", Utc::now()).await.unwrap().unwrap();
        // Completed far enough in the past to be outside retention.
        let long_ago = Utc::now() - chrono::Duration::hours(3);
        store.complete("done", json!({"ok": true}), long_ago).await.unwrap();

        sweeper(store.clone(), settings()).tick().await;
        assert!(store.get("done").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let store = Arc::new(MemoryJobStore::new());
        let (tx, rx) = watch::channel(false);
        let sweeper = Sweeper::new(store, settings(), rx);
        let task = tokio::spawn(sweeper.run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sweeper should stop promptly")
            .unwrap();
    }
}
