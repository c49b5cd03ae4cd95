//! Redis-backed job store.
//!
//! Layout:
//! - `job:{id}`            HASH: one field per record column; `input`,
//!   `result` and `error` are JSON strings written verbatim by Rust and
//!   never re-encoded server-side, so result payloads round-trip exactly.
//! - `queue:{class}`       LIST: per-class FIFO (LPUSH / BRPOP).
//! - `queue:{class}:delayed` ZSET: retries awaiting visibility,
//!   score = visible-at epoch seconds.
//! - `jobs:leases`         ZSET: in_progress claims, score = started_at.
//! - `jobs:expiry`         ZSET: retention index, score = expiry basis.
//!
//! Every state transition runs as a Lua script so the status check and
//! the write (plus queue/index side effects) are atomic under concurrent
//! workers; this is the single-claim invariant enforcement point.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::Script;
use serde_json::Value;
use tracing::debug;

use crate::jobs::{JobError, JobErrorKind, JobRecord, JobStatus, JobType};
use crate::store::{InsertOutcome, JobStore, ReapStats, StoreError};

const EXPIRY_KEY: &str = "jobs:expiry";
const LEASES_KEY: &str = "jobs:leases";
const SWEEP_BATCH: usize = 200;

fn job_key(job_id: &str) -> String {
    format!("job:{job_id}")
}

fn queue_key(class: JobType) -> String {
    format!("queue:{class}")
}

fn delayed_key(class: JobType) -> String {
    format!("queue:{class}:delayed")
}

fn epoch(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

// Create + enqueue, atomically; 0 means the id already exists.
const INSERT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1],
  'job_type', ARGV[2], 'status', 'queued', 'input', ARGV[3],
  'enqueued_at', ARGV[4], 'retry_count', '0')
redis.call('LPUSH', KEYS[2], ARGV[1])
redis.call('ZADD', KEYS[3], ARGV[5], ARGV[1])
return 1
"#;

// queued -> in_progress; returns the updated hash, or nil to the loser.
const CLAIM: &str = r#"
if redis.call('HGET', KEYS[1], 'status') ~= 'queued' then
  return nil
end
redis.call('HSET', KEYS[1], 'status', 'in_progress', 'started_at', ARGV[2])
redis.call('ZADD', KEYS[2], ARGV[3], ARGV[1])
return redis.call('HGETALL', KEYS[1])
"#;

// in_progress -> complete with the result payload.
const COMPLETE: &str = r#"
if redis.call('HGET', KEYS[1], 'status') ~= 'in_progress' then
  return 0
end
redis.call('HSET', KEYS[1], 'status', 'complete', 'result', ARGV[2], 'completed_at', ARGV[3])
redis.call('ZREM', KEYS[2], ARGV[1])
redis.call('ZADD', KEYS[3], ARGV[4], ARGV[1])
return 1
"#;

// in_progress -> failed with the error payload.
const FAIL: &str = r#"
if redis.call('HGET', KEYS[1], 'status') ~= 'in_progress' then
  return 0
end
redis.call('HSET', KEYS[1], 'status', 'failed', 'error', ARGV[2], 'completed_at', ARGV[3])
redis.call('ZREM', KEYS[2], ARGV[1])
redis.call('ZADD', KEYS[3], ARGV[4], ARGV[1])
return 1
"#;

// in_progress -> queued, consuming a retry; empty ARGV[2] = immediately
// visible, otherwise parked in the delayed zset.
const REQUEUE: &str = r#"
if redis.call('HGET', KEYS[1], 'status') ~= 'in_progress' then
  return 0
end
redis.call('HSET', KEYS[1], 'status', 'queued')
redis.call('HDEL', KEYS[1], 'started_at')
redis.call('HINCRBY', KEYS[1], 'retry_count', 1)
redis.call('ZREM', KEYS[2], ARGV[1])
if ARGV[2] == '' then
  redis.call('LPUSH', KEYS[3], ARGV[1])
else
  redis.call('ZADD', KEYS[4], ARGV[2], ARGV[1])
end
return 1
"#;

// queued -> failed(cancelled), dropping any queue entry.
const CANCEL: &str = r#"
if redis.call('HGET', KEYS[1], 'status') ~= 'queued' then
  return 0
end
redis.call('HSET', KEYS[1], 'status', 'failed', 'error', ARGV[2], 'completed_at', ARGV[3])
redis.call('LREM', KEYS[2], 0, ARGV[1])
redis.call('ZREM', KEYS[3], ARGV[1])
redis.call('ZADD', KEYS[4], ARGV[4], ARGV[1])
return 1
"#;

// Move due delayed entries onto the class queue, oldest first.
const PROMOTE: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 100)
for _, id in ipairs(due) do
  redis.call('ZREM', KEYS[1], id)
  redis.call('LPUSH', KEYS[2], id)
end
return #due
"#;

// Recycle one stale lease: 1 = requeued, 2 = failed, 0 = lease was gone.
const REAP: &str = r#"
if redis.call('HGET', KEYS[1], 'status') ~= 'in_progress' then
  redis.call('ZREM', KEYS[2], ARGV[1])
  return 0
end
local retries = tonumber(redis.call('HGET', KEYS[1], 'retry_count') or '0')
if retries < tonumber(ARGV[2]) then
  redis.call('HSET', KEYS[1], 'status', 'queued')
  redis.call('HDEL', KEYS[1], 'started_at')
  redis.call('HINCRBY', KEYS[1], 'retry_count', 1)
  redis.call('ZREM', KEYS[2], ARGV[1])
  redis.call('LPUSH', KEYS[3], ARGV[1])
  return 1
end
redis.call('HSET', KEYS[1], 'status', 'failed', 'error', ARGV[3], 'completed_at', ARGV[4])
redis.call('ZREM', KEYS[2], ARGV[1])
redis.call('ZADD', KEYS[4], ARGV[5], ARGV[1])
return 2
"#;

// Evict one record and every index entry pointing at it.
const DELETE: &str = r#"
redis.call('DEL', KEYS[1])
redis.call('ZREM', KEYS[2], ARGV[1])
redis.call('ZREM', KEYS[3], ARGV[1])
redis.call('LREM', KEYS[4], 0, ARGV[1])
redis.call('ZREM', KEYS[5], ARGV[1])
return 1
"#;

pub struct RedisJobStore {
    conn: ConnectionManager,
    insert: Script,
    claim: Script,
    complete: Script,
    fail: Script,
    requeue: Script,
    cancel: Script,
    promote: Script,
    reap: Script,
    delete: Script,
}

impl RedisJobStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::with_connection(conn))
    }

    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            insert: Script::new(INSERT),
            claim: Script::new(CLAIM),
            complete: Script::new(COMPLETE),
            fail: Script::new(FAIL),
            requeue: Script::new(REQUEUE),
            cancel: Script::new(CANCEL),
            promote: Script::new(PROMOTE),
            reap: Script::new(REAP),
            delete: Script::new(DELETE),
        }
    }

    async fn job_type_of(&self, job_id: &str) -> Result<Option<JobType>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("HGET")
            .arg(job_key(job_id))
            .arg("job_type")
            .query_async(&mut conn)
            .await?;
        match raw {
            None => Ok(None),
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|reason| StoreError::Corrupt {
                    job_id: job_id.to_string(),
                    reason,
                }),
        }
    }

    async fn delete_record(&self, job_id: &str, class: JobType) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .delete
            .key(job_key(job_id))
            .key(EXPIRY_KEY)
            .key(LEASES_KEY)
            .key(queue_key(class))
            .key(delayed_key(class))
            .arg(job_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn insert(&self, record: JobRecord) -> Result<InsertOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let input = serde_json::to_string(&record.input).map_err(|e| StoreError::Corrupt {
            job_id: record.job_id.clone(),
            reason: e.to_string(),
        })?;
        let created: i64 = self
            .insert
            .key(job_key(&record.job_id))
            .key(queue_key(record.job_type))
            .key(EXPIRY_KEY)
            .arg(&record.job_id)
            .arg(record.job_type.as_str())
            .arg(input)
            .arg(record.enqueued_at.to_rfc3339())
            .arg(epoch(record.enqueued_at))
            .invoke_async(&mut conn)
            .await?;
        if created == 1 {
            return Ok(InsertOutcome::Created);
        }
        // Lost to an earlier submission; surface its current state.
        match self.get(&record.job_id).await? {
            Some(existing) => Ok(InsertOutcome::Exists(existing)),
            // The record expired between the script and this read; treat
            // the insert as fresh on the caller's next attempt.
            None => Ok(InsertOutcome::Exists(record)),
        }
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(job_key(job_id))
            .query_async(&mut conn)
            .await?;
        if map.is_empty() {
            return Ok(None);
        }
        record_from_hash(job_id, &map).map(Some)
    }

    async fn pop_any(
        &self,
        classes: &[JobType],
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = classes.iter().map(|c| queue_key(*c)).collect();
        let timeout_secs = timeout.as_secs_f64().max(0.1);
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(keys)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;
        Ok(popped.map(|(_, job_id)| job_id))
    }

    async fn claim(
        &self,
        job_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let claimed: Option<HashMap<String, String>> = self
            .claim
            .key(job_key(job_id))
            .key(LEASES_KEY)
            .arg(job_id)
            .arg(now.to_rfc3339())
            .arg(epoch(now))
            .invoke_async(&mut conn)
            .await?;
        match claimed {
            None => Ok(None),
            Some(map) => record_from_hash(job_id, &map).map(Some),
        }
    }

    async fn complete(
        &self,
        job_id: &str,
        result: Value,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&result).map_err(|e| StoreError::Corrupt {
            job_id: job_id.to_string(),
            reason: e.to_string(),
        })?;
        let updated: i64 = self
            .complete
            .key(job_key(job_id))
            .key(LEASES_KEY)
            .key(EXPIRY_KEY)
            .arg(job_id)
            .arg(payload)
            .arg(now.to_rfc3339())
            .arg(epoch(now))
            .invoke_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn fail(
        &self,
        job_id: &str,
        error: JobError,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&error).expect("JobError always serializes");
        let updated: i64 = self
            .fail
            .key(job_key(job_id))
            .key(LEASES_KEY)
            .key(EXPIRY_KEY)
            .arg(job_id)
            .arg(payload)
            .arg(now.to_rfc3339())
            .arg(epoch(now))
            .invoke_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn requeue(
        &self,
        job_id: &str,
        delay: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(class) = self.job_type_of(job_id).await? else {
            return Ok(false);
        };
        let visible_at = if delay.is_zero() {
            String::new()
        } else {
            format!("{}", epoch(now) + delay.as_secs_f64())
        };
        let mut conn = self.conn.clone();
        let updated: i64 = self
            .requeue
            .key(job_key(job_id))
            .key(LEASES_KEY)
            .key(queue_key(class))
            .key(delayed_key(class))
            .arg(job_id)
            .arg(visible_at)
            .invoke_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn cancel(
        &self,
        job_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(class) = self.job_type_of(job_id).await? else {
            return Ok(false);
        };
        let error = JobError::new(JobErrorKind::Cancelled, reason);
        let payload = serde_json::to_string(&error).expect("JobError always serializes");
        let mut conn = self.conn.clone();
        let updated: i64 = self
            .cancel
            .key(job_key(job_id))
            .key(queue_key(class))
            .key(delayed_key(class))
            .key(EXPIRY_KEY)
            .arg(job_id)
            .arg(payload)
            .arg(now.to_rfc3339())
            .arg(epoch(now))
            .invoke_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn promote_due(&self, now: DateTime<Utc>) -> Result<u32, StoreError> {
        let mut promoted = 0u32;
        for class in JobType::ALL {
            let mut conn = self.conn.clone();
            let count: u32 = self
                .promote
                .key(delayed_key(class))
                .key(queue_key(class))
                .arg(epoch(now))
                .invoke_async(&mut conn)
                .await?;
            promoted += count;
        }
        Ok(promoted)
    }

    async fn reap_stale(
        &self,
        lease: Duration,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Result<ReapStats, StoreError> {
        let cutoff = epoch(now) - lease.as_secs_f64();
        let mut conn = self.conn.clone();
        let stale: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(LEASES_KEY)
            .arg("-inf")
            .arg(cutoff)
            .query_async(&mut conn)
            .await?;

        let mut stats = ReapStats::default();
        for job_id in stale {
            let Some(class) = self.job_type_of(&job_id).await? else {
                // Record already evicted; drop the orphaned lease entry.
                let _: i64 = redis::cmd("ZREM")
                    .arg(LEASES_KEY)
                    .arg(&job_id)
                    .query_async(&mut conn)
                    .await?;
                continue;
            };
            let error = JobError::new(JobErrorKind::WorkerLost, "worker lease expired");
            let payload = serde_json::to_string(&error).expect("JobError always serializes");
            let outcome: i64 = self
                .reap
                .key(job_key(&job_id))
                .key(LEASES_KEY)
                .key(queue_key(class))
                .key(EXPIRY_KEY)
                .arg(&job_id)
                .arg(max_retries)
                .arg(payload)
                .arg(now.to_rfc3339())
                .arg(epoch(now))
                .invoke_async(&mut conn)
                .await?;
            match outcome {
                1 => stats.requeued += 1,
                2 => stats.failed += 1,
                _ => debug!(%job_id, "stale lease already resolved"),
            }
        }
        Ok(stats)
    }

    async fn sweep_expired(
        &self,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let cutoff = epoch(now) - retention.as_secs_f64();
        let mut deleted = 0u32;
        loop {
            let mut conn = self.conn.clone();
            let expired: Vec<String> = redis::cmd("ZRANGEBYSCORE")
                .arg(EXPIRY_KEY)
                .arg("-inf")
                .arg(cutoff)
                .arg("LIMIT")
                .arg(0)
                .arg(SWEEP_BATCH)
                .query_async(&mut conn)
                .await?;
            if expired.is_empty() {
                return Ok(deleted);
            }
            for job_id in expired {
                match self.job_type_of(&job_id).await? {
                    Some(class) => self.delete_record(&job_id, class).await?,
                    None => {
                        // Hash already gone; clear the index entry so the
                        // sweep loop terminates.
                        let _: i64 = redis::cmd("ZREM")
                            .arg(EXPIRY_KEY)
                            .arg(&job_id)
                            .query_async(&mut conn)
                            .await?;
                    }
                }
                deleted += 1;
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn record_from_hash(
    job_id: &str,
    map: &HashMap<String, String>,
) -> Result<JobRecord, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        job_id: job_id.to_string(),
        reason,
    };
    let required = |name: &str| {
        map.get(name)
            .ok_or_else(|| corrupt(format!("missing field '{name}'")))
    };

    let job_type: JobType = required("job_type")?.parse().map_err(corrupt)?;
    let status = match required("status")?.as_str() {
        "queued" => JobStatus::Queued,
        "in_progress" => JobStatus::InProgress,
        "complete" => JobStatus::Complete,
        "failed" => JobStatus::Failed,
        other => return Err(corrupt(format!("unknown status '{other}'"))),
    };
    let input: Value =
        serde_json::from_str(required("input")?).map_err(|e| corrupt(format!("input: {e}")))?;
    let result: Option<Value> = map
        .get("result")
        .map(|s| serde_json::from_str(s))
        .transpose()
        .map_err(|e| corrupt(format!("result: {e}")))?;
    let error: Option<JobError> = map
        .get("error")
        .map(|s| serde_json::from_str(s))
        .transpose()
        .map_err(|e| corrupt(format!("error: {e}")))?;

    let parse_ts = |name: &str, raw: &str| {
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| corrupt(format!("{name}: {e}")))
    };
    let enqueued_at = parse_ts("enqueued_at", required("enqueued_at")?)?;
    let started_at = map
        .get("started_at")
        .map(|s| parse_ts("started_at", s))
        .transpose()?;
    let completed_at = map
        .get("completed_at")
        .map(|s| parse_ts("completed_at", s))
        .transpose()?;
    let retry_count: u32 = required("retry_count")?
        .parse()
        .map_err(|e| corrupt(format!("retry_count: {e}")))?;

    Ok(JobRecord {
        job_id: job_id.to_string(),
        job_type,
        status,
        input,
        result,
        error,
        enqueued_at,
        started_at,
        completed_at,
        retry_count,
    })
}
