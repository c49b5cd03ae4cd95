use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing; worker tunables
/// all carry defaults matching the production queue policy.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,

    /// Concurrent execution slots per worker process.
    pub worker_slots: usize,
    /// Hard cap on a single collaborator invocation.
    pub job_timeout: Duration,
    /// Transient failures retried up to this many times.
    pub max_retries: u32,
    /// Backoff base; attempt n waits base * 2^n before visibility.
    pub retry_backoff: Duration,
    /// How long terminal records stay readable before eviction.
    pub result_retention: Duration,
    /// An in_progress record older than this is treated as abandoned.
    pub lease: Duration,
    /// Sweeper cadence (delayed promotion, lease reaping, expiry).
    pub sweep_interval: Duration,
    /// Queue pop timeout; bounds shutdown latency.
    pub poll_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: env_or("PORT", "8080")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            worker_slots: env_or("WORKER_SLOTS", "10")?,
            job_timeout: secs_env("JOB_TIMEOUT_SECS", "300")?,
            max_retries: env_or("MAX_RETRIES", "3")?,
            retry_backoff: secs_env("RETRY_BACKOFF_SECS", "10")?,
            result_retention: secs_env("RESULT_RETENTION_SECS", "3600")?,
            lease: secs_env("JOB_LEASE_SECS", "600")?,
            sweep_interval: secs_env("SWEEP_INTERVAL_SECS", "120")?,
            poll_timeout: secs_env("POLL_TIMEOUT_SECS", "5")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .with_context(|| format!("'{key}' must be a valid value"))
}

fn secs_env(key: &str, default: &str) -> Result<Duration> {
    Ok(Duration::from_secs(env_or::<u64>(key, default)?))
}
