//! The worker's execution seam.
//!
//! Collaborators are the slow, failure-prone functions the orchestration
//! core wraps: analysis, improvement, generation. From the worker's point
//! of view each is a synchronous black box that returns a serializable
//! result or raises a recoverable/unrecoverable error; the worker owns
//! timeouts and retry policy. Tests swap in scripted fakes behind the
//! same trait.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::jobs::payload::{AnalyzeInput, GenerateInput, ImproveInput};
use crate::jobs::JobType;
use crate::llm_client::LlmClient;
use crate::services::analyzer;
use crate::services::generator::Generator;
use crate::services::improver::Improver;
use crate::services::parser::DocumentParser;
use crate::storage::ArtifactStorage;

/// The only error contract between collaborators and the worker loop:
/// transient failures are retried with backoff, permanent ones fail the
/// job on the first attempt.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Permanent(String),
}

impl ExecutionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExecutionError::Transient(_))
    }
}

impl From<crate::llm_client::LlmError> for ExecutionError {
    fn from(e: crate::llm_client::LlmError) -> Self {
        if e.is_transient() {
            ExecutionError::Transient(e.to_string())
        } else {
            ExecutionError::Permanent(e.to_string())
        }
    }
}

#[async_trait]
pub trait Collaborators: Send + Sync {
    async fn execute(&self, job_type: JobType, input: &Value) -> Result<Value, ExecutionError>;
}

/// Production wiring: parser + analyzer for analyze jobs, Claude-backed
/// improver for improve jobs, template renderer + artifact storage for
/// generate jobs. Everything here is worker-local and freely duplicated
/// across processes.
pub struct LiveCollaborators {
    parser: DocumentParser,
    improver: Improver,
    generator: Generator,
}

impl LiveCollaborators {
    pub fn new(llm: LlmClient, storage: std::sync::Arc<dyn ArtifactStorage>) -> Self {
        Self {
            parser: DocumentParser::new(),
            improver: Improver::new(llm),
            generator: Generator::new(storage),
        }
    }
}

#[async_trait]
impl Collaborators for LiveCollaborators {
    async fn execute(&self, job_type: JobType, input: &Value) -> Result<Value, ExecutionError> {
        match job_type {
            JobType::Analyze => {
                let input: AnalyzeInput = typed(input)?;
                let content = self.parser.fetch_and_parse(&input.resume_url).await?;
                let mut report = analyzer::analyze(&content);
                report.resume_improvement_id = input.resume_improvement_id;
                serialize(&report)
            }
            JobType::Improve => {
                let input: ImproveInput = typed(input)?;
                let report = self.improver.improve(&input).await?;
                serialize(&report)
            }
            JobType::Generate => {
                let input: GenerateInput = typed(input)?;
                let reference = self.generator.generate(&input).await?;
                serialize(&reference)
            }
        }
    }
}

/// A payload that deserialized at submission but no longer does is
/// malformed input, not a retry candidate.
fn typed<T: serde::de::DeserializeOwned>(input: &Value) -> Result<T, ExecutionError> {
    serde_json::from_value(input.clone())
        .map_err(|e| ExecutionError::Permanent(format!("malformed input payload: {e}")))
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<Value, ExecutionError> {
    serde_json::to_value(value)
        .map_err(|e| ExecutionError::Permanent(format!("unserializable result: {e}")))
}
