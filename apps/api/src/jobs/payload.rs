//! Typed input payloads per job type.
//!
//! The dispatcher validates the opaque `input` JSON against these shapes
//! before any persistence; the worker deserializes them again at execution
//! time. A payload that deserialized at submission but fails structural
//! checks inside a collaborator is a permanent execution error, not a retry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::jobs::JobType;
use crate::models::resume::TemplateId;

/// Input for an analysis job: where the uploaded resume lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeInput {
    pub resume_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_improvement_id: Option<String>,
}

/// Which sections the improver rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    BulletPoints,
    Summary,
    Keywords,
}

pub fn default_focus_areas() -> Vec<FocusArea> {
    vec![FocusArea::BulletPoints, FocusArea::Summary, FocusArea::Keywords]
}

/// Input for an improvement job: parsed resume content plus focus areas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImproveInput {
    pub resume_improvement_id: String,
    pub content: Value,
    #[serde(default = "default_focus_areas")]
    pub focus_areas: Vec<FocusArea>,
}

/// Input for a generation job: template choice plus final content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateInput {
    pub resume_improvement_id: String,
    pub template: TemplateId,
    pub content: Value,
    pub user_id: String,
}

/// Structural validation for a submission, checked before any persistence.
pub fn validate(job_type: JobType, input: &Value) -> Result<(), String> {
    match job_type {
        JobType::Analyze => {
            let parsed: AnalyzeInput = deserialize(input)?;
            if !is_http_url(&parsed.resume_url) {
                return Err("resume_url must be an http(s) URL".to_string());
            }
            Ok(())
        }
        JobType::Improve => {
            let parsed: ImproveInput = deserialize(input)?;
            if parsed.resume_improvement_id.trim().is_empty() {
                return Err("resume_improvement_id cannot be empty".to_string());
            }
            if !parsed.content.is_object() {
                return Err("content must be a JSON object".to_string());
            }
            if parsed.focus_areas.is_empty() {
                return Err("focus_areas cannot be empty".to_string());
            }
            Ok(())
        }
        JobType::Generate => {
            let parsed: GenerateInput = deserialize(input)?;
            if parsed.resume_improvement_id.trim().is_empty() {
                return Err("resume_improvement_id cannot be empty".to_string());
            }
            if parsed.user_id.trim().is_empty() {
                return Err("user_id cannot be empty".to_string());
            }
            if !parsed.content.is_object() {
                return Err("content must be a JSON object".to_string());
            }
            Ok(())
        }
    }
}

fn deserialize<T: serde::de::DeserializeOwned>(input: &Value) -> Result<T, String> {
    serde_json::from_value(input.clone()).map_err(|e| format!("invalid input payload: {e}"))
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Caller-supplied job ids double as idempotency keys and Redis key
/// fragments, so the alphabet is restricted.
pub fn validate_job_id(job_id: &str) -> Result<(), String> {
    if job_id.is_empty() || job_id.len() > 128 {
        return Err("job_id must be 1-128 characters".to_string());
    }
    if !job_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("job_id may only contain alphanumerics, '-', '_' and '.'".to_string());
    }
    Ok(())
}
