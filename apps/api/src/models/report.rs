//! Analysis report types: the score breakdown, detected issues,
//! suggestions and resume metadata produced by the analyzer collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Category scores. Maxima: formatting 20, content 30, ATS 25, skills 15,
/// summary 10; overall is their sum out of 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub overall_score: f64,
    pub formatting_score: f64,
    pub content_quality_score: f64,
    pub ats_optimization_score: f64,
    pub skills_section_score: f64,
    pub professional_summary_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub category: String,
    pub severity: Severity,
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: String,
    pub priority: Severity,
    pub suggestion: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub word_count: usize,
    pub page_count: usize,
    pub sections_found: Vec<String>,
    pub has_action_verbs: bool,
    pub has_quantifiable_achievements: bool,
    /// Keyword → occurrence count. BTreeMap keeps serialization stable.
    pub keyword_density: BTreeMap<String, usize>,
}

/// Full analysis result stored as the job's result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_improvement_id: Option<String>,
    pub scores: ScoreBreakdown,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<Suggestion>,
    pub metadata: AnalysisMetadata,
    pub analyzed_at: DateTime<Utc>,
}

/// One AI-generated rewrite produced by the improver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Improvement {
    #[serde(rename = "type")]
    pub kind: ImprovementKind,
    pub original: String,
    pub improved: String,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementKind {
    BulletPoint,
    Summary,
    Keyword,
}

/// Improver result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImproveReport {
    pub resume_improvement_id: String,
    pub improvements: Vec<Improvement>,
    pub total_improvements: usize,
    pub estimated_score_increase: f64,
}

/// Generator result payload: where the rendered document landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReference {
    pub resume_improvement_id: String,
    pub template: crate::models::resume::TemplateId,
    pub file_url: String,
    pub file_name: String,
    pub file_size: usize,
    pub generated_at: DateTime<Utc>,
}
