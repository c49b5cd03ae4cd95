//! Resume improver: Claude-backed rewriting of weak bullets and
//! summaries, plus pure keyword-gap suggestions.
//!
//! Bullets that already read well are skipped, and LLM calls per job are
//! capped so one sprawling resume cannot monopolize a worker slot for
//! minutes.

use tracing::{debug, info};

use crate::collaborators::ExecutionError;
use crate::jobs::payload::{FocusArea, ImproveInput};
use crate::llm_client::{prompts, LlmClient};
use crate::models::report::{ImproveReport, Improvement, ImprovementKind};
use crate::models::resume::ResumeContent;
use crate::services::analyzer::{has_quantifiable, starts_with_action_verb};

/// Upper bound on bullet rewrites per job.
const MAX_BULLET_CALLS: usize = 8;
/// A summary shorter than this gets regenerated.
const MIN_SUMMARY_LEN: usize = 50;
const MAX_KEYWORD_SUGGESTIONS: usize = 5;

/// Keywords most worth adding when absent, in suggestion order.
const IMPORTANT_KEYWORDS: [&str; 9] = [
    "calendar management",
    "email management",
    "administrative support",
    "project coordination",
    "client communication",
    "data entry",
    "crm",
    "scheduling",
    "travel coordination",
];

pub struct Improver {
    llm: LlmClient,
}

impl Improver {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    pub async fn improve(&self, input: &ImproveInput) -> Result<ImproveReport, ExecutionError> {
        let content: ResumeContent = serde_json::from_value(input.content.clone())
            .map_err(|e| ExecutionError::Permanent(format!("malformed resume content: {e}")))?;

        info!(
            resume_improvement_id = %input.resume_improvement_id,
            focus_areas = ?input.focus_areas,
            "generating improvements"
        );

        let mut improvements = Vec::new();
        for focus in &input.focus_areas {
            match focus {
                FocusArea::BulletPoints => {
                    improvements.extend(self.improve_bullets(&content).await?)
                }
                FocusArea::Summary => improvements.extend(self.improve_summary(&content).await?),
                FocusArea::Keywords => improvements.extend(suggest_keywords(&content)),
            }
        }

        // Simple heuristic, capped so the estimate stays plausible.
        let estimated_score_increase = (improvements.len() as f64 * 1.5).min(25.0);

        Ok(ImproveReport {
            resume_improvement_id: input.resume_improvement_id.clone(),
            total_improvements: improvements.len(),
            improvements,
            estimated_score_increase,
        })
    }

    async fn improve_bullets(
        &self,
        content: &ResumeContent,
    ) -> Result<Vec<Improvement>, ExecutionError> {
        let mut improvements = Vec::new();
        for (i, experience) in content.experiences.iter().enumerate() {
            for (j, bullet) in experience.responsibilities.iter().enumerate() {
                if is_strong_bullet(bullet) {
                    debug!("skipping already-strong bullet: {bullet}");
                    continue;
                }
                if improvements.len() >= MAX_BULLET_CALLS {
                    debug!("bullet rewrite cap reached, leaving the rest untouched");
                    return Ok(improvements);
                }
                let improved = self
                    .llm
                    .call_text(
                        &prompts::improve_bullet(bullet, &experience.role),
                        prompts::IMPROVER_SYSTEM,
                    )
                    .await?;
                improvements.push(Improvement {
                    kind: ImprovementKind::BulletPoint,
                    original: bullet.clone(),
                    improved,
                    section: format!("experiences[{i}].responsibilities[{j}]"),
                    reasoning: Some(
                        "Enhanced with action verb and quantifiable metrics".to_string(),
                    ),
                    confidence: 0.9,
                });
            }
        }
        Ok(improvements)
    }

    async fn improve_summary(
        &self,
        content: &ResumeContent,
    ) -> Result<Vec<Improvement>, ExecutionError> {
        if content.summary.trim().len() >= MIN_SUMMARY_LEN {
            return Ok(Vec::new());
        }
        let top_skills: Vec<String> = content.skills.iter().take(5).cloned().collect();
        let improved = self
            .llm
            .call_text(
                &prompts::improve_summary(content.experiences.len(), &top_skills),
                prompts::IMPROVER_SYSTEM,
            )
            .await?;
        Ok(vec![Improvement {
            kind: ImprovementKind::Summary,
            original: content.summary.clone(),
            improved,
            section: "summary".to_string(),
            reasoning: Some(
                "Created compelling value proposition with key achievements".to_string(),
            ),
            confidence: 0.95,
        }])
    }
}

/// A bullet is already strong when it opens with an action verb, carries
/// a metric, and sits in a readable length band.
pub fn is_strong_bullet(bullet: &str) -> bool {
    starts_with_action_verb(bullet) && has_quantifiable(bullet) && (51..200).contains(&bullet.len())
}

/// ATS keywords the content is missing, as append suggestions. Pure:
/// keyword gaps need no LLM.
fn suggest_keywords(content: &ResumeContent) -> Vec<Improvement> {
    let all_text = content.all_text();
    IMPORTANT_KEYWORDS
        .iter()
        .filter(|k| !all_text.contains(*k))
        .take(MAX_KEYWORD_SUGGESTIONS)
        .map(|keyword| Improvement {
            kind: ImprovementKind::Keyword,
            original: String::new(),
            improved: keyword.to_string(),
            section: "skills".to_string(),
            reasoning: Some("Missing ATS keyword for VA roles".to_string()),
            confidence: 0.7,
        })
        .collect()
}
