//! Resume content as it flows between collaborators.
//!
//! The parser produces this shape from extracted PDF text; the analyzer
//! and improver consume it; the generator renders it. All fields default
//! so partially-filled content (e.g. improve requests carrying only a
//! summary and experience) still deserializes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeContent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub year: String,
}

/// The four render templates. Serialized ids match the public API
/// ("ats-optimized", not "ats_optimized").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    Modern,
    Professional,
    AtsOptimized,
    Executive,
}

impl TemplateId {
    pub const ALL: [TemplateId; 4] = [
        TemplateId::Modern,
        TemplateId::Professional,
        TemplateId::AtsOptimized,
        TemplateId::Executive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Modern => "modern",
            TemplateId::Professional => "professional",
            TemplateId::AtsOptimized => "ats-optimized",
            TemplateId::Executive => "executive",
        }
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResumeContent {
    /// All free text joined, for keyword scans.
    pub fn all_text(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.summary];
        for exp in &self.experiences {
            parts.push(&exp.role);
            for bullet in &exp.responsibilities {
                parts.push(bullet);
            }
        }
        for skill in &self.skills {
            parts.push(skill);
        }
        parts.join(" ").to_lowercase()
    }

    /// Every experience bullet, flattened.
    pub fn all_bullets(&self) -> Vec<&str> {
        self.experiences
            .iter()
            .flat_map(|e| e.responsibilities.iter().map(String::as_str))
            .collect()
    }

    pub fn word_count(&self) -> usize {
        let mut count = self.name.split_whitespace().count()
            + self.email.split_whitespace().count()
            + self.summary.split_whitespace().count();
        for skill in &self.skills {
            count += skill.split_whitespace().count();
        }
        for exp in &self.experiences {
            count += exp.role.split_whitespace().count();
            count += exp.company.split_whitespace().count();
            for bullet in &exp.responsibilities {
                count += bullet.split_whitespace().count();
            }
        }
        for edu in &self.education {
            count += edu.degree.split_whitespace().count();
            count += edu.institution.split_whitespace().count();
        }
        count
    }
}
