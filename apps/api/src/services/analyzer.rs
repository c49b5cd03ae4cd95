//! Resume analyzer: deterministic scoring across five categories.
//!
//! Formatting (20), content quality (30), ATS optimization (25), skills
//! section (15), professional summary (10); overall is the sum out of
//! 100. Pure functions over parsed content: no I/O, so the whole module
//! is unit-testable and safe to run inside any worker slot.

use chrono::Utc;
use std::collections::BTreeMap;

use crate::models::report::{
    AnalysisMetadata, Issue, ScoreBreakdown, ScoreReport, Severity, Suggestion,
};
use crate::models::resume::ResumeContent;

/// VA-role keywords used for ATS scoring and keyword density.
pub const VA_KEYWORDS: [&str; 27] = [
    "virtual assistant",
    "administrative support",
    "calendar management",
    "email management",
    "scheduling",
    "data entry",
    "crm",
    "customer service",
    "project coordination",
    "travel coordination",
    "expense management",
    "social media",
    "content management",
    "bookkeeping",
    "invoicing",
    "asana",
    "trello",
    "monday.com",
    "slack",
    "zoom",
    "google workspace",
    "microsoft office",
    "excel",
    "powerpoint",
    "ghl",
    "gohighlevel",
    "inbox zero",
];

/// Strong opening verbs for content scoring.
pub const ACTION_VERBS: [&str; 23] = [
    "managed",
    "coordinated",
    "led",
    "developed",
    "implemented",
    "optimized",
    "streamlined",
    "organized",
    "executed",
    "facilitated",
    "achieved",
    "increased",
    "reduced",
    "improved",
    "created",
    "designed",
    "established",
    "maintained",
    "analyzed",
    "processed",
    "handled",
    "supported",
    "assisted",
];

pub fn analyze(content: &ResumeContent) -> ScoreReport {
    let mut issues = Vec::new();

    let (formatting, mut found) = score_formatting(content);
    issues.append(&mut found);
    let (content_quality, mut found) = score_content_quality(content);
    issues.append(&mut found);
    let (ats, mut found) = score_ats_optimization(content);
    issues.append(&mut found);
    let (skills, mut found) = score_skills_section(content);
    issues.append(&mut found);
    let (summary, mut found) = score_professional_summary(content);
    issues.append(&mut found);

    let suggestions = generate_suggestions(&issues);
    let metadata = extract_metadata(content);

    ScoreReport {
        resume_improvement_id: None,
        scores: ScoreBreakdown {
            overall_score: formatting + content_quality + ats + skills + summary,
            formatting_score: formatting,
            content_quality_score: content_quality,
            ats_optimization_score: ats,
            skills_section_score: skills,
            professional_summary_score: summary,
        },
        issues,
        suggestions,
        metadata,
        analyzed_at: Utc::now(),
    }
}

pub fn starts_with_action_verb(bullet: &str) -> bool {
    bullet
        .split_whitespace()
        .next()
        .map(|w| w.trim_end_matches(['.', ',', '!', '?']).to_lowercase())
        .is_some_and(|w| ACTION_VERBS.contains(&w.as_str()))
}

pub fn has_quantifiable(bullet: &str) -> bool {
    bullet.chars().any(|c| c.is_ascii_digit()) || bullet.contains('$') || bullet.contains('%')
}

fn issue(category: &str, severity: Severity, text: impl Into<String>) -> Issue {
    Issue {
        category: category.to_string(),
        severity,
        issue: text.into(),
        location: None,
        example: None,
    }
}

fn located(mut i: Issue, location: &str) -> Issue {
    i.location = Some(location.to_string());
    i
}

fn with_example(mut i: Issue, example: impl Into<String>) -> Issue {
    i.example = Some(example.into());
    i
}

/// Duration strings come in a handful of shapes; more than one shape on
/// the same resume reads as sloppy formatting.
fn date_format_of(duration: &str) -> Option<&'static str> {
    let bytes = duration.as_bytes();
    let has_compact_year_pair = bytes.windows(9).any(|w| {
        w[4] == b'-'
            && w[..4].iter().all(u8::is_ascii_digit)
            && w[5..].iter().all(u8::is_ascii_digit)
    });
    if has_compact_year_pair {
        return Some("YYYY-YYYY");
    }
    let tokens: Vec<&str> = duration.split_whitespace().collect();
    for window in tokens.windows(2) {
        let month_like = window[0].len() == 3
            && window[0].chars().next().is_some_and(char::is_uppercase)
            && window[0].chars().all(char::is_alphabetic);
        let year_like = window[1].len() == 4 && window[1].chars().all(|c| c.is_ascii_digit());
        if month_like && year_like {
            return Some("Mon YYYY");
        }
    }
    for token in &tokens {
        if let Some((month, year)) = token.split_once('/') {
            if (1..=2).contains(&month.len())
                && month.chars().all(|c| c.is_ascii_digit())
                && year.len() == 4
                && year.chars().all(|c| c.is_ascii_digit())
            {
                return Some("MM/YYYY");
            }
        }
    }
    None
}

/// Formatting, 0-20: date consistency, section presence, bullet
/// structure, overall length.
fn score_formatting(content: &ResumeContent) -> (f64, Vec<Issue>) {
    let mut score = 0.0;
    let mut issues = Vec::new();

    // Date consistency (5 points)
    let mut formats: Vec<&str> = content
        .experiences
        .iter()
        .filter_map(|e| date_format_of(&e.duration))
        .collect();
    formats.sort_unstable();
    formats.dedup();
    match formats.len() {
        0 | 1 => score += 5.0,
        2 => {
            score += 2.5;
            issues.push(with_example(
                located(
                    issue("formatting", Severity::Medium, "Inconsistent date formats detected"),
                    "Experience section",
                ),
                format!("Mix of {} formats", formats.join(" and ")),
            ));
        }
        n => {
            issues.push(with_example(
                located(
                    issue("formatting", Severity::High, "Multiple inconsistent date formats"),
                    "Experience section",
                ),
                format!("Found {n} different date formats"),
            ));
        }
    }

    // Section presence (5 points)
    let has_contact = !content.name.is_empty() || !content.email.is_empty();
    let has_experience = !content.experiences.is_empty();
    let has_skills = !content.skills.is_empty();
    let has_education = !content.education.is_empty();
    let present = [has_contact, has_experience, has_skills, has_education]
        .iter()
        .filter(|p| **p)
        .count();
    score += present as f64 / 4.0 * 5.0;
    if present < 4 {
        let mut missing = Vec::new();
        if !has_contact {
            missing.push("contact info");
        }
        if !has_experience {
            missing.push("experience");
        }
        if !has_skills {
            missing.push("skills");
        }
        if !has_education {
            missing.push("education");
        }
        issues.push(located(
            issue(
                "formatting",
                Severity::High,
                format!("Missing standard sections: {}", missing.join(", ")),
            ),
            "Overall structure",
        ));
    }

    // Bullet structure (5 points)
    if content.experiences.is_empty() {
        score += 2.5; // partial credit if no experience at all
    } else {
        let without_bullets = content
            .experiences
            .iter()
            .filter(|e| e.responsibilities.is_empty())
            .count();
        if without_bullets == 0 {
            score += 5.0;
        } else if without_bullets * 2 <= content.experiences.len() {
            score += 2.5;
            issues.push(located(
                issue(
                    "formatting",
                    Severity::Medium,
                    "Some experience entries lack bullet points",
                ),
                "Experience section",
            ));
        } else {
            issues.push(located(
                issue(
                    "formatting",
                    Severity::High,
                    "Most experience entries lack bullet points/descriptions",
                ),
                "Experience section",
            ));
        }
    }

    // Length (5 points)
    let words = content.word_count();
    match words {
        400..=800 => score += 5.0,
        300..=399 | 801..=1000 => {
            score += 3.0;
            issues.push(with_example(
                located(
                    issue(
                        "formatting",
                        Severity::Low,
                        format!("Resume length could be optimized (estimated {words} words)"),
                    ),
                    "Overall",
                ),
                "Aim for 400-800 words for 1-2 pages",
            ));
        }
        0..=299 => {
            score += 1.0;
            issues.push(located(
                issue(
                    "formatting",
                    Severity::High,
                    format!("Resume appears too short (estimated {words} words)"),
                ),
                "Overall",
            ));
        }
        _ => {
            score += 2.0;
            issues.push(with_example(
                located(
                    issue(
                        "formatting",
                        Severity::Medium,
                        format!("Resume may be too long (estimated {words} words)"),
                    ),
                    "Overall",
                ),
                "Consider condensing to 1-2 pages",
            ));
        }
    }

    (score, issues)
}

/// Content quality, 0-30: action verbs, quantified achievements,
/// pronoun hygiene, accomplishment depth.
fn score_content_quality(content: &ResumeContent) -> (f64, Vec<Issue>) {
    let mut score = 0.0;
    let mut issues = Vec::new();

    let bullets = content.all_bullets();
    if bullets.is_empty() {
        issues.push(located(
            issue(
                "content",
                Severity::Critical,
                "No bullet points found in experience section",
            ),
            "Experience section",
        ));
        return (5.0, issues); // minimal score for having experience at all
    }

    // Action verbs (10 points)
    let with_verbs = bullets.iter().filter(|b| starts_with_action_verb(b)).count();
    let verb_ratio = with_verbs as f64 / bullets.len() as f64;
    score += verb_ratio * 10.0;
    if verb_ratio < 0.5 {
        issues.push(with_example(
            located(
                issue(
                    "content",
                    Severity::High,
                    format!(
                        "Only {}% of bullet points start with strong action verbs",
                        (verb_ratio * 100.0) as u32
                    ),
                ),
                "Experience section",
            ),
            "Use verbs like: managed, coordinated, implemented, optimized",
        ));
    }

    // Quantifiable achievements (10 points)
    let with_numbers = bullets.iter().filter(|b| has_quantifiable(b)).count();
    let numbers_ratio = with_numbers as f64 / bullets.len() as f64;
    score += numbers_ratio * 10.0;
    if numbers_ratio < 0.3 {
        issues.push(with_example(
            located(
                issue(
                    "content",
                    Severity::High,
                    format!(
                        "Only {}% of bullet points contain quantifiable achievements",
                        (numbers_ratio * 100.0) as u32
                    ),
                ),
                "Experience section",
            ),
            "Add metrics like: 'Managed 15+ calendars', 'Reduced response time by 40%'",
        ));
    }

    // Personal pronouns (5 points)
    let joined = bullets.join(" ").to_lowercase();
    let pronoun_count: usize = ["i ", "my ", "me ", "we ", "our ", "us "]
        .iter()
        .map(|p| joined.matches(p).count())
        .sum();
    match pronoun_count {
        0 => score += 5.0,
        1..=2 => {
            score += 3.0;
            issues.push(with_example(
                located(
                    issue(
                        "content",
                        Severity::Low,
                        format!("Resume contains {pronoun_count} personal pronouns"),
                    ),
                    "Experience section",
                ),
                "Avoid 'I', 'my', 'we' - use direct action statements",
            ));
        }
        _ => {
            score += 1.0;
            issues.push(with_example(
                located(
                    issue(
                        "content",
                        Severity::Medium,
                        format!("Resume contains {pronoun_count} personal pronouns"),
                    ),
                    "Experience section",
                ),
                "Remove 'I', 'my', 'we' - start with action verbs directly",
            ));
        }
    }

    // Accomplishment depth (5 points)
    let avg_len = bullets.iter().map(|b| b.len()).sum::<usize>() as f64 / bullets.len() as f64;
    if avg_len >= 80.0 {
        score += 5.0;
    } else if avg_len >= 50.0 {
        score += 3.0;
    } else if avg_len >= 30.0 {
        score += 2.0;
        issues.push(with_example(
            located(
                issue(
                    "content",
                    Severity::Medium,
                    "Bullet points are too brief - add more detail about impact",
                ),
                "Experience section",
            ),
            "Expand: 'Managed calendars' into 'Managed 10+ executive calendars, optimizing scheduling efficiency by 40%'",
        ));
    } else {
        score += 1.0;
        issues.push(located(
            issue(
                "content",
                Severity::High,
                "Bullet points are very brief and lack detail",
            ),
            "Experience section",
        ));
    }

    (score, issues)
}

/// ATS optimization, 0-25: standard sections, VA keyword coverage,
/// parser-safe formatting.
fn score_ats_optimization(content: &ResumeContent) -> (f64, Vec<Issue>) {
    let mut score = 0.0;
    let mut issues = Vec::new();

    let has_standard_sections = (!content.name.is_empty() || !content.email.is_empty())
        && !content.experiences.is_empty()
        && !content.skills.is_empty()
        && !content.education.is_empty();
    score += if has_standard_sections { 10.0 } else { 5.0 };

    let all_text = content.all_text();
    let matches = VA_KEYWORDS.iter().filter(|k| all_text.contains(*k)).count();
    let keyword_ratio = matches as f64 / VA_KEYWORDS.len() as f64;
    score += keyword_ratio * 10.0;
    if keyword_ratio < 0.15 {
        issues.push(with_example(
            located(
                issue(
                    "ats",
                    Severity::Critical,
                    "Very few VA-specific keywords detected",
                ),
                "Overall content",
            ),
            "Add keywords like: calendar management, administrative support, CRM, Asana, Google Workspace",
        ));
    } else if keyword_ratio < 0.3 {
        issues.push(with_example(
            located(
                issue(
                    "ats",
                    Severity::High,
                    format!(
                        "Only {}% keyword coverage for VA roles",
                        (keyword_ratio * 100.0) as u32
                    ),
                ),
                "Overall content",
            ),
            "Include more VA-specific terms and tools",
        ));
    }

    // Text extraction already flattened tables/graphics; assume parser-safe.
    score += 5.0;

    (score, issues)
}

/// Skills section, 0-15: presence, count, VA relevance.
fn score_skills_section(content: &ResumeContent) -> (f64, Vec<Issue>) {
    let mut score = 0.0;
    let mut issues = Vec::new();

    let skills = &content.skills;
    if skills.is_empty() {
        issues.push(located(
            issue("skills", Severity::Critical, "No skills section found"),
            "Skills section",
        ));
        return (score, issues);
    }
    score += 5.0;

    match skills.len() {
        n if n >= 12 => score += 5.0,
        n if n >= 8 => score += 3.5,
        n if n >= 5 => {
            score += 2.0;
            issues.push(with_example(
                located(
                    issue(
                        "skills",
                        Severity::Medium,
                        format!("Only {n} skills listed - aim for 10-15"),
                    ),
                    "Skills section",
                ),
                "Add more specific tools and software you're proficient in",
            ));
        }
        n => {
            score += 1.0;
            issues.push(located(
                issue(
                    "skills",
                    Severity::High,
                    format!("Very few skills listed ({n}) - should have 10-15"),
                ),
                "Skills section",
            ));
        }
    }

    let relevant = skills
        .iter()
        .filter(|s| {
            let lower = s.to_lowercase();
            VA_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .count();
    let relevance_ratio = relevant as f64 / skills.len() as f64;
    score += relevance_ratio * 5.0;
    if relevance_ratio < 0.3 {
        issues.push(with_example(
            located(
                issue(
                    "skills",
                    Severity::High,
                    format!(
                        "Only {}% of skills are VA-relevant",
                        (relevance_ratio * 100.0) as u32
                    ),
                ),
                "Skills section",
            ),
            "Add VA-specific skills: Asana, Google Calendar, CRM tools, email management",
        ));
    }

    (score, issues)
}

/// Professional summary, 0-10: presence, length, keywords.
fn score_professional_summary(content: &ResumeContent) -> (f64, Vec<Issue>) {
    let mut score = 0.0;
    let mut issues = Vec::new();

    let summary = content.summary.trim();
    if summary.is_empty() {
        issues.push(with_example(
            located(
                issue("summary", Severity::High, "No professional summary found"),
                "Summary section",
            ),
            "Add a 2-3 sentence summary highlighting your VA experience and key strengths",
        ));
        return (score, issues);
    }
    score += 3.0;

    let words = summary.split_whitespace().count();
    match words {
        40..=100 => score += 4.0,
        25..=39 | 101..=150 => {
            score += 2.5;
            issues.push(with_example(
                located(
                    issue(
                        "summary",
                        Severity::Low,
                        format!("Summary length could be optimized ({words} words)"),
                    ),
                    "Summary section",
                ),
                "Aim for 40-100 words (2-3 sentences)",
            ));
        }
        0..=24 => {
            score += 1.0;
            issues.push(located(
                issue(
                    "summary",
                    Severity::Medium,
                    format!("Summary is too brief ({words} words)"),
                ),
                "Summary section",
            ));
        }
        _ => {
            score += 2.0;
            issues.push(with_example(
                located(
                    issue(
                        "summary",
                        Severity::Medium,
                        format!("Summary is too long ({words} words)"),
                    ),
                    "Summary section",
                ),
                "Condense to 2-3 impactful sentences",
            ));
        }
    }

    let summary_lower = summary.to_lowercase();
    let keywords = VA_KEYWORDS
        .iter()
        .filter(|k| summary_lower.contains(*k))
        .count();
    match keywords {
        n if n >= 3 => score += 3.0,
        2 => score += 2.0,
        1 => {
            score += 1.0;
            issues.push(with_example(
                located(
                    issue(
                        "summary",
                        Severity::Medium,
                        "Summary lacks VA-specific keywords",
                    ),
                    "Summary section",
                ),
                "Include terms like: virtual assistant, administrative support, calendar management",
            ));
        }
        _ => {
            issues.push(located(
                issue(
                    "summary",
                    Severity::High,
                    "Summary has no VA-specific keywords",
                ),
                "Summary section",
            ));
        }
    }

    (score, issues)
}

fn generate_suggestions(issues: &[Issue]) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let mentions = |needle: &str| issues.iter().any(|i| i.issue.to_lowercase().contains(needle));
    let severe_in_category = |category: &str| {
        issues.iter().any(|i| {
            i.category == category && matches!(i.severity, Severity::Critical | Severity::High)
        })
    };

    if mentions("quantifiable achievements") {
        suggestions.push(Suggestion {
            category: "content".to_string(),
            priority: Severity::Critical,
            suggestion: "Add quantifiable metrics to demonstrate your impact".to_string(),
            examples: vec![
                "Managed 15+ executive calendars with 99% accuracy".to_string(),
                "Reduced email response time by 45% through automation".to_string(),
                "Coordinated travel for 20+ international trips annually".to_string(),
            ],
            reasoning: Some(
                "Numbers make your achievements concrete and memorable to recruiters".to_string(),
            ),
        });
    }

    if mentions("action verb") {
        suggestions.push(Suggestion {
            category: "content".to_string(),
            priority: Severity::High,
            suggestion: "Start bullet points with strong action verbs".to_string(),
            examples: vec![
                "Coordinated".to_string(),
                "Streamlined".to_string(),
                "Optimized".to_string(),
                "Managed".to_string(),
                "Implemented".to_string(),
            ],
            reasoning: Some(
                "Action verbs make your resume more dynamic and results-oriented".to_string(),
            ),
        });
    }

    if mentions("keyword") {
        suggestions.push(Suggestion {
            category: "ats".to_string(),
            priority: Severity::Critical,
            suggestion: "Optimize for ATS with VA-specific keywords".to_string(),
            examples: vec![
                "Administrative Support".to_string(),
                "Calendar Management".to_string(),
                "CRM (HubSpot, Salesforce)".to_string(),
                "Project Management Tools (Asana, Monday.com)".to_string(),
                "Google Workspace".to_string(),
                "Data Entry".to_string(),
            ],
            reasoning: Some("80% of resumes are filtered by ATS before human review".to_string()),
        });
    }

    if issues.iter().any(|i| i.category == "skills") {
        suggestions.push(Suggestion {
            category: "skills".to_string(),
            priority: Severity::High,
            suggestion: "Expand your skills section with specific tools and platforms".to_string(),
            examples: vec![
                "Scheduling: Google Calendar, Calendly".to_string(),
                "Communication: Slack, Zoom, Microsoft Teams".to_string(),
                "Project Management: Asana, Trello, Monday.com".to_string(),
                "CRM: HubSpot, Salesforce, Pipedrive".to_string(),
            ],
            reasoning: Some(
                "Specific tool proficiency helps you stand out and pass ATS filters".to_string(),
            ),
        });
    }

    if severe_in_category("summary") {
        suggestions.push(Suggestion {
            category: "summary".to_string(),
            priority: Severity::High,
            suggestion: "Craft a compelling professional summary that hooks recruiters".to_string(),
            examples: vec![
                "Detail-oriented Virtual Assistant with 5+ years supporting C-suite executives"
                    .to_string(),
                "Specialized in calendar optimization, reducing scheduling conflicts by 40%"
                    .to_string(),
                "Proficient in Google Workspace, Asana, and HubSpot".to_string(),
            ],
            reasoning: Some(
                "Your summary is the first thing recruiters read - make it count".to_string(),
            ),
        });
    }

    suggestions
}

fn extract_metadata(content: &ResumeContent) -> AnalysisMetadata {
    let word_count = content.word_count();

    let mut sections_found = Vec::new();
    if !content.name.is_empty() || !content.email.is_empty() {
        sections_found.push("contact".to_string());
    }
    if !content.summary.trim().is_empty() {
        sections_found.push("summary".to_string());
    }
    if !content.experiences.is_empty() {
        sections_found.push("experience".to_string());
    }
    if !content.education.is_empty() {
        sections_found.push("education".to_string());
    }
    if !content.skills.is_empty() {
        sections_found.push("skills".to_string());
    }

    let bullets = content.all_bullets();
    let has_action_verbs = bullets.iter().any(|b| starts_with_action_verb(b));
    let has_quantifiable_achievements = bullets.iter().any(|b| has_quantifiable(b));

    let all_text = content.all_text();
    let mut keyword_density = BTreeMap::new();
    for keyword in VA_KEYWORDS {
        let count = all_text.matches(keyword).count();
        if count > 0 {
            keyword_density.insert(keyword.to_string(), count);
        }
    }

    AnalysisMetadata {
        word_count,
        page_count: if word_count < 500 { 1 } else { 2 },
        sections_found,
        has_action_verbs,
        has_quantifiable_achievements,
        keyword_density,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Education, Experience};

    fn strong_content() -> ResumeContent {
        let bullet = |text: &str| text.to_string();
        ResumeContent {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            summary: "Detail-oriented virtual assistant with 6 years of administrative support \
                      experience for C-suite executives. Specialized in calendar management and \
                      email management, reducing scheduling conflicts by 40% while coordinating \
                      travel, expenses and CRM updates across Google Workspace, Asana and Slack \
                      for distributed teams in three time zones."
                .to_string(),
            experiences: vec![
                Experience {
                    role: "Virtual Assistant".to_string(),
                    company: "Tech Corp".to_string(),
                    duration: "2020 - 2023".to_string(),
                    responsibilities: vec![
                        bullet("Managed 10+ executive calendars, reducing scheduling conflicts by 40% across teams"),
                        bullet("Streamlined email management workflows, cutting response time by 45% for 5 executives"),
                        bullet("Coordinated travel and expense management for 20+ international trips annually"),
                    ],
                },
                Experience {
                    role: "Administrative Assistant".to_string(),
                    company: "Acme Inc".to_string(),
                    duration: "2018 - 2020".to_string(),
                    responsibilities: vec![
                        bullet("Implemented CRM data entry procedures that improved record accuracy to 99%"),
                        bullet("Organized project coordination boards in Asana for 12 concurrent client projects"),
                    ],
                },
            ],
            education: vec![Education {
                degree: "BS Business Administration".to_string(),
                institution: "State University".to_string(),
                year: "2018".to_string(),
            }],
            skills: [
                "Calendar Management",
                "Email Management",
                "Data Entry",
                "CRM",
                "Asana",
                "Trello",
                "Slack",
                "Zoom",
                "Google Workspace",
                "Excel",
                "PowerPoint",
                "Scheduling",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn strong_resume_scores_high() {
        let report = analyze(&strong_content());
        assert!(report.scores.overall_score > 75.0, "got {}", report.scores.overall_score);
        assert!(report.scores.formatting_score > 15.0);
        assert!(report.scores.content_quality_score > 24.0);
        assert!(report.scores.skills_section_score > 12.0);
        assert!(report.metadata.has_action_verbs);
        assert!(report.metadata.has_quantifiable_achievements);
    }

    #[test]
    fn empty_resume_floors_and_flags() {
        let report = analyze(&ResumeContent::default());
        assert!(report.scores.overall_score < 30.0);
        assert!(report
            .issues
            .iter()
            .any(|i| i.severity == Severity::Critical && i.category == "skills"));
        assert!(report.issues.iter().any(|i| i.category == "summary"));
    }

    #[test]
    fn category_scores_respect_maxima() {
        for content in [ResumeContent::default(), strong_content()] {
            let report = analyze(&content);
            assert!(report.scores.formatting_score <= 20.0);
            assert!(report.scores.content_quality_score <= 30.0);
            assert!(report.scores.ats_optimization_score <= 25.0);
            assert!(report.scores.skills_section_score <= 15.0);
            assert!(report.scores.professional_summary_score <= 10.0);
        }
    }

    #[test]
    fn action_verb_detection() {
        assert!(starts_with_action_verb("Managed calendars for 5 executives"));
        assert!(starts_with_action_verb("coordinated, travel"));
        assert!(!starts_with_action_verb("Responsible for calendars"));
        assert!(!starts_with_action_verb(""));
    }

    #[test]
    fn quantifiable_detection() {
        assert!(has_quantifiable("Cut costs by 30%"));
        assert!(has_quantifiable("Managed a $50K budget"));
        assert!(!has_quantifiable("Handled communications"));
    }

    #[test]
    fn date_format_classification() {
        assert_eq!(date_format_of("2020-2023"), Some("YYYY-YYYY"));
        assert_eq!(date_format_of("Jan 2020 to Mar 2021"), Some("Mon YYYY"));
        assert_eq!(date_format_of("01/2020"), Some("MM/YYYY"));
        assert_eq!(date_format_of("2020 - 2023"), None);
        assert_eq!(date_format_of("Present"), None);
    }

    #[test]
    fn mixed_date_formats_flagged() {
        let mut content = strong_content();
        content.experiences[0].duration = "2020-2023".to_string();
        content.experiences[1].duration = "Jan 2018 to Mar 2020".to_string();
        let report = analyze(&content);
        assert!(report
            .issues
            .iter()
            .any(|i| i.issue.contains("Inconsistent date formats")));
    }

    #[test]
    fn pronoun_heavy_bullets_penalized() {
        let mut content = strong_content();
        for exp in &mut content.experiences {
            for b in &mut exp.responsibilities {
                *b = format!("I think my team said we did well. {b}");
            }
        }
        let report = analyze(&content);
        assert!(report
            .issues
            .iter()
            .any(|i| i.issue.contains("personal pronouns")));
    }

    #[test]
    fn suggestions_follow_issues() {
        let report = analyze(&ResumeContent::default());
        assert!(report
            .suggestions
            .iter()
            .any(|s| s.category == "skills"));
        // A strong resume needs few or no suggestions.
        let strong = analyze(&strong_content());
        assert!(strong.suggestions.len() <= 2);
    }

    #[test]
    fn keyword_density_counts_occurrences() {
        let report = analyze(&strong_content());
        assert!(report.metadata.keyword_density.get("calendar management").copied().unwrap_or(0) >= 1);
        assert!(!report.metadata.keyword_density.contains_key("bookkeeping"));
    }
}
