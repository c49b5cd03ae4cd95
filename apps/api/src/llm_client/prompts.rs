//! Prompt builders for the improvement collaborator.
//!
//! Each prompt instructs the model to return ONLY the rewritten text so
//! the caller can use the reply verbatim.

pub const IMPROVER_SYSTEM: &str =
    "You are an expert resume writer specializing in Virtual Assistant roles.";

/// Rewrite one experience bullet with an action verb and metrics.
pub fn improve_bullet(bullet: &str, role: &str) -> String {
    format!(
        r#"Improve this bullet point from a {role} position:
"{bullet}"

Requirements:
- Start with a strong action verb
- Add specific metrics or quantifiable achievements where logical
- Keep it concise (under 150 characters)
- Make it impactful and results-oriented
- Focus on VA-relevant skills (calendar management, email, admin, communication)

Return ONLY the improved bullet point, nothing else."#
    )
}

/// Generate a professional summary from the rest of the content.
pub fn improve_summary(position_count: usize, top_skills: &[String]) -> String {
    format!(
        r#"Create a compelling professional summary (2-3 sentences, max 250 characters) for a Virtual Assistant with:
- Experience: {position_count} positions
- Key skills: {skills}

Requirements:
- Start with years of experience or standout qualification
- Highlight 2-3 key strengths or achievements
- Include VA-relevant skills
- End with value proposition
- Professional but engaging tone

Return ONLY the summary, nothing else."#,
        skills = top_skills.join(", "),
    )
}
