//! Resume parser: fetches an uploaded document and derives structured
//! content from its extracted text.
//!
//! Extraction failure is a permanent execution error. A resume that
//! cannot be read must fail the job visibly; never substitute
//! fabricated content for a document we could not parse.

use bytes::Bytes;
use tracing::{debug, info};

use crate::collaborators::ExecutionError;
use crate::models::resume::{Education, Experience, ResumeContent};

const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const SUMMARY_HEADERS: [&str; 4] = ["summary", "profile", "objective", "about"];
const EXPERIENCE_HEADERS: [&str; 4] = [
    "experience",
    "work experience",
    "professional experience",
    "employment",
];
const EDUCATION_HEADERS: [&str; 2] = ["education", "academic background"];
const SKILLS_HEADERS: [&str; 3] = ["skills", "technical skills", "core competencies"];
const BULLET_MARKERS: [char; 4] = ['•', '-', '*', '·'];

pub struct DocumentParser {
    http: reqwest::Client,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Download the document and parse it into structured content.
    pub async fn fetch_and_parse(&self, resume_url: &str) -> Result<ResumeContent, ExecutionError> {
        info!("Fetching resume from {resume_url}");
        let bytes = self.fetch(resume_url).await?;
        let text = extract_text(&bytes)?;
        debug!("Extracted {} characters of text", text.len());
        Ok(parse_text(&text))
    }

    async fn fetch(&self, resume_url: &str) -> Result<Bytes, ExecutionError> {
        let response = self
            .http
            .get(resume_url)
            .send()
            .await
            .map_err(|e| ExecutionError::Transient(format!("document fetch failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            // The document is gone or forbidden; retrying cannot help.
            return Err(ExecutionError::Permanent(format!(
                "document fetch returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(ExecutionError::Transient(format!(
                "document fetch returned {status}"
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| ExecutionError::Transient(format!("document read failed: {e}")))
    }
}

/// PDF text extraction. Any failure here is permanent: the input itself
/// is unreadable.
fn extract_text(bytes: &[u8]) -> Result<String, ExecutionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExecutionError::Permanent(format!("document text extraction failed: {e}")))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ExecutionError::Permanent(
            "document contains no extractable text".to_string(),
        ));
    }
    Ok(text.to_string())
}

/// Structure raw resume text: contact header plus the standard sections.
pub fn parse_text(text: &str) -> ResumeContent {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let sections = split_sections(&lines);

    ResumeContent {
        name: extract_name(&lines),
        email: find_email(text).unwrap_or_default(),
        phone: find_phone(&lines).unwrap_or_default(),
        location: find_location(&lines),
        linkedin: find_linkedin(text).unwrap_or_default(),
        summary: sections.summary.join(" "),
        experiences: parse_experiences(&sections.experience),
        education: parse_education(&sections.education),
        skills: parse_skills(&sections.skills),
    }
}

#[derive(Default)]
struct Sections<'a> {
    summary: Vec<&'a str>,
    experience: Vec<&'a str>,
    education: Vec<&'a str>,
    skills: Vec<&'a str>,
}

#[derive(Clone, Copy, PartialEq)]
enum SectionKind {
    None,
    Summary,
    Experience,
    Education,
    Skills,
}

fn header_kind(line: &str) -> Option<SectionKind> {
    // Headers are short standalone lines like "EXPERIENCE" or "Skills:".
    let normalized = line.trim_end_matches(':').trim().to_lowercase();
    if normalized.split_whitespace().count() > 3 {
        return None;
    }
    if SUMMARY_HEADERS.contains(&normalized.as_str()) {
        Some(SectionKind::Summary)
    } else if EXPERIENCE_HEADERS.contains(&normalized.as_str()) {
        Some(SectionKind::Experience)
    } else if EDUCATION_HEADERS.contains(&normalized.as_str()) {
        Some(SectionKind::Education)
    } else if SKILLS_HEADERS.contains(&normalized.as_str()) {
        Some(SectionKind::Skills)
    } else {
        None
    }
}

fn split_sections<'a>(lines: &[&'a str]) -> Sections<'a> {
    let mut sections = Sections::default();
    let mut current = SectionKind::None;
    for line in lines {
        if let Some(kind) = header_kind(line) {
            current = kind;
            continue;
        }
        match current {
            SectionKind::Summary => sections.summary.push(line),
            SectionKind::Experience => sections.experience.push(line),
            SectionKind::Education => sections.education.push(line),
            SectionKind::Skills => sections.skills.push(line),
            SectionKind::None => {}
        }
    }
    sections
}

/// The name is typically the first line: 2-4 words, no contact glyphs.
fn extract_name(lines: &[&str]) -> String {
    let Some(first) = lines.first() else {
        return String::new();
    };
    let words = first.split_whitespace().count();
    if (2..=4).contains(&words) && !first.contains(['@', '|', '•']) {
        first.to_string()
    } else {
        String::new()
    }
}

fn find_email(text: &str) -> Option<String> {
    for token in text.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '@' && c != '.');
        let Some((local, domain)) = token.split_once('@') else {
            continue;
        };
        if !local.is_empty() && domain.contains('.') && !domain.ends_with('.') {
            return Some(token.to_string());
        }
    }
    None
}

/// Phone numbers live in the header area; a line there with 7-15 digits
/// and only phone punctuation qualifies.
fn find_phone(lines: &[&str]) -> Option<String> {
    for line in lines.iter().take(8) {
        for part in line.split(['|', '•']) {
            let part = part.trim();
            let digits = part.chars().filter(char::is_ascii_digit).count();
            let phone_chars = part
                .chars()
                .all(|c| c.is_ascii_digit() || " ()+-.".contains(c));
            if (7..=15).contains(&digits) && phone_chars && !part.is_empty() {
                return Some(part.to_string());
            }
        }
    }
    None
}

fn find_linkedin(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| c == '|' || c == ','))
        .find(|t| t.contains("linkedin.com/"))
        .map(String::from)
}

/// "City, Country" style line near the top: has a comma, few words, no
/// contact glyphs or digits.
fn find_location(lines: &[&str]) -> String {
    for line in lines.iter().take(8).skip(1) {
        for part in line.split(['|', '•']) {
            let part = part.trim();
            if part.contains(',')
                && (2..=5).contains(&part.split_whitespace().count())
                && !part.contains('@')
                && !part.chars().any(|c| c.is_ascii_digit())
            {
                return part.to_string();
            }
        }
    }
    String::new()
}

fn is_bullet(line: &str) -> bool {
    line.starts_with(BULLET_MARKERS)
}

fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(BULLET_MARKERS).trim()
}

/// True if the line carries a plausible year (19xx/20xx).
fn contains_year(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.windows(4).any(|w| {
        w.iter().all(u8::is_ascii_digit) && (w.starts_with(b"19") || w.starts_with(b"20"))
    })
}

/// Experience entries start on a non-bullet role line; bullets attach to
/// the entry above; a dated line becomes its duration.
fn parse_experiences(lines: &[&str]) -> Vec<Experience> {
    let mut experiences: Vec<Experience> = Vec::new();
    for line in lines {
        if is_bullet(line) {
            if let Some(current) = experiences.last_mut() {
                current.responsibilities.push(strip_bullet(line).to_string());
            }
            continue;
        }
        if contains_year(line) {
            if let Some(current) = experiences.last_mut() {
                if current.duration.is_empty() && current.responsibilities.is_empty() {
                    current.duration = line.to_string();
                    continue;
                }
            }
        }
        let (role, company) = split_role_line(line);
        experiences.push(Experience {
            role,
            company,
            duration: String::new(),
            responsibilities: Vec::new(),
        });
    }
    experiences
}

/// "Role at Company" / "Role | Company" / "Role - Company".
fn split_role_line(line: &str) -> (String, String) {
    for separator in [" at ", " | ", " - "] {
        if let Some((role, company)) = line.split_once(separator) {
            return (role.trim().to_string(), company.trim().to_string());
        }
    }
    (line.trim().to_string(), String::new())
}

fn parse_education(lines: &[&str]) -> Vec<Education> {
    lines
        .iter()
        .map(|line| {
            let line = strip_bullet(line);
            let year = line
                .split_whitespace()
                .rev()
                .find(|t| contains_year(t))
                .unwrap_or("")
                .to_string();
            match line.split_once(',') {
                Some((degree, institution)) => Education {
                    degree: degree.trim().to_string(),
                    institution: institution
                        .trim()
                        .trim_end_matches(|c: char| c.is_ascii_digit() || c == ' ')
                        .to_string(),
                    year,
                },
                None => Education {
                    degree: line.to_string(),
                    institution: String::new(),
                    year,
                },
            }
        })
        .collect()
}

fn parse_skills(lines: &[&str]) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();
    for line in lines {
        for part in strip_bullet(line).split([',', '•', '|', ';']) {
            let part = part.trim();
            if !part.is_empty() && !skills.iter().any(|s| s.eq_ignore_ascii_case(part)) {
                skills.push(part.to_string());
            }
        }
    }
    skills
}
