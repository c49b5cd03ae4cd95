//! Template catalog served by `GET /api/v1/templates`.

use serde::Serialize;

use crate::models::resume::TemplateId;

#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub id: TemplateId,
    pub name: &'static str,
    pub description: &'static str,
    pub best_for: &'static [&'static str],
    pub thumbnail_url: &'static str,
}

pub fn catalog() -> Vec<TemplateInfo> {
    vec![
        TemplateInfo {
            id: TemplateId::Modern,
            name: "Modern",
            description: "Clean, minimal design with two-column layout. Tech-focused aesthetic.",
            best_for: &[
                "Tech-savvy VAs",
                "Digital-first roles",
                "Startup environments",
                "Social media managers",
            ],
            thumbnail_url: "/static/templates/modern-thumbnail.png",
        },
        TemplateInfo {
            id: TemplateId::Professional,
            name: "Professional",
            description: "Traditional single-column layout. Corporate-friendly and timeless.",
            best_for: &[
                "Executive assistants",
                "Corporate environments",
                "Traditional industries",
                "Senior-level positions",
            ],
            thumbnail_url: "/static/templates/professional-thumbnail.png",
        },
        TemplateInfo {
            id: TemplateId::AtsOptimized,
            name: "ATS-Optimized",
            description: "Simple, parser-friendly format. Maximum compatibility with applicant tracking systems.",
            best_for: &[
                "Large company applications",
                "Online job portals",
                "Maximum ATS compatibility",
                "Entry to mid-level roles",
            ],
            thumbnail_url: "/static/templates/ats-optimized-thumbnail.png",
        },
        TemplateInfo {
            id: TemplateId::Executive,
            name: "Executive",
            description: "Sophisticated design for senior positions. Emphasizes leadership and achievements.",
            best_for: &[
                "Chief of Staff",
                "Executive/Personal assistants",
                "Project managers",
                "Operations managers",
            ],
            thumbnail_url: "/static/templates/executive-thumbnail.png",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_template() {
        let catalog = catalog();
        assert_eq!(catalog.len(), TemplateId::ALL.len());
        for id in TemplateId::ALL {
            assert!(catalog.iter().any(|t| t.id == id));
        }
    }
}
