//! Resume generator: renders content through one of the four HTML
//! templates and stores the artifact, returning a file reference.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use minijinja::{context, Environment};
use tracing::info;

use crate::collaborators::ExecutionError;
use crate::jobs::payload::GenerateInput;
use crate::models::report::FileReference;
use crate::models::resume::{ResumeContent, TemplateId};
use crate::storage::ArtifactStorage;

pub struct Generator {
    env: Environment<'static>,
    storage: Arc<dyn ArtifactStorage>,
}

impl Generator {
    pub fn new(storage: Arc<dyn ArtifactStorage>) -> Self {
        let mut env = Environment::new();
        // Templates ship with the binary; a parse failure is a build defect.
        env.add_template("modern", include_str!("../templates/modern.html"))
            .expect("modern template parses");
        env.add_template("professional", include_str!("../templates/professional.html"))
            .expect("professional template parses");
        env.add_template("ats-optimized", include_str!("../templates/ats-optimized.html"))
            .expect("ats-optimized template parses");
        env.add_template("executive", include_str!("../templates/executive.html"))
            .expect("executive template parses");
        Self { env, storage }
    }

    pub async fn generate(&self, input: &GenerateInput) -> Result<FileReference, ExecutionError> {
        let content: ResumeContent = serde_json::from_value(input.content.clone())
            .map_err(|e| ExecutionError::Permanent(format!("malformed resume content: {e}")))?;

        let html = self.render(input.template, &content)?;
        let file_size = html.len();

        let session_fragment: String = input.resume_improvement_id.chars().take(8).collect();
        let file_name = format!(
            "resume_improved_{}_{}.html",
            input.template, session_fragment
        );
        let key = format!("{}/{}", input.user_id, file_name);

        let file_url = self
            .storage
            .put(&key, Bytes::from(html), "text/html; charset=utf-8")
            .await?;

        info!(template = %input.template, %file_name, file_size, "rendered resume document");

        Ok(FileReference {
            resume_improvement_id: input.resume_improvement_id.clone(),
            template: input.template,
            file_url,
            file_name,
            file_size,
            generated_at: Utc::now(),
        })
    }

    fn render(
        &self,
        template: TemplateId,
        content: &ResumeContent,
    ) -> Result<String, ExecutionError> {
        let tmpl = self
            .env
            .get_template(template.as_str())
            .map_err(|e| ExecutionError::Permanent(format!("unknown template: {e}")))?;
        tmpl.render(context! {
            content => content,
            generated_date => Utc::now().format("%B %Y").to_string(),
        })
        .map_err(|e| ExecutionError::Permanent(format!("template rendering failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::Experience;
    use crate::storage::MemoryArtifactStorage;
    use serde_json::json;

    fn sample_content() -> ResumeContent {
        ResumeContent {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            summary: "Virtual assistant with 5 years of experience.".to_string(),
            experiences: vec![Experience {
                role: "Virtual Assistant".to_string(),
                company: "Tech Corp".to_string(),
                duration: "2020-2023".to_string(),
                responsibilities: vec!["Managed calendars for 5 executives".to_string()],
            }],
            skills: vec!["Asana".to_string(), "Google Workspace".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn all_templates_render_sample_content() {
        let generator = Generator::new(MemoryArtifactStorage::new());
        for template in TemplateId::ALL {
            let html = generator.render(template, &sample_content()).unwrap();
            assert!(html.contains("Jane Doe"), "{template} lost the name");
            assert!(
                html.contains("Managed calendars for 5 executives"),
                "{template} lost the bullets"
            );
            assert!(html.contains("Asana"), "{template} lost the skills");
        }
    }

    #[test]
    fn templates_tolerate_empty_content() {
        let generator = Generator::new(MemoryArtifactStorage::new());
        for template in TemplateId::ALL {
            generator.render(template, &ResumeContent::default()).unwrap();
        }
    }

    #[tokio::test]
    async fn generate_uploads_and_references_the_artifact() {
        let storage = MemoryArtifactStorage::new();
        let generator = Generator::new(storage.clone());
        let input = GenerateInput {
            resume_improvement_id: "improvement-123".to_string(),
            template: TemplateId::Modern,
            content: json!({"name": "Jane Doe"}),
            user_id: "user-1".to_string(),
        };

        let reference = generator.generate(&input).await.unwrap();
        assert_eq!(reference.file_name, "resume_improved_modern_improvem.html");
        assert_eq!(reference.file_url, "memory://user-1/resume_improved_modern_improvem.html");
        assert_eq!(reference.template, TemplateId::Modern);

        let uploads = storage.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let (key, body, content_type) = &uploads[0];
        assert_eq!(key, "user-1/resume_improved_modern_improvem.html");
        assert_eq!(reference.file_size, body.len());
        assert_eq!(content_type, "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn malformed_content_is_permanent() {
        let generator = Generator::new(MemoryArtifactStorage::new());
        let input = GenerateInput {
            resume_improvement_id: "imp-1".to_string(),
            template: TemplateId::Executive,
            content: json!({"experiences": "not a list"}),
            user_id: "user-1".to_string(),
        };
        let err = generator.generate(&input).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
