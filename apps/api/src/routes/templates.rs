use axum::Json;
use serde::Serialize;

use crate::services::templates::{catalog, TemplateInfo};

#[derive(Debug, Serialize)]
pub struct TemplatesResponse {
    pub templates: Vec<TemplateInfo>,
}

/// GET /api/v1/templates
/// Lists the available render templates with descriptions.
pub async fn handle_list_templates() -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        templates: catalog(),
    })
}
