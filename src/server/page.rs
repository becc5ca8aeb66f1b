//! The upload form served on `GET /`

use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::core::record::Field;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const INDEX: &str = "index.html";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),
}

#[derive(Serialize)]
struct FieldEntry {
    column: &'static str,
    token: String,
}

/// Render the upload form once; the result is served unchanged
pub fn render_index(max_upload_mb: u64) -> Result<String, PageError> {
    let mut tera = Tera::default();
    for file in EmbeddedTemplates::iter() {
        let filename = file.as_ref();
        if let Some(content) = EmbeddedTemplates::get(filename) {
            if let Ok(template_str) = std::str::from_utf8(&content.data) {
                tera.add_raw_template(filename, template_str)
                    .map_err(|e| PageError::RenderError(e.to_string()))?;
            }
        }
    }
    if !tera.get_template_names().any(|n| n == INDEX) {
        return Err(PageError::NotFound(INDEX.to_string()));
    }

    let fields: Vec<FieldEntry> = Field::ALL
        .iter()
        .map(|f| FieldEntry {
            column: f.column(),
            token: f.token(),
        })
        .collect();

    let mut context = tera::Context::new();
    context.insert("fields", &fields);
    context.insert("max_upload_mb", &max_upload_mb);
    context.insert("version", env!("CARGO_PKG_VERSION"));

    tera.render(INDEX, &context)
        .map_err(|e| PageError::RenderError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_lists_tokens() {
        let html = render_index(16).unwrap();
        assert!(html.contains(r#"name="excel""#));
        assert!(html.contains(r#"name="word""#));
        assert!(html.contains("multipart/form-data"));
        // tera escapes the angle brackets of tokens
        assert!(html.contains("&lt;Equipment name&gt;"));
        assert!(html.contains("&lt;HUM&gt;"));
        assert!(html.contains("Uploads up to 16 MB"));
    }
}
