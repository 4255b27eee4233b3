//! Enhanced document rendering
//!
//! Produces the downloadable enhanced document from the rewritten text. The
//! plain-text renderer is the only built-in format; the trait is the seam
//! for richer formats.

use pitchforge_common::errors::{AppError, Result};

/// Renders enhanced resume text into downloadable bytes
pub trait DocumentRenderer: Send + Sync {
    /// Render the document body
    fn render(&self, original_filename: &str, enhanced_text: &str) -> Result<Vec<u8>>;

    /// File extension for the rendered output
    fn extension(&self) -> &'static str;
}

/// Plain-text renderer
#[derive(Default)]
pub struct TextRenderer;

impl DocumentRenderer for TextRenderer {
    fn render(&self, original_filename: &str, enhanced_text: &str) -> Result<Vec<u8>> {
        if enhanced_text.trim().is_empty() {
            return Err(AppError::EnhancementFailed {
                message: "enhanced text is empty, nothing to render".to_string(),
            });
        }

        let mut out = String::new();
        out.push_str(&format!(
            "Enhanced resume (source: {})\n\n",
            original_filename
        ));
        out.push_str(enhanced_text.trim());
        out.push('\n');

        Ok(out.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_source_and_body() {
        let bytes = TextRenderer
            .render("resume.pdf", "Led the platform team.")
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("source: resume.pdf"));
        assert!(text.contains("Led the platform team."));
    }

    #[test]
    fn test_empty_text_is_an_error() {
        let err = TextRenderer.render("resume.pdf", "   ").unwrap_err();
        assert!(matches!(err, AppError::EnhancementFailed { .. }));
    }
}
