//! Style Provider: the read-only source of formatting decisions consumed by
//! the builder.
//!
//! Two backends exist: `DocumentStyleConfig` (explicit per-call settings) and
//! `template::StyleApplier` (decisions derived from an analyzed template).
//! A provider is only ever borrowed while rendering, so concurrent builds on
//! separate documents cannot observe each other's formatting.

use crate::docx::{Document, PageGeometry, Paragraph, STYLE_LIST_BULLET};
use crate::models::{DocumentStyleConfig, Rgb};

/// Hanging indent used when no bulleted list style can be assigned.
pub const MANUAL_LIST_INDENT_IN: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextRole {
    /// The person's name at the top of the header.
    Name,
    /// Upper-cased section titles.
    Section,
    Heading,
    Body,
    Link,
}

pub trait StyleProvider: Send + Sync {
    fn font_family(&self) -> String;

    /// Size in points for text playing `role`.
    fn font_size(&self, role: TextRole) -> f32;

    /// Explicit run color, or `None` to inherit from the paragraph style.
    fn color(&self, role: TextRole) -> Option<Rgb>;

    fn page_geometry(&self) -> PageGeometry;

    fn line_spacing(&self) -> Option<f32> {
        None
    }

    /// Points before and after each body paragraph.
    fn paragraph_spacing(&self) -> (Option<f32>, Option<f32>) {
        (None, None)
    }

    /// Points of space above a section title.
    fn section_spacing(&self) -> f32 {
        6.0
    }

    /// Final touch on a heading paragraph whose runs are already in place.
    fn heading_paragraph(&self, _doc: &Document, _paragraph: &mut Paragraph, _level: u8) {}

    fn body_paragraph(&self, _doc: &Document, _paragraph: &mut Paragraph) {}

    /// Marks `paragraph` as a bulleted list item: the bullet style when the
    /// document defines one, otherwise a manual hanging indent.
    fn list_paragraph(&self, doc: &Document, paragraph: &mut Paragraph) {
        if doc.has_style(STYLE_LIST_BULLET) {
            paragraph.style = Some(STYLE_LIST_BULLET.to_string());
        } else {
            manual_list_indent(paragraph);
        }
    }
}

pub fn manual_list_indent(paragraph: &mut Paragraph) {
    paragraph.format.left_indent = Some(MANUAL_LIST_INDENT_IN);
    paragraph.format.first_line_indent = Some(-MANUAL_LIST_INDENT_IN);
}

impl StyleProvider for DocumentStyleConfig {
    fn font_family(&self) -> String {
        self.font_name.clone()
    }

    fn font_size(&self, role: TextRole) -> f32 {
        match role {
            TextRole::Name => self.font_size_name,
            TextRole::Section => self.font_size_section,
            TextRole::Heading => self.font_size_heading,
            TextRole::Body | TextRole::Link => self.font_size_normal,
        }
    }

    fn color(&self, role: TextRole) -> Option<Rgb> {
        Some(match role {
            TextRole::Name | TextRole::Section | TextRole::Heading => self.heading_color,
            TextRole::Body => self.text_color,
            TextRole::Link => self.link_color,
        })
    }

    fn page_geometry(&self) -> PageGeometry {
        PageGeometry {
            margins: self.margins(),
            ..PageGeometry::default()
        }
    }

    fn line_spacing(&self) -> Option<f32> {
        Some(self.line_spacing)
    }

    fn paragraph_spacing(&self) -> (Option<f32>, Option<f32>) {
        (
            Some(self.paragraph_spacing_before),
            Some(self.paragraph_spacing_after),
        )
    }

    fn section_spacing(&self) -> f32 {
        self.section_spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_sizes_by_role() {
        let config = DocumentStyleConfig::default();
        assert_eq!(config.font_size(TextRole::Name), 20.0);
        assert_eq!(config.font_size(TextRole::Section), 12.0);
        assert_eq!(config.font_size(TextRole::Heading), 14.0);
        assert_eq!(config.font_size(TextRole::Body), 11.0);
        assert_eq!(config.color(TextRole::Link), Some(Rgb(0, 0, 139)));
    }

    #[test]
    fn test_config_geometry_uses_margins() {
        let config = DocumentStyleConfig {
            margin_left: 0.75,
            ..Default::default()
        };
        let geometry = config.page_geometry();
        assert_eq!(geometry.margins.left, 0.75);
        assert_eq!(geometry.margins.top, 0.5);
        assert_eq!(geometry.page_width, 8.5);
    }

    #[test]
    fn test_list_paragraph_falls_back_to_manual_indent() {
        let config = DocumentStyleConfig::default();
        let mut doc = Document::new();

        let mut styled = Paragraph::new();
        config.list_paragraph(&doc, &mut styled);
        assert_eq!(styled.style.as_deref(), Some("List Bullet"));

        doc.styles.retain(|s| s.name != "List Bullet");
        let mut manual = Paragraph::new();
        config.list_paragraph(&doc, &mut manual);
        assert_eq!(manual.style, None);
        assert_eq!(manual.format.first_line_indent, Some(-0.25));
    }
}
