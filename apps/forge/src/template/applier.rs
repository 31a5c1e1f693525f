//! Style Applier: turns a styling signature into formatting decisions for a
//! new document. Every `apply_*` operation is best-effort; a style the target
//! document cannot honor degrades to manual formatting instead of an error.

use tracing::debug;

use crate::docx::{Document, PageGeometry, Paragraph, STYLE_LIST_BULLET};
use crate::models::Rgb;
use crate::render::style_provider::{manual_list_indent, StyleProvider, TextRole};

use super::signature::StylingSignature;

pub const DEFAULT_FONT: &str = "Calibri";
pub const DEFAULT_BODY_SIZE: f32 = 11.0;
pub const DEFAULT_HEADING_SIZE: f32 = 14.0;
pub const DEFAULT_NAME_SIZE: f32 = 18.0;

/// Points added to the largest observed size for the name line.
const NAME_SIZE_BOOST: f32 = 4.0;
/// Points removed per heading level below the first.
const HEADING_LEVEL_STEP: f32 = 2.0;
const MIN_HEADING_SIZE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeContext {
    Body,
    Heading,
    Name,
}

#[derive(Debug, Clone)]
pub struct StyleApplier {
    signature: StylingSignature,
}

impl StyleApplier {
    pub fn new(signature: StylingSignature) -> Self {
        StyleApplier { signature }
    }

    pub fn signature(&self) -> &StylingSignature {
        &self.signature
    }

    pub fn dominant_font(&self) -> String {
        self.signature
            .dominant_font()
            .unwrap_or(DEFAULT_FONT)
            .to_string()
    }

    /// Size taken from the ordered set of observed sizes: the smallest for
    /// body text, the largest for headings, and the largest plus four for
    /// the name line.
    pub fn dominant_size(&self, context: SizeContext) -> f32 {
        match context {
            SizeContext::Body => self
                .signature
                .smallest_size()
                .map_or(DEFAULT_BODY_SIZE, |s| s.points()),
            SizeContext::Heading => self
                .signature
                .largest_size()
                .map_or(DEFAULT_HEADING_SIZE, |s| s.points()),
            SizeContext::Name => self
                .signature
                .largest_size()
                .map_or(DEFAULT_NAME_SIZE, |s| s.points() + NAME_SIZE_BOOST),
        }
    }

    /// Most frequent observed size, used for running text.
    pub fn body_size(&self) -> f32 {
        self.signature
            .dominant_size()
            .map_or(DEFAULT_BODY_SIZE, |s| s.points())
    }

    /// The template's heading style for `level`, or the conventional
    /// "Heading N" name when none was recorded.
    pub fn heading_style_name(&self, level: u8) -> String {
        let level = level.max(1);
        self.signature
            .formatting_patterns
            .heading_styles
            .get(usize::from(level - 1))
            .cloned()
            .unwrap_or_else(|| format!("Heading {level}"))
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        let steps = f32::from(level.max(1) - 1);
        (self.dominant_size(SizeContext::Heading) - HEADING_LEVEL_STEP * steps).max(MIN_HEADING_SIZE)
    }

    pub fn apply_heading_style(&self, doc: &Document, paragraph: &mut Paragraph, level: u8) {
        let name = self.heading_style_name(level);
        if doc.has_style(&name) {
            paragraph.style = Some(name);
            return;
        }

        debug!("Heading style '{}' not in document, formatting manually", name);
        let font = self.dominant_font();
        let size = self.heading_size(level);
        for run in &mut paragraph.runs {
            run.font = Some(font.clone());
            run.size = Some(size);
            run.bold = Some(true);
        }
    }

    /// Assigns the template's body style when the document has it and fills
    /// any run that does not set its own font or size.
    pub fn apply_body_style(&self, doc: &Document, paragraph: &mut Paragraph) {
        if paragraph.style.is_none() {
            if let Some(name) = self
                .signature
                .formatting_patterns
                .body_styles
                .iter()
                .find(|name| doc.has_style(name))
            {
                paragraph.style = Some(name.clone());
            }
        }

        let font = self.dominant_font();
        let size = self.body_size();
        for run in &mut paragraph.runs {
            run.font.get_or_insert_with(|| font.clone());
            run.size.get_or_insert(size);
        }
    }

    /// Recorded list style, then the generic bullet style, then a manual
    /// hanging indent.
    pub fn apply_list_style(&self, doc: &Document, paragraph: &mut Paragraph) {
        let recorded = self
            .signature
            .formatting_patterns
            .list_styles
            .iter()
            .find(|name| doc.has_style(name));
        if let Some(name) = recorded {
            paragraph.style = Some(name.clone());
        } else if doc.has_style(STYLE_LIST_BULLET) {
            paragraph.style = Some(STYLE_LIST_BULLET.to_string());
        } else {
            debug!("No bulleted list style available, using manual indent");
            manual_list_indent(paragraph);
        }
    }

    /// Blank document carrying the template's page size and margins.
    pub fn create_document_from_template(&self) -> Document {
        let mut doc = Document::new();
        doc.geometry = self.page_geometry();
        doc
    }
}

impl StyleProvider for StyleApplier {
    fn font_family(&self) -> String {
        self.dominant_font()
    }

    fn font_size(&self, role: TextRole) -> f32 {
        match role {
            TextRole::Name => self.dominant_size(SizeContext::Name),
            TextRole::Section | TextRole::Heading => self.dominant_size(SizeContext::Heading),
            TextRole::Body | TextRole::Link => self.body_size(),
        }
    }

    fn color(&self, _role: TextRole) -> Option<Rgb> {
        None
    }

    fn page_geometry(&self) -> PageGeometry {
        let sections = &self.signature.sections;
        PageGeometry {
            page_width: sections.page_width,
            page_height: sections.page_height,
            margins: sections.margins,
        }
    }

    fn heading_paragraph(&self, doc: &Document, paragraph: &mut Paragraph, level: u8) {
        self.apply_heading_style(doc, paragraph, level);
    }

    fn body_paragraph(&self, doc: &Document, paragraph: &mut Paragraph) {
        self.apply_body_style(doc, paragraph);
    }

    fn list_paragraph(&self, doc: &Document, paragraph: &mut Paragraph) {
        self.apply_list_style(doc, paragraph);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::docx::Run;
    use crate::models::Margins;
    use crate::template::signature::{
        DocumentInfo, FormattingPatterns, PointSize, SectionInfo,
    };

    fn signature(fonts: &[(&str, usize)], sizes: &[(f32, usize)]) -> StylingSignature {
        StylingSignature {
            document_info: DocumentInfo::default(),
            sections: SectionInfo {
                page_width: 8.27,
                page_height: 11.69,
                margins: Margins::uniform(0.7),
            },
            styles: BTreeMap::new(),
            paragraphs: Vec::new(),
            formatting_patterns: FormattingPatterns {
                common_fonts: fonts.iter().map(|(f, n)| (f.to_string(), *n)).collect(),
                common_sizes: sizes
                    .iter()
                    .map(|(s, n)| (PointSize::from_points(*s), *n))
                    .collect(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_dominant_font_tie_is_deterministic() {
        let applier = StyleApplier::new(signature(&[("Calibri", 5), ("Arial", 5)], &[]));
        assert_eq!(applier.dominant_font(), "Arial");
    }

    #[test]
    fn test_dominant_font_falls_back() {
        let applier = StyleApplier::new(signature(&[], &[]));
        assert_eq!(applier.dominant_font(), DEFAULT_FONT);
    }

    #[test]
    fn test_dominant_size_by_context() {
        let applier = StyleApplier::new(signature(&[], &[(10.0, 12), (11.0, 3), (16.0, 1)]));
        assert_eq!(applier.dominant_size(SizeContext::Body), 10.0);
        assert_eq!(applier.dominant_size(SizeContext::Heading), 16.0);
        assert_eq!(applier.dominant_size(SizeContext::Name), 20.0);
        assert_eq!(applier.body_size(), 10.0);
    }

    #[test]
    fn test_dominant_size_defaults_without_data() {
        let applier = StyleApplier::new(signature(&[], &[]));
        assert_eq!(applier.dominant_size(SizeContext::Body), 11.0);
        assert_eq!(applier.dominant_size(SizeContext::Heading), 14.0);
        assert_eq!(applier.dominant_size(SizeContext::Name), 18.0);
    }

    #[test]
    fn test_heading_uses_named_style_when_present() {
        let mut sig = signature(&[], &[]);
        sig.formatting_patterns.heading_styles = vec!["Heading 1".to_string()];
        let applier = StyleApplier::new(sig);
        let doc = Document::new();

        let mut p = Paragraph::new();
        p.push(Run::new("EXPERIENCE"));
        applier.apply_heading_style(&doc, &mut p, 1);

        assert_eq!(p.style.as_deref(), Some("Heading 1"));
        assert_eq!(p.runs[0].bold, None, "named style carries the formatting");
    }

    #[test]
    fn test_heading_falls_back_to_manual_formatting() {
        let applier = StyleApplier::new(signature(&[("Georgia", 3)], &[(10.0, 5), (15.0, 1)]));
        let mut doc = Document::new();
        doc.styles.retain(|s| !s.name.starts_with("Heading"));

        let mut p = Paragraph::new();
        p.push(Run::new("PROJECTS"));
        applier.apply_heading_style(&doc, &mut p, 2);

        assert_eq!(p.style, None);
        let run = &p.runs[0];
        assert_eq!(run.font.as_deref(), Some("Georgia"));
        assert_eq!(run.size, Some(13.0));
        assert_eq!(run.bold, Some(true));
    }

    #[test]
    fn test_heading_size_has_floor() {
        let applier = StyleApplier::new(signature(&[], &[(9.0, 1)]));
        assert_eq!(applier.heading_size(1), 9.0);
        assert_eq!(applier.heading_size(3), MIN_HEADING_SIZE);
    }

    #[test]
    fn test_list_style_preference_order() {
        let mut sig = signature(&[], &[]);
        sig.formatting_patterns.list_styles = vec!["Resume Bullets".to_string()];
        let applier = StyleApplier::new(sig);

        let mut doc = Document::new();
        let mut generic = Paragraph::new();
        applier.apply_list_style(&doc, &mut generic);
        assert_eq!(generic.style.as_deref(), Some("List Bullet"));

        let mut custom = doc.style("List Bullet").cloned().unwrap();
        custom.id = "ResumeBullets".to_string();
        custom.name = "Resume Bullets".to_string();
        doc.styles.push(custom);
        let mut recorded = Paragraph::new();
        applier.apply_list_style(&doc, &mut recorded);
        assert_eq!(recorded.style.as_deref(), Some("Resume Bullets"));

        doc.styles.retain(|s| !s.name.contains("Bullet"));
        let mut manual = Paragraph::new();
        applier.apply_list_style(&doc, &mut manual);
        assert_eq!(manual.style, None);
        assert_eq!(manual.format.left_indent, Some(0.25));
        assert_eq!(manual.format.first_line_indent, Some(-0.25));
    }

    #[test]
    fn test_body_style_fills_unset_runs_only() {
        let mut sig = signature(&[("Garamond", 4)], &[(10.5, 4)]);
        sig.formatting_patterns.body_styles = vec!["Body Text".to_string(), "Normal".to_string()];
        let applier = StyleApplier::new(sig);
        let doc = Document::new();

        let mut p = Paragraph::new();
        p.push(Run::new("plain")).push(Run::new("big").size(20.0));
        applier.apply_body_style(&doc, &mut p);

        assert_eq!(p.style.as_deref(), Some("Normal"));
        assert_eq!(p.runs[0].font.as_deref(), Some("Garamond"));
        assert_eq!(p.runs[0].size, Some(10.5));
        assert_eq!(p.runs[1].size, Some(20.0));
    }

    #[test]
    fn test_document_from_template_geometry() {
        let applier = StyleApplier::new(signature(&[], &[]));
        let doc = applier.create_document_from_template();
        assert_eq!(doc.geometry.page_width, 8.27);
        assert_eq!(doc.geometry.margins, Margins::uniform(0.7));
        assert_eq!(applier.color(TextRole::Link), None);
    }
}
