//! Minimal word-processor document model with an OOXML (`.docx`) writer and reader.
//!
//! The model only covers what resume generation and template analysis need:
//! top-level paragraphs made of formatted runs, a named style inventory, the
//! first section's page geometry, and core properties. Tables are counted on
//! read but never produced.

pub mod reader;
pub mod writer;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Margins, Rgb};

pub use reader::{read, read_path};
pub use writer::write;

pub const TWIPS_PER_INCH: f32 = 1440.0;

pub const STYLE_NORMAL: &str = "Normal";
pub const STYLE_TITLE: &str = "Title";
pub const STYLE_LIST_BULLET: &str = "List Bullet";
pub const STYLE_HYPERLINK: &str = "Hyperlink";

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("package is missing required part {0}")]
    MissingPart(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Page geometry
// ────────────────────────────────────────────────────────────────────────────

/// Page size and margins of a section, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margins: Margins,
}

impl Default for PageGeometry {
    /// US letter with 1" margins.
    fn default() -> Self {
        PageGeometry {
            page_width: 8.5,
            page_height: 11.0,
            margins: Margins::uniform(1.0),
        }
    }
}

impl PageGeometry {
    /// Usable text width between the left and right margins.
    pub fn content_width(&self) -> f32 {
        (self.page_width - self.margins.left - self.margins.right).max(0.0)
    }
}

pub fn inches_to_twips(inches: f32) -> i64 {
    (inches * TWIPS_PER_INCH).round() as i64
}

pub fn twips_to_inches(twips: i64) -> f32 {
    twips as f32 / TWIPS_PER_INCH
}

// ────────────────────────────────────────────────────────────────────────────
// Paragraphs and runs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_ooxml(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }

    pub fn from_ooxml(value: &str) -> Option<Self> {
        match value {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" | "distribute" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

/// Paragraph-level formatting. Lengths in inches, spacing in points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphFormat {
    pub left_indent: Option<f32>,
    /// Negative values produce a hanging indent.
    pub first_line_indent: Option<f32>,
    pub space_before: Option<f32>,
    pub space_after: Option<f32>,
    /// Multiple of single spacing.
    pub line_spacing: Option<f32>,
    /// Right-aligned tab stop positions, measured from the left margin.
    pub right_tabs: Vec<f32>,
    /// Draws a full-width rule under the paragraph.
    pub bottom_border: bool,
}

/// A run of text sharing one set of character properties.
///
/// Unset (`None`) properties inherit from the paragraph style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub font: Option<String>,
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<Rgb>,
    /// Target URL when the run is the visible label of a hyperlink.
    pub link: Option<String>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn font(mut self, name: impl Into<String>) -> Self {
        self.font = Some(name.into());
        self
    }

    pub fn size(mut self, points: f32) -> Self {
        self.size = Some(points);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = Some(true);
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = Some(true);
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    /// Style *name* (e.g. "List Bullet"), not the OOXML style id.
    pub style: Option<String>,
    pub alignment: Option<Alignment>,
    pub format: ParagraphFormat,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn push(&mut self, run: Run) -> &mut Self {
        self.runs.push(run);
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Styles
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleKind {
    pub fn as_ooxml(self) -> &'static str {
        match self {
            StyleKind::Paragraph => "paragraph",
            StyleKind::Character => "character",
            StyleKind::Table => "table",
            StyleKind::Numbering => "numbering",
        }
    }

    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "character" => StyleKind::Character,
            "table" => StyleKind::Table,
            "numbering" => StyleKind::Numbering,
            _ => StyleKind::Paragraph,
        }
    }
}

/// Character properties attached to a style definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontSpec {
    pub name: Option<String>,
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleDef {
    pub id: String,
    pub name: String,
    pub kind: StyleKind,
    /// True for styles that ship with the word processor rather than the author.
    pub builtin: bool,
    pub is_default: bool,
    pub based_on: Option<String>,
    pub font: FontSpec,
    pub alignment: Option<Alignment>,
    pub paragraph: ParagraphFormat,
    /// Numbering instance backing list styles.
    pub num_id: Option<u32>,
}

impl StyleDef {
    fn builtin(id: &str, name: &str, kind: StyleKind) -> Self {
        StyleDef {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            builtin: true,
            is_default: false,
            based_on: None,
            font: FontSpec::default(),
            alignment: None,
            paragraph: ParagraphFormat::default(),
            num_id: None,
        }
    }
}

/// Numbering instance id reserved for the bullet list style.
pub const BULLET_NUM_ID: u32 = 1;

fn default_styles() -> Vec<StyleDef> {
    let mut normal = StyleDef::builtin("Normal", STYLE_NORMAL, StyleKind::Paragraph);
    normal.is_default = true;
    normal.font.name = Some("Calibri".to_string());
    normal.font.size = Some(11.0);

    let mut title = StyleDef::builtin("Title", STYLE_TITLE, StyleKind::Paragraph);
    title.based_on = Some("Normal".to_string());
    title.font.size = Some(28.0);

    let headings = [(1u8, 16.0f32), (2, 13.0), (3, 12.0)].map(|(level, size)| {
        let mut heading = StyleDef::builtin(
            &format!("Heading{level}"),
            &format!("Heading {level}"),
            StyleKind::Paragraph,
        );
        heading.based_on = Some("Normal".to_string());
        heading.font.size = Some(size);
        heading.font.bold = Some(true);
        heading.paragraph.space_before = Some(if level == 1 { 12.0 } else { 6.0 });
        heading
    });

    let mut list_bullet = StyleDef::builtin("ListBullet", STYLE_LIST_BULLET, StyleKind::Paragraph);
    list_bullet.based_on = Some("Normal".to_string());
    list_bullet.num_id = Some(BULLET_NUM_ID);
    list_bullet.paragraph.left_indent = Some(0.25);
    list_bullet.paragraph.first_line_indent = Some(-0.25);

    let mut hyperlink = StyleDef::builtin("Hyperlink", STYLE_HYPERLINK, StyleKind::Character);
    hyperlink.font.underline = Some(true);
    hyperlink.font.color = Some(Rgb(0x05, 0x63, 0xC1));

    let mut styles = vec![normal, title];
    styles.extend(headings);
    styles.push(list_bullet);
    styles.push(hyperlink);
    styles
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub properties: CoreProperties,
    pub geometry: PageGeometry,
    pub styles: Vec<StyleDef>,
    pub paragraphs: Vec<Paragraph>,
    pub table_count: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document on US letter with the built-in style set.
    pub fn new() -> Self {
        Document {
            properties: CoreProperties::default(),
            geometry: PageGeometry::default(),
            styles: default_styles(),
            paragraphs: Vec::new(),
            table_count: 0,
        }
    }

    pub fn open(path: &Path) -> Result<Self, DocxError> {
        read_path(path)
    }

    /// Capability query: whether a style with this name is defined.
    pub fn has_style(&self, name: &str) -> bool {
        self.style(name).is_some()
    }

    pub fn style(&self, name: &str) -> Option<&StyleDef> {
        self.styles.iter().find(|s| s.name == name)
    }

    pub fn style_by_id(&self, id: &str) -> Option<&StyleDef> {
        self.styles.iter().find(|s| s.id == id)
    }

    /// Name of the default paragraph style, "Normal" if none is flagged.
    pub fn default_paragraph_style(&self) -> &str {
        self.styles
            .iter()
            .find(|s| s.is_default && s.kind == StyleKind::Paragraph)
            .map(|s| s.name.as_str())
            .unwrap_or(STYLE_NORMAL)
    }

    /// Effective style name of a paragraph, resolving unset to the default style.
    pub fn paragraph_style_name<'a>(&'a self, paragraph: &'a Paragraph) -> &'a str {
        paragraph
            .style
            .as_deref()
            .unwrap_or_else(|| self.default_paragraph_style())
    }

    pub fn add_paragraph(&mut self, paragraph: Paragraph) -> &mut Paragraph {
        self.paragraphs.push(paragraph);
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    pub fn add_blank_paragraph(&mut self) {
        self.paragraphs.push(Paragraph::new());
    }

    /// Plain text of every paragraph, one per line.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        write(self)
    }

    /// Writes the package to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), DocxError> {
        let bytes = write(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
