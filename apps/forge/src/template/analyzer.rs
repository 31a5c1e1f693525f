//! Template Analyzer: reads a finished document and records how it is
//! styled, without touching the source file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::info;

use crate::docx::{self, Document, Paragraph, StyleDef, StyleKind};
use crate::errors::AppError;

use super::signature::{
    CorePropertiesInfo, DocumentInfo, FontInfo, FormattingPatterns, ParagraphFormatInfo,
    ParagraphSample, PointSize, RunSample, SectionInfo, StyleInfo, StylingSignature,
};

/// Non-empty paragraphs kept as samples.
pub const SAMPLE_PARAGRAPHS: usize = 20;
pub const SAMPLE_RUNS: usize = 3;
/// Paragraphs scanned for the frequency tables.
pub const PATTERN_PARAGRAPHS: usize = 50;

const PARAGRAPH_PREVIEW_CHARS: usize = 50;
const RUN_PREVIEW_CHARS: usize = 20;

pub fn analyze(path: &Path) -> Result<StylingSignature, AppError> {
    let doc = docx::read_path(path)?;
    let signature = analyze_document(&doc);
    info!(
        "Analyzed template {} ({} paragraphs, {} styles)",
        path.display(),
        signature.document_info.total_paragraphs,
        signature.styles.len()
    );
    Ok(signature)
}

pub fn analyze_document(doc: &Document) -> StylingSignature {
    StylingSignature {
        document_info: DocumentInfo {
            total_paragraphs: doc.paragraphs.len(),
            total_tables: doc.table_count,
            core_properties: CorePropertiesInfo {
                title: doc.properties.title.clone().unwrap_or_default(),
                author: doc.properties.author.clone().unwrap_or_default(),
            },
        },
        sections: SectionInfo {
            page_width: doc.geometry.page_width,
            page_height: doc.geometry.page_height,
            margins: doc.geometry.margins,
        },
        styles: doc
            .styles
            .iter()
            .map(|style| (style.name.clone(), style_info(style)))
            .collect(),
        paragraphs: sample_paragraphs(doc),
        formatting_patterns: formatting_patterns(doc),
    }
}

pub fn save_analysis(signature: &StylingSignature, path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(signature)?)?;
    info!("Template analysis saved to {}", path.display());
    Ok(())
}

pub fn load_signature(path: &Path) -> Result<StylingSignature, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn style_info(style: &StyleDef) -> StyleInfo {
    let font = (style.kind != StyleKind::Numbering).then(|| FontInfo {
        name: style.font.name.clone(),
        size: style.font.size,
        bold: style.font.bold,
        italic: style.font.italic,
        color: style.font.color,
    });
    let paragraph_format = matches!(style.kind, StyleKind::Paragraph | StyleKind::Table).then(|| {
        ParagraphFormatInfo {
            alignment: style.alignment,
            left_indent: style.paragraph.left_indent,
            first_line_indent: style.paragraph.first_line_indent,
            space_before: style.paragraph.space_before,
            space_after: style.paragraph.space_after,
            line_spacing: style.paragraph.line_spacing,
        }
    });

    StyleInfo {
        name: style.name.clone(),
        kind: style.kind,
        builtin: style.builtin,
        font,
        paragraph_format,
    }
}

fn preview(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn sample_paragraphs(doc: &Document) -> Vec<ParagraphSample> {
    doc.paragraphs
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_blank())
        .take(SAMPLE_PARAGRAPHS)
        .map(|(index, paragraph)| ParagraphSample {
            index,
            text_preview: preview(&paragraph.text(), PARAGRAPH_PREVIEW_CHARS),
            style_name: doc.paragraph_style_name(paragraph).to_string(),
            alignment: paragraph.alignment,
            runs: paragraph
                .runs
                .iter()
                .take(SAMPLE_RUNS)
                .map(|run| RunSample {
                    text: preview(&run.text, RUN_PREVIEW_CHARS),
                    font_name: run.font.clone(),
                    font_size: run.size,
                    bold: run.bold,
                    italic: run.italic,
                })
                .collect(),
        })
        .collect()
}

enum StyleClass {
    Heading,
    List,
    Body,
}

fn classify(style_name: &str) -> StyleClass {
    let lowered = style_name.to_lowercase();
    if lowered.contains("heading") {
        StyleClass::Heading
    } else if lowered.contains("list") {
        StyleClass::List
    } else {
        StyleClass::Body
    }
}

fn formatting_patterns(doc: &Document) -> FormattingPatterns {
    let mut heading = BTreeSet::new();
    let mut list = BTreeSet::new();
    let mut body = BTreeSet::new();
    let mut common_fonts: BTreeMap<String, usize> = BTreeMap::new();
    let mut common_sizes: BTreeMap<PointSize, usize> = BTreeMap::new();

    for paragraph in doc.paragraphs.iter().take(PATTERN_PARAGRAPHS) {
        let name = doc.paragraph_style_name(paragraph);
        match classify(name) {
            StyleClass::Heading => heading.insert(name.to_string()),
            StyleClass::List => list.insert(name.to_string()),
            StyleClass::Body => body.insert(name.to_string()),
        };
        tally_runs(paragraph, &mut common_fonts, &mut common_sizes);
    }

    FormattingPatterns {
        heading_styles: heading.into_iter().collect(),
        body_styles: body.into_iter().collect(),
        list_styles: list.into_iter().collect(),
        common_fonts,
        common_sizes,
    }
}

fn tally_runs(
    paragraph: &Paragraph,
    fonts: &mut BTreeMap<String, usize>,
    sizes: &mut BTreeMap<PointSize, usize>,
) {
    for run in &paragraph.runs {
        if let Some(font) = run.font.as_deref().filter(|f| !f.is_empty()) {
            *fonts.entry(font.to_string()).or_default() += 1;
        }
        if let Some(size) = run.size.filter(|s| *s > 0.0) {
            *sizes.entry(PointSize::from_points(size)).or_default() += 1;
        }
    }
}
