use std::fmt::Write as _;
use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{
    inches_to_twips, Document, DocxError, FontSpec, Paragraph, ParagraphFormat, Run, StyleDef,
    BULLET_NUM_ID,
};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Relationship ids 1 and 2 are taken by styles and numbering.
const FIRST_LINK_REL: usize = 3;

/// Serializes `doc` into a `.docx` package.
pub fn write(doc: &Document) -> Result<Vec<u8>, DocxError> {
    let links = collect_links(doc);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, String); 7] = [
        ("[Content_Types].xml", content_types_xml()),
        ("_rels/.rels", package_rels_xml()),
        ("docProps/core.xml", core_xml(doc)),
        ("word/document.xml", document_xml(doc, &links)),
        ("word/_rels/document.xml.rels", document_rels_xml(&links)),
        ("word/styles.xml", styles_xml(doc)),
        ("word/numbering.xml", numbering_xml()),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Distinct hyperlink targets in first-use order. Index `i` maps to `rId{i + 3}`.
fn collect_links(doc: &Document) -> Vec<&str> {
    let mut links: Vec<&str> = Vec::new();
    for url in doc
        .paragraphs
        .iter()
        .flat_map(|p| p.runs.iter())
        .filter_map(|r| r.link.as_deref())
    {
        if !links.contains(&url) {
            links.push(url);
        }
    }
    links
}

fn link_rel_id(links: &[&str], url: &str) -> Option<String> {
    links
        .iter()
        .position(|l| *l == url)
        .map(|i| format!("rId{}", i + FIRST_LINK_REL))
}

// ────────────────────────────────────────────────────────────────────────────
// Package scaffolding
// ────────────────────────────────────────────────────────────────────────────

fn content_types_xml() -> String {
    format!(
        "{XML_DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
<Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
<Override PartName=\"/word/numbering.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml\"/>\
<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
</Types>"
    )
}

fn package_rels_xml() -> String {
    format!(
        "{XML_DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>\
</Relationships>"
    )
}

fn document_rels_xml(links: &[&str]) -> String {
    let mut xml = format!(
        "{XML_DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\
<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering\" Target=\"numbering.xml\"/>"
    );
    for (i, url) in links.iter().enumerate() {
        let _ = write!(
            xml,
            "<Relationship Id=\"rId{}\" Type=\"{REL_HYPERLINK}\" Target=\"{}\" TargetMode=\"External\"/>",
            i + FIRST_LINK_REL,
            escape(*url)
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn core_xml(doc: &Document) -> String {
    let mut xml = format!(
        "{XML_DECL}<cp:coreProperties \
xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
xmlns:dcterms=\"http://purl.org/dc/terms/\" \
xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">"
    );
    if let Some(title) = &doc.properties.title {
        let _ = write!(xml, "<dc:title>{}</dc:title>", escape(title.as_str()));
    }
    if let Some(author) = &doc.properties.author {
        let _ = write!(xml, "<dc:creator>{}</dc:creator>", escape(author.as_str()));
    }
    xml.push_str("</cp:coreProperties>");
    xml
}

fn numbering_xml() -> String {
    format!(
        "{XML_DECL}<w:numbering xmlns:w=\"{NS_W}\">\
<w:abstractNum w:abstractNumId=\"0\"><w:multiLevelType w:val=\"singleLevel\"/>\
<w:lvl w:ilvl=\"0\"><w:start w:val=\"1\"/><w:numFmt w:val=\"bullet\"/><w:lvlText w:val=\"\u{2022}\"/>\
<w:lvlJc w:val=\"left\"/><w:pPr><w:ind w:left=\"360\" w:hanging=\"360\"/></w:pPr></w:lvl>\
</w:abstractNum>\
<w:num w:numId=\"{BULLET_NUM_ID}\"><w:abstractNumId w:val=\"0\"/></w:num>\
</w:numbering>"
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Styles
// ────────────────────────────────────────────────────────────────────────────

fn styles_xml(doc: &Document) -> String {
    let mut xml = format!("{XML_DECL}<w:styles xmlns:w=\"{NS_W}\">");
    for style in &doc.styles {
        push_style(&mut xml, style);
    }
    xml.push_str("</w:styles>");
    xml
}

fn push_style(xml: &mut String, style: &StyleDef) {
    let _ = write!(
        xml,
        "<w:style w:type=\"{}\" w:styleId=\"{}\"",
        style.kind.as_ooxml(),
        escape(style.id.as_str())
    );
    if style.is_default {
        xml.push_str(" w:default=\"1\"");
    }
    if !style.builtin {
        xml.push_str(" w:customStyle=\"1\"");
    }
    let _ = write!(xml, "><w:name w:val=\"{}\"/>", escape(style.name.as_str()));
    if let Some(based_on) = &style.based_on {
        let _ = write!(xml, "<w:basedOn w:val=\"{}\"/>", escape(based_on.as_str()));
    }

    let mut ppr = String::new();
    if let Some(num_id) = style.num_id {
        let _ = write!(ppr, "<w:numPr><w:numId w:val=\"{num_id}\"/></w:numPr>");
    }
    ppr.push_str(&paragraph_format_xml(&style.paragraph));
    if let Some(alignment) = style.alignment {
        let _ = write!(ppr, "<w:jc w:val=\"{}\"/>", alignment.as_ooxml());
    }
    if !ppr.is_empty() {
        let _ = write!(xml, "<w:pPr>{ppr}</w:pPr>");
    }

    let rpr = font_spec_xml(&style.font);
    if !rpr.is_empty() {
        let _ = write!(xml, "<w:rPr>{rpr}</w:rPr>");
    }
    xml.push_str("</w:style>");
}

fn font_spec_xml(font: &FontSpec) -> String {
    character_xml(
        font.name.as_deref(),
        font.size,
        font.bold,
        font.italic,
        font.underline,
        font.color.map(|c| c.to_hex()),
    )
}

/// Character property children shared by styles and runs, in schema order.
fn character_xml(
    font: Option<&str>,
    size: Option<f32>,
    bold: Option<bool>,
    italic: Option<bool>,
    underline: Option<bool>,
    color: Option<String>,
) -> String {
    let mut xml = String::new();
    if let Some(font) = font {
        let font = escape(font);
        let _ = write!(
            xml,
            "<w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\" w:cs=\"{font}\"/>"
        );
    }
    if let Some(bold) = bold {
        xml.push_str(if bold { "<w:b/>" } else { "<w:b w:val=\"0\"/>" });
    }
    if let Some(italic) = italic {
        xml.push_str(if italic { "<w:i/>" } else { "<w:i w:val=\"0\"/>" });
    }
    if let Some(color) = color {
        let _ = write!(xml, "<w:color w:val=\"{color}\"/>");
    }
    if let Some(size) = size {
        let _ = write!(xml, "<w:sz w:val=\"{}\"/>", half_points(size));
    }
    if let Some(underline) = underline {
        let val = if underline { "single" } else { "none" };
        let _ = write!(xml, "<w:u w:val=\"{val}\"/>");
    }
    xml
}

fn half_points(points: f32) -> u32 {
    (points * 2.0).round().max(1.0) as u32
}

fn twentieths(points: f32) -> i64 {
    (points * 20.0).round() as i64
}

/// Paragraph property children except style, numbering, and alignment.
fn paragraph_format_xml(format: &ParagraphFormat) -> String {
    let mut xml = String::new();
    if format.bottom_border {
        xml.push_str(
            "<w:pBdr><w:bottom w:val=\"single\" w:sz=\"6\" w:space=\"1\" w:color=\"auto\"/></w:pBdr>",
        );
    }
    if !format.right_tabs.is_empty() {
        xml.push_str("<w:tabs>");
        for pos in &format.right_tabs {
            let _ = write!(
                xml,
                "<w:tab w:val=\"right\" w:pos=\"{}\"/>",
                inches_to_twips(*pos)
            );
        }
        xml.push_str("</w:tabs>");
    }
    if format.space_before.is_some() || format.space_after.is_some() || format.line_spacing.is_some()
    {
        xml.push_str("<w:spacing");
        if let Some(before) = format.space_before {
            let _ = write!(xml, " w:before=\"{}\"", twentieths(before));
        }
        if let Some(after) = format.space_after {
            let _ = write!(xml, " w:after=\"{}\"", twentieths(after));
        }
        if let Some(line) = format.line_spacing {
            let _ = write!(
                xml,
                " w:line=\"{}\" w:lineRule=\"auto\"",
                (line * 240.0).round() as i64
            );
        }
        xml.push_str("/>");
    }
    if format.left_indent.is_some() || format.first_line_indent.is_some() {
        xml.push_str("<w:ind");
        if let Some(left) = format.left_indent {
            let _ = write!(xml, " w:left=\"{}\"", inches_to_twips(left));
        }
        match format.first_line_indent {
            Some(first) if first < 0.0 => {
                let _ = write!(xml, " w:hanging=\"{}\"", inches_to_twips(-first));
            }
            Some(first) => {
                let _ = write!(xml, " w:firstLine=\"{}\"", inches_to_twips(first));
            }
            None => {}
        }
        xml.push_str("/>");
    }
    xml
}

// ────────────────────────────────────────────────────────────────────────────
// Body
// ────────────────────────────────────────────────────────────────────────────

fn document_xml(doc: &Document, links: &[&str]) -> String {
    let mut xml = format!(
        "{XML_DECL}<w:document xmlns:w=\"{NS_W}\" xmlns:r=\"{NS_R}\"><w:body>"
    );
    for paragraph in &doc.paragraphs {
        push_paragraph(&mut xml, doc, paragraph, links);
    }

    let g = &doc.geometry;
    let _ = write!(
        xml,
        "<w:sectPr><w:pgSz w:w=\"{}\" w:h=\"{}\"/>\
<w:pgMar w:top=\"{}\" w:right=\"{}\" w:bottom=\"{}\" w:left=\"{}\" w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/>\
</w:sectPr></w:body></w:document>",
        inches_to_twips(g.page_width),
        inches_to_twips(g.page_height),
        inches_to_twips(g.margins.top),
        inches_to_twips(g.margins.right),
        inches_to_twips(g.margins.bottom),
        inches_to_twips(g.margins.left),
    );
    xml
}

fn push_paragraph(xml: &mut String, doc: &Document, paragraph: &Paragraph, links: &[&str]) {
    let mut ppr = String::new();
    if let Some(name) = &paragraph.style {
        let id = doc
            .style(name)
            .map(|s| s.id.clone())
            .unwrap_or_else(|| name.replace(' ', ""));
        let _ = write!(ppr, "<w:pStyle w:val=\"{}\"/>", escape(id.as_str()));
    }
    ppr.push_str(&paragraph_format_xml(&paragraph.format));
    if let Some(alignment) = paragraph.alignment {
        let _ = write!(ppr, "<w:jc w:val=\"{}\"/>", alignment.as_ooxml());
    }

    xml.push_str("<w:p>");
    if !ppr.is_empty() {
        let _ = write!(xml, "<w:pPr>{ppr}</w:pPr>");
    }
    for run in &paragraph.runs {
        match run.link.as_deref().and_then(|url| link_rel_id(links, url)) {
            Some(rel_id) => {
                let _ = write!(xml, "<w:hyperlink r:id=\"{rel_id}\">");
                push_run(xml, run);
                xml.push_str("</w:hyperlink>");
            }
            None => push_run(xml, run),
        }
    }
    xml.push_str("</w:p>");
}

fn push_run(xml: &mut String, run: &Run) {
    xml.push_str("<w:r>");
    let mut rpr = String::new();
    if run.link.is_some() {
        rpr.push_str("<w:rStyle w:val=\"Hyperlink\"/>");
    }
    rpr.push_str(&character_xml(
        run.font.as_deref(),
        run.size,
        run.bold,
        run.italic,
        run.underline,
        run.color.map(|c| c.to_hex()),
    ));
    if !rpr.is_empty() {
        let _ = write!(xml, "<w:rPr>{rpr}</w:rPr>");
    }

    let mut segment = String::new();
    let flush = |xml: &mut String, segment: &mut String| {
        if !segment.is_empty() {
            let _ = write!(
                xml,
                "<w:t xml:space=\"preserve\">{}</w:t>",
                escape(segment.as_str())
            );
            segment.clear();
        }
    };
    for ch in run.text.chars() {
        match ch {
            '\t' => {
                flush(xml, &mut segment);
                xml.push_str("<w:tab/>");
            }
            '\n' => {
                flush(xml, &mut segment);
                xml.push_str("<w:br/>");
            }
            _ => segment.push(ch),
        }
    }
    flush(xml, &mut segment);
    xml.push_str("</w:r>");
}
