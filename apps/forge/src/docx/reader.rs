use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::{
    twips_to_inches, Alignment, CoreProperties, Document, DocxError, FontSpec, PageGeometry,
    Paragraph, ParagraphFormat, Run, StyleDef, StyleKind,
};
use crate::models::{Margins, Rgb};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CORE_PART: &str = "docProps/core.xml";

pub fn read_path(path: &Path) -> Result<Document, DocxError> {
    let bytes = std::fs::read(path)?;
    read(&bytes)
}

/// Parses a `.docx` package. Only top-level body paragraphs are kept; tables
/// are counted. Geometry comes from the first section in document order.
pub fn read(bytes: &[u8]) -> Result<Document, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let document_xml = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;
    let styles = match read_part(&mut archive, STYLES_PART)? {
        Some(xml) => parse_styles(&xml)?,
        None => Vec::new(),
    };
    let links = match read_part(&mut archive, RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };
    let properties = match read_part(&mut archive, CORE_PART)? {
        Some(xml) => parse_core(&xml)?,
        None => CoreProperties::default(),
    };

    let body = parse_body(&document_xml, &styles, &links)?;

    Ok(Document {
        properties,
        geometry: body.geometry.unwrap_or_default(),
        styles,
        paragraphs: body.paragraphs,
        table_count: body.table_count,
    })
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, DocxError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut xml = String::new();
            file.read_to_string(&mut xml)?;
            Ok(Some(xml))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// XML helpers
// ────────────────────────────────────────────────────────────────────────────

fn xml_error(part: &str, err: impl std::fmt::Display) -> DocxError {
    DocxError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| {
            let raw = std::str::from_utf8(&a.value).ok()?;
            quick_xml::escape::unescape(raw)
                .ok()
                .map(Cow::into_owned)
        })
}

fn attr_f32(e: &BytesStart, key: &[u8]) -> Option<f32> {
    attr(e, key).and_then(|v| v.trim().parse::<f32>().ok())
}

/// OOXML on/off property: present without `w:val`, or with a truthy value.
fn toggle(e: &BytesStart) -> bool {
    !matches!(
        attr(e, b"w:val").as_deref(),
        Some("0") | Some("false") | Some("off") | Some("none")
    )
}

fn resolve_entity(e: &BytesRef) -> Option<String> {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        return Some(ch.to_string());
    }
    let name = e.decode().ok()?;
    quick_xml::escape::resolve_predefined_entity(&name).map(str::to_string)
}

/// Word stores built-in style names in lower case ("heading 1") and shows
/// them title-cased; custom names are kept verbatim.
fn ui_style_name(raw: &str, builtin: bool) -> String {
    if !builtin || raw.chars().any(|c| c.is_uppercase()) {
        return raw.to_string();
    }
    raw.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Character property element inside `w:rPr`.
fn apply_character_property(font: &mut FontSpec, e: &BytesStart) {
    match e.name().as_ref() {
        b"w:rFonts" => {
            if let Some(name) = attr(e, b"w:ascii").or_else(|| attr(e, b"w:hAnsi")) {
                font.name = Some(name);
            }
        }
        b"w:sz" => {
            if let Some(half) = attr_f32(e, b"w:val") {
                font.size = Some(half / 2.0);
            }
        }
        b"w:b" => font.bold = Some(toggle(e)),
        b"w:i" => font.italic = Some(toggle(e)),
        b"w:u" => font.underline = Some(toggle(e)),
        b"w:color" => {
            font.color = attr(e, b"w:val").and_then(|v| v.parse::<Rgb>().ok());
        }
        _ => {}
    }
}

/// Paragraph property element inside `w:pPr`. Tab stops are handled by the caller.
fn apply_paragraph_property(format: &mut ParagraphFormat, e: &BytesStart) {
    match e.name().as_ref() {
        b"w:spacing" => {
            if let Some(before) = attr_f32(e, b"w:before") {
                format.space_before = Some(before / 20.0);
            }
            if let Some(after) = attr_f32(e, b"w:after") {
                format.space_after = Some(after / 20.0);
            }
            let auto = matches!(attr(e, b"w:lineRule").as_deref(), None | Some("auto"));
            if let (true, Some(line)) = (auto, attr_f32(e, b"w:line")) {
                format.line_spacing = Some(line / 240.0);
            }
        }
        b"w:ind" => {
            if let Some(left) = attr_f32(e, b"w:left").or_else(|| attr_f32(e, b"w:start")) {
                format.left_indent = Some(left / 1440.0);
            }
            if let Some(hanging) = attr_f32(e, b"w:hanging") {
                format.first_line_indent = Some(-hanging / 1440.0);
            } else if let Some(first) = attr_f32(e, b"w:firstLine") {
                format.first_line_indent = Some(first / 1440.0);
            }
        }
        _ => {}
    }
}

fn twips_attr(e: &BytesStart, key: &[u8]) -> Option<f32> {
    attr(e, key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(twips_to_inches)
}

// ────────────────────────────────────────────────────────────────────────────
// styles.xml
// ────────────────────────────────────────────────────────────────────────────

fn parse_styles(xml: &str) -> Result<Vec<StyleDef>, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut styles = Vec::new();
    let mut current: Option<StyleDef> = None;
    let mut in_rpr = false;
    let mut in_ppr = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(STYLES_PART, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"w:style" => {
                        let builtin = attr(e, b"w:customStyle").as_deref() != Some("1");
                        let id = attr(e, b"w:styleId").unwrap_or_default();
                        current = Some(StyleDef {
                            name: id.clone(),
                            id,
                            kind: StyleKind::from_ooxml(
                                attr(e, b"w:type").as_deref().unwrap_or("paragraph"),
                            ),
                            builtin,
                            is_default: matches!(
                                attr(e, b"w:default").as_deref(),
                                Some("1") | Some("true")
                            ),
                            based_on: None,
                            font: FontSpec::default(),
                            alignment: None,
                            paragraph: ParagraphFormat::default(),
                            num_id: None,
                        });
                        if is_empty {
                            styles.extend(current.take());
                        }
                    }
                    b"w:rPr" if !is_empty => in_rpr = true,
                    b"w:pPr" if !is_empty => in_ppr = true,
                    _ => {
                        if let Some(style) = current.as_mut() {
                            match e.name().as_ref() {
                                b"w:name" => {
                                    if let Some(raw) = attr(e, b"w:val") {
                                        style.name = ui_style_name(&raw, style.builtin);
                                    }
                                }
                                b"w:basedOn" => style.based_on = attr(e, b"w:val"),
                                b"w:jc" if in_ppr => {
                                    style.alignment =
                                        attr(e, b"w:val").as_deref().and_then(Alignment::from_ooxml);
                                }
                                b"w:numId" if in_ppr => {
                                    style.num_id =
                                        attr(e, b"w:val").and_then(|v| v.parse().ok());
                                }
                                _ if in_rpr => apply_character_property(&mut style.font, e),
                                _ if in_ppr => apply_paragraph_property(&mut style.paragraph, e),
                                _ => {}
                            }
                        }
                    }
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"w:style" => styles.extend(current.take()),
                b"w:rPr" => in_rpr = false,
                b"w:pPr" => in_ppr = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

// ────────────────────────────────────────────────────────────────────────────
// document.xml.rels / core.xml
// ────────────────────────────────────────────────────────────────────────────

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(RELS_PART, e))?
        {
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

fn parse_core(xml: &str) -> Result<CoreProperties, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut props = CoreProperties::default();
    let mut field: Option<&'static str> = None;
    let mut value = String::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(CORE_PART, e))?
        {
            Event::Start(ref e) => {
                field = match e.name().as_ref() {
                    b"dc:title" => Some("title"),
                    b"dc:creator" => Some("author"),
                    _ => None,
                };
                value.clear();
            }
            Event::Text(ref e) if field.is_some() => {
                let text = e.xml_content().map_err(|e| xml_error(CORE_PART, e))?;
                value.push_str(&text);
            }
            Event::GeneralRef(ref e) if field.is_some() => {
                if let Some(resolved) = resolve_entity(e) {
                    value.push_str(&resolved);
                }
            }
            Event::End(_) => {
                let text = value.trim();
                match field.take() {
                    Some("title") if !text.is_empty() => props.title = Some(text.to_string()),
                    Some("author") if !text.is_empty() => props.author = Some(text.to_string()),
                    _ => {}
                }
                value.clear();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(props)
}

// ────────────────────────────────────────────────────────────────────────────
// document.xml
// ────────────────────────────────────────────────────────────────────────────

struct Body {
    paragraphs: Vec<Paragraph>,
    table_count: usize,
    geometry: Option<PageGeometry>,
}

#[derive(Default)]
struct BodyState {
    table_depth: usize,
    /// Depth inside text-box content or a markup-compatibility fallback.
    /// Paragraphs in there are not body paragraphs.
    nested_depth: usize,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    run_font: FontSpec,
    link: Option<String>,
    in_ppr: bool,
    in_rpr: bool,
    in_text: bool,
    in_sect: bool,
    section: Option<PageGeometry>,
}

impl BodyState {
    fn finish_run(&mut self) {
        if let (Some(mut run), Some(paragraph)) = (self.run.take(), self.paragraph.as_mut()) {
            let font = std::mem::take(&mut self.run_font);
            run.font = font.name;
            run.size = font.size;
            run.bold = font.bold;
            run.italic = font.italic;
            run.underline = font.underline;
            run.color = font.color;
            paragraph.runs.push(run);
        }
        self.run_font = FontSpec::default();
    }
}

fn parse_body(
    xml: &str,
    styles: &[StyleDef],
    links: &HashMap<String, String>,
) -> Result<Body, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let style_name = |id: &str| -> String {
        styles
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let default_style = styles
        .iter()
        .find(|s| s.is_default && s.kind == StyleKind::Paragraph)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| super::STYLE_NORMAL.to_string());

    let mut buf = Vec::new();
    let mut state = BodyState::default();
    let mut paragraphs = Vec::new();
    let mut table_count = 0usize;
    let mut geometry: Option<PageGeometry> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(DOCUMENT_PART, e))?;
        let is_empty = matches!(event, Event::Empty(_));

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"w:txbxContent" | b"mc:Fallback" => {
                    if !is_empty {
                        state.nested_depth += 1;
                    }
                }
                _ if state.nested_depth > 0 => {}
                b"w:tbl" => {
                    if state.table_depth == 0 {
                        table_count += 1;
                    }
                    if !is_empty {
                        state.table_depth += 1;
                    }
                }
                _ if state.table_depth > 0 => {}
                b"w:p" => {
                    if is_empty {
                        paragraphs.push(Paragraph {
                            style: Some(default_style.clone()),
                            ..Default::default()
                        });
                    } else {
                        state.paragraph = Some(Paragraph::new());
                    }
                }
                b"w:pPr" if !is_empty => state.in_ppr = true,
                b"w:sectPr" if !is_empty => {
                    state.in_sect = true;
                    state.section = Some(PageGeometry::default());
                }
                b"w:pgSz" if state.in_sect => {
                    if let Some(section) = state.section.as_mut() {
                        if let Some(w) = twips_attr(e, b"w:w") {
                            section.page_width = w;
                        }
                        if let Some(h) = twips_attr(e, b"w:h") {
                            section.page_height = h;
                        }
                    }
                }
                b"w:pgMar" if state.in_sect => {
                    if let Some(section) = state.section.as_mut() {
                        let m = section.margins;
                        section.margins = Margins {
                            top: twips_attr(e, b"w:top").unwrap_or(m.top),
                            bottom: twips_attr(e, b"w:bottom").unwrap_or(m.bottom),
                            left: twips_attr(e, b"w:left").unwrap_or(m.left),
                            right: twips_attr(e, b"w:right").unwrap_or(m.right),
                        };
                    }
                }
                _ if state.in_sect => {}
                b"w:pStyle" if state.in_ppr => {
                    if let (Some(p), Some(id)) = (state.paragraph.as_mut(), attr(e, b"w:val")) {
                        p.style = Some(style_name(&id));
                    }
                }
                b"w:jc" if state.in_ppr => {
                    if let Some(p) = state.paragraph.as_mut() {
                        p.alignment = attr(e, b"w:val").as_deref().and_then(Alignment::from_ooxml);
                    }
                }
                b"w:tab" if state.in_ppr => {
                    let right = attr(e, b"w:val").as_deref() == Some("right");
                    if let (true, Some(p), Some(pos)) =
                        (right, state.paragraph.as_mut(), twips_attr(e, b"w:pos"))
                    {
                        p.format.right_tabs.push(pos);
                    }
                }
                b"w:bottom" if state.in_ppr => {
                    if let Some(p) = state.paragraph.as_mut() {
                        p.format.bottom_border = toggle(e);
                    }
                }
                _ if state.in_ppr && !state.in_rpr => {
                    if let Some(p) = state.paragraph.as_mut() {
                        apply_paragraph_property(&mut p.format, e);
                    }
                }
                b"w:hyperlink" if !is_empty => {
                    state.link = attr(e, b"r:id").and_then(|id| links.get(&id).cloned());
                }
                b"w:r" => {
                    state.run = Some(Run {
                        link: state.link.clone(),
                        ..Default::default()
                    });
                    if is_empty {
                        state.finish_run();
                    }
                }
                b"w:rPr" if !is_empty => state.in_rpr = true,
                _ if state.in_rpr => {
                    if state.run.is_some() && e.name().as_ref() != b"w:rStyle" {
                        apply_character_property(&mut state.run_font, e);
                    }
                }
                b"w:t" if !is_empty => state.in_text = true,
                b"w:tab" => {
                    if let Some(run) = state.run.as_mut() {
                        run.text.push('\t');
                    }
                }
                b"w:br" | b"w:cr" => {
                    if let Some(run) = state.run.as_mut() {
                        run.text.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(ref e) if state.in_text && state.nested_depth == 0 => {
                let text = e.xml_content().map_err(|e| xml_error(DOCUMENT_PART, e))?;
                if let Some(run) = state.run.as_mut() {
                    run.text.push_str(&text);
                }
            }
            Event::GeneralRef(ref e) if state.in_text && state.nested_depth == 0 => {
                if let (Some(resolved), Some(run)) = (resolve_entity(e), state.run.as_mut()) {
                    run.text.push_str(&resolved);
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"w:txbxContent" | b"mc:Fallback" => {
                    state.nested_depth = state.nested_depth.saturating_sub(1);
                }
                _ if state.nested_depth > 0 => {}
                b"w:tbl" => state.table_depth = state.table_depth.saturating_sub(1),
                _ if state.table_depth > 0 => {}
                b"w:t" => state.in_text = false,
                b"w:rPr" => state.in_rpr = false,
                b"w:pPr" => state.in_ppr = false,
                b"w:r" => state.finish_run(),
                b"w:hyperlink" => state.link = None,
                b"w:sectPr" => {
                    state.in_sect = false;
                    if geometry.is_none() {
                        geometry = state.section.take();
                    }
                }
                b"w:p" => {
                    if let Some(mut p) = state.paragraph.take() {
                        if p.style.is_none() {
                            p.style = Some(default_style.clone());
                        }
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(Body {
        paragraphs,
        table_count,
        geometry,
    })
}
