use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::docx::{Alignment, StyleKind};
use crate::models::{Margins, Rgb};

// ────────────────────────────────────────────────────────────────────────────
// Point sizes as table keys
// ────────────────────────────────────────────────────────────────────────────

/// A font size stored in half-points so it can be ordered and used as a map
/// key. Serialized as its point value, e.g. `"11"` or `"10.5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PointSize(u32);

impl PointSize {
    pub fn from_points(points: f32) -> Self {
        PointSize((points * 2.0).round().max(0.0) as u32)
    }

    pub fn points(self) -> f32 {
        self.0 as f32 / 2.0
    }
}

impl fmt::Display for PointSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 2 == 0 {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}.5", self.0 / 2)
        }
    }
}

impl TryFrom<String> for PointSize {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let points: f32 = value
            .trim()
            .parse()
            .map_err(|_| format!("expected a point size, got '{value}'"))?;
        if !points.is_finite() || points < 0.0 {
            return Err(format!("expected a point size, got '{value}'"));
        }
        Ok(PointSize::from_points(points))
    }
}

impl From<PointSize> for String {
    fn from(value: PointSize) -> Self {
        value.to_string()
    }
}

/// Highest-count key. Ties go to the smallest key, so the answer never
/// depends on table iteration order.
pub fn dominant<K: Ord>(counts: &BTreeMap<K, usize>) -> Option<&K> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(key, _)| key)
}

// ────────────────────────────────────────────────────────────────────────────
// Signature
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorePropertiesInfo {
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub total_paragraphs: usize,
    pub total_tables: usize,
    pub core_properties: CorePropertiesInfo,
}

/// Page setup of the template's first section, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    pub page_width: f32,
    pub page_height: f32,
    pub margins: Margins,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    pub name: Option<String>,
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphFormatInfo {
    pub alignment: Option<Alignment>,
    pub left_indent: Option<f32>,
    pub first_line_indent: Option<f32>,
    pub space_before: Option<f32>,
    pub space_after: Option<f32>,
    pub line_spacing: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: StyleKind,
    pub builtin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_format: Option<ParagraphFormatInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSample {
    pub text: String,
    pub font_name: Option<String>,
    pub font_size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphSample {
    pub index: usize,
    pub text_preview: String,
    pub style_name: String,
    pub alignment: Option<Alignment>,
    pub runs: Vec<RunSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingPatterns {
    pub heading_styles: Vec<String>,
    pub body_styles: Vec<String>,
    pub list_styles: Vec<String>,
    pub common_fonts: BTreeMap<String, usize>,
    pub common_sizes: BTreeMap<PointSize, usize>,
}

/// Styling statistics extracted from a sample document. Read-only once built;
/// persisted as JSON and reloaded for later generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylingSignature {
    pub document_info: DocumentInfo,
    pub sections: SectionInfo,
    pub styles: BTreeMap<String, StyleInfo>,
    pub paragraphs: Vec<ParagraphSample>,
    pub formatting_patterns: FormattingPatterns,
}

impl StylingSignature {
    pub fn dominant_font(&self) -> Option<&str> {
        dominant(&self.formatting_patterns.common_fonts).map(String::as_str)
    }

    pub fn dominant_size(&self) -> Option<PointSize> {
        dominant(&self.formatting_patterns.common_sizes).copied()
    }

    pub fn smallest_size(&self) -> Option<PointSize> {
        self.formatting_patterns.common_sizes.keys().next().copied()
    }

    pub fn largest_size(&self) -> Option<PointSize> {
        self.formatting_patterns.common_sizes.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_tie_breaks_by_key() {
        let counts: BTreeMap<String, usize> =
            [("Calibri".to_string(), 5), ("Arial".to_string(), 5)].into();
        for _ in 0..10 {
            assert_eq!(dominant(&counts).map(String::as_str), Some("Arial"));
        }
    }

    #[test]
    fn test_dominant_prefers_higher_count() {
        let counts: BTreeMap<String, usize> =
            [("Arial".to_string(), 2), ("Georgia".to_string(), 7)].into();
        assert_eq!(dominant(&counts).map(String::as_str), Some("Georgia"));
        assert_eq!(dominant(&BTreeMap::<String, usize>::new()), None);
    }

    #[test]
    fn test_point_size_display_and_parse() {
        assert_eq!(PointSize::from_points(11.0).to_string(), "11");
        assert_eq!(PointSize::from_points(10.5).to_string(), "10.5");
        assert_eq!(PointSize::try_from("12.0".to_string()), Ok(PointSize::from_points(12.0)));
        assert!(PointSize::try_from("big".to_string()).is_err());
    }

    #[test]
    fn test_sizes_serialize_as_object_keys() {
        let mut patterns = FormattingPatterns::default();
        patterns.common_sizes.insert(PointSize::from_points(10.5), 3);
        patterns.common_sizes.insert(PointSize::from_points(11.0), 9);

        let json = serde_json::to_value(&patterns).unwrap();
        assert_eq!(json["common_sizes"]["10.5"], 3);
        assert_eq!(json["common_sizes"]["11"], 9);

        let back: FormattingPatterns = serde_json::from_value(json).unwrap();
        assert_eq!(back, patterns);
    }

    #[test]
    fn test_sizes_order_numerically() {
        let mut patterns = FormattingPatterns::default();
        for size in [9.0, 14.0, 10.5] {
            patterns.common_sizes.insert(PointSize::from_points(size), 1);
        }
        let keys: Vec<f32> = patterns.common_sizes.keys().map(|k| k.points()).collect();
        assert_eq!(keys, vec![9.0, 10.5, 14.0]);
    }
}
