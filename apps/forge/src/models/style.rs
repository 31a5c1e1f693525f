use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_MARGIN_IN: f32 = 0.1;
pub const MAX_MARGIN_IN: f32 = 2.0;

// ────────────────────────────────────────────────────────────────────────────
// Colors
// ────────────────────────────────────────────────────────────────────────────

/// 24-bit color. Serialized as its `RRGGBB` hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const DARK_BLUE: Rgb = Rgb(0, 0, 139);

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("expected RRGGBB hex color, got '{s}'"));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Margins
// ────────────────────────────────────────────────────────────────────────────

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn uniform(inches: f32) -> Self {
        Margins {
            top: inches,
            bottom: inches,
            left: inches,
            right: inches,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document style configuration
// ────────────────────────────────────────────────────────────────────────────

/// Formatting parameters for one generation call.
///
/// Built once per call (CLI flags, CSV row, or defaults) and read-only while
/// rendering. Never shared mutably between concurrent generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStyleConfig {
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,

    pub font_name: String,
    pub font_size_normal: f32,
    pub font_size_heading: f32,
    pub font_size_section: f32,
    pub font_size_name: f32,

    pub line_spacing: f32,
    /// Points.
    pub paragraph_spacing_before: f32,
    /// Points.
    pub paragraph_spacing_after: f32,
    /// Points of space above each section heading.
    pub section_spacing: f32,

    pub heading_color: Rgb,
    pub text_color: Rgb,
    pub link_color: Rgb,
}

impl Default for DocumentStyleConfig {
    fn default() -> Self {
        DocumentStyleConfig {
            margin_top: 0.5,
            margin_bottom: 0.5,
            margin_left: 0.5,
            margin_right: 0.5,
            font_name: "Calibri".to_string(),
            font_size_normal: 11.0,
            font_size_heading: 14.0,
            font_size_section: 12.0,
            font_size_name: 20.0,
            line_spacing: 1.0,
            paragraph_spacing_before: 0.0,
            paragraph_spacing_after: 0.0,
            section_spacing: 6.0,
            heading_color: Rgb::BLACK,
            text_color: Rgb::BLACK,
            link_color: Rgb::DARK_BLUE,
        }
    }
}

impl DocumentStyleConfig {
    pub fn margins(&self) -> Margins {
        Margins {
            top: self.margin_top,
            bottom: self.margin_bottom,
            left: self.margin_left,
            right: self.margin_right,
        }
    }

    /// Rejects margins outside [0.1, 2.0] inches, non-positive sizes or line
    /// spacing, and an empty font family.
    pub fn validate(&self) -> Result<(), AppError> {
        let margins = [
            ("margin_top", self.margin_top),
            ("margin_bottom", self.margin_bottom),
            ("margin_left", self.margin_left),
            ("margin_right", self.margin_right),
        ];
        for (field, value) in margins {
            if !(MIN_MARGIN_IN..=MAX_MARGIN_IN).contains(&value) {
                return Err(AppError::InvalidConfig(format!(
                    "{field} {value} outside [{MIN_MARGIN_IN}, {MAX_MARGIN_IN}] inches"
                )));
            }
        }

        let sizes = [
            ("font_size_normal", self.font_size_normal),
            ("font_size_heading", self.font_size_heading),
            ("font_size_section", self.font_size_section),
            ("font_size_name", self.font_size_name),
        ];
        for (field, value) in sizes {
            if value <= 0.0 || value.is_nan() {
                return Err(AppError::InvalidConfig(format!(
                    "{field} must be positive, got {value}"
                )));
            }
        }

        if self.font_name.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "font_name cannot be empty".to_string(),
            ));
        }
        if self.line_spacing <= 0.0 || self.line_spacing.is_nan() {
            return Err(AppError::InvalidConfig(format!(
                "line_spacing must be positive, got {}",
                self.line_spacing
            )));
        }
        if self.paragraph_spacing_before < 0.0
            || self.paragraph_spacing_after < 0.0
            || self.section_spacing < 0.0
        {
            return Err(AppError::InvalidConfig(
                "spacing values cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}
