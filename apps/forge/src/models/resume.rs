use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::AppError;

/// Root aggregate for one generation pass.
///
/// Deserialized from the JSON payload: unknown top-level keys are ignored and
/// missing sections become empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    #[serde(default)]
    pub header: Header,
    #[serde(default)]
    pub technical_skills: SkillTable,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub competitions: Vec<CompetitionEntry>,
    #[serde(default)]
    pub certifications: Vec<CertificationEntry>,
}

impl ResumeRecord {
    pub fn from_value(payload: serde_json::Value) -> Result<Self, AppError> {
        serde_json::from_value(payload).map_err(|e| AppError::InvalidRecord(e.to_string()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let payload: serde_json::Value = serde_json::from_str(raw)?;
        Self::from_value(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

impl Header {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
            && self.email.trim().is_empty()
            && [
                &self.phone,
                &self.location,
                &self.linkedin,
                &self.portfolio,
                &self.github,
            ]
            .iter()
            .all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
    }

    /// Present contact fields in display order: phone, email, location.
    pub fn contact_parts(&self) -> Vec<&str> {
        [
            self.phone.as_deref(),
            Some(self.email.as_str()),
            self.location.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect()
    }

    /// Present links as (label, url) pairs in display order.
    pub fn links(&self) -> Vec<(&'static str, &str)> {
        [
            ("LinkedIn", self.linkedin.as_deref()),
            ("Portfolio", self.portfolio.as_deref()),
            ("GitHub", self.github.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, url)| url.filter(|u| !u.is_empty()).map(|u| (label, u)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub dates: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitionEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificationEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Skill table
// ────────────────────────────────────────────────────────────────────────────

/// Ordered category → skills mapping. Insertion order is rendering order.
///
/// Keys are unique: a repeated key keeps its first position and takes the
/// later value, matching how a JSON object with duplicate keys resolves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillTable {
    entries: Vec<(String, String)>,
}

impl SkillTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, skills: impl Into<String>) {
        let category = category.into();
        let skills = skills.into();
        match self.entries.iter_mut().find(|(k, _)| *k == category) {
            Some(slot) => slot.1 = skills,
            None => self.entries.push((category, skills)),
        }
    }

    pub fn get(&self, category: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == category)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SkillTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = SkillTable::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

impl Serialize for SkillTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SkillTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SkillTableVisitor;

        impl<'de> Visitor<'de> for SkillTableVisitor {
            type Value = SkillTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping skill categories to skill strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SkillTable, A::Error> {
                let mut table = SkillTable::new();
                while let Some((category, skills)) = access.next_entry::<String, String>()? {
                    table.insert(category, skills);
                }
                Ok(table)
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<SkillTable, E> {
                Ok(SkillTable::new())
            }
        }

        deserializer.deserialize_any(SkillTableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_table_preserves_document_order() {
        let raw = r#"{"technical_skills": {"Tools": "Git", "Languages": "Rust, Go", "Cloud": "AWS"}}"#;
        let record = ResumeRecord::from_json_str(raw).unwrap();
        let order: Vec<&str> = record.technical_skills.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["Tools", "Languages", "Cloud"]);
    }

    #[test]
    fn test_skill_table_duplicate_key_keeps_first_position() {
        let mut table = SkillTable::new();
        table.insert("Languages", "Rust");
        table.insert("Tools", "Git");
        table.insert("Languages", "Rust, Go");
        assert_eq!(table.len(), 2);
        assert_eq!(table.iter().next(), Some(("Languages", "Rust, Go")));
    }

    #[test]
    fn test_skill_table_serializes_in_order() {
        let table: SkillTable = vec![("Zeta", "z"), ("Alpha", "a")].into_iter().collect();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"Zeta":"z","Alpha":"a"}"#);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let record =
            ResumeRecord::from_json_str(r#"{"header": {"name": "A", "email": "a@b.co"}}"#).unwrap();
        assert!(record.technical_skills.is_empty());
        assert!(record.projects.is_empty());
        assert!(record.certifications.is_empty());
    }

    #[test]
    fn test_unknown_top_level_keys_are_ignored() {
        let raw = r#"{"header": {"name": "A", "email": "a@b.co"}, "hobbies": ["chess"]}"#;
        assert!(ResumeRecord::from_json_str(raw).is_ok());
    }

    #[test]
    fn test_wrong_shape_is_invalid_record() {
        let err = ResumeRecord::from_json_str(r#"{"experience": "none"}"#).unwrap_err();
        assert_eq!(err.code(), "INVALID_RECORD");
    }

    #[test]
    fn test_header_links_skip_absent_and_empty() {
        let header = Header {
            name: "A".into(),
            email: "a@b.co".into(),
            linkedin: Some("https://linkedin.com/in/a".into()),
            portfolio: Some(String::new()),
            github: Some("https://github.com/a".into()),
            ..Default::default()
        };
        let labels: Vec<&str> = header.links().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["LinkedIn", "GitHub"]);
    }

    #[test]
    fn test_contact_parts_order() {
        let header = Header {
            name: "A".into(),
            email: "a@b.co".into(),
            phone: Some("555-123-4567".into()),
            location: Some("Austin, TX".into()),
            ..Default::default()
        };
        assert_eq!(
            header.contact_parts(),
            vec!["555-123-4567", "a@b.co", "Austin, TX"]
        );
    }
}
