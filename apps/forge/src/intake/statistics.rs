use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::ResumeRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatistics {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeStatistics {
    /// Words across experience and project bullets.
    pub total_word_count: usize,
    pub bullet_points: usize,
    pub skills_count: usize,
    pub sections: BTreeMap<String, SectionStatistics>,
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Comma-separated skills, ignoring blank items.
fn count_skills(skills: &str) -> usize {
    skills.split(',').filter(|s| !s.trim().is_empty()).count()
}

fn bulleted<'a>(entries: impl Iterator<Item = &'a [String]>) -> SectionStatistics {
    let mut stats = SectionStatistics {
        bullets: Some(0),
        words: Some(0),
        ..Default::default()
    };
    for bullets in entries {
        stats.count += 1;
        stats.bullets = stats.bullets.map(|n| n + bullets.len());
        let words: usize = bullets.iter().map(|b| count_words(b)).sum();
        stats.words = stats.words.map(|n| n + words);
    }
    stats
}

pub fn analyze_resume(record: &ResumeRecord) -> ResumeStatistics {
    let skills_count = record
        .technical_skills
        .iter()
        .map(|(_, skills)| count_skills(skills))
        .sum();

    let experience = bulleted(record.experience.iter().map(|e| e.bullets.as_slice()));
    let projects = bulleted(record.projects.iter().map(|p| p.bullets.as_slice()));

    let mut stats = ResumeStatistics {
        skills_count,
        ..Default::default()
    };
    for section in [&experience, &projects] {
        stats.bullet_points += section.bullets.unwrap_or(0);
        stats.total_word_count += section.words.unwrap_or(0);
    }

    let counted = |count: usize| SectionStatistics {
        count,
        ..Default::default()
    };
    let sections = [
        ("experience", experience),
        ("projects", projects),
        ("education", counted(record.education.len())),
        ("certifications", counted(record.certifications.len())),
    ];
    // Sections without entries are left out.
    for (name, section) in sections {
        if section.count > 0 {
            stats.sections.insert(name.to_string(), section);
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CertificationEntry, EducationEntry, ExperienceEntry, ProjectEntry};

    #[test]
    fn test_counts_skills_bullets_and_words() {
        let mut record = ResumeRecord::default();
        record.technical_skills.insert("Languages", "Rust, Go, ");
        record.technical_skills.insert("Tools", "Git");
        record.experience.push(ExperienceEntry {
            bullets: vec!["Built a thing.".into(), "Shipped it fast.".into()],
            ..Default::default()
        });
        record.projects.push(ProjectEntry {
            bullets: vec!["Wrote docs.".into()],
            ..Default::default()
        });
        record.certifications.push(CertificationEntry::default());

        let stats = analyze_resume(&record);
        assert_eq!(stats.skills_count, 3);
        assert_eq!(stats.bullet_points, 3);
        assert_eq!(stats.total_word_count, 8);
        assert_eq!(stats.sections["experience"].bullets, Some(2));
        assert_eq!(stats.sections["projects"].words, Some(2));
        assert_eq!(stats.sections["certifications"].count, 1);
        assert!(!stats.sections.contains_key("education"));
    }

    #[test]
    fn test_empty_record_has_no_sections() {
        let stats = analyze_resume(&ResumeRecord::default());
        assert!(stats.sections.is_empty());
        assert_eq!(stats.bullet_points, 0);
        assert_eq!(stats.skills_count, 0);
    }

    #[test]
    fn test_count_words_ignores_extra_whitespace() {
        assert_eq!(count_words("  led   a team \n of five "), 5);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_education_stats_omit_bullets_in_json() {
        let mut record = ResumeRecord::default();
        record.education.push(EducationEntry::default());
        record.education.push(EducationEntry::default());
        let stats = analyze_resume(&record);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["sections"]["education"], serde_json::json!({"count": 2}));
    }
}
