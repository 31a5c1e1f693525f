use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Header, ResumeRecord};

static PHONE_SEPARATORS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-\(\)\.]+").unwrap());

/// Normalizes a record for rendering. Idempotent: cleaning a cleaned record
/// returns it unchanged.
///
/// - header strings are trimmed and phone separators collapse to single dashes
/// - bullets in experience, projects, and competitions are trimmed, blanks
///   dropped, and a terminating period appended where missing
/// - blank education notes are dropped
pub fn clean(mut record: ResumeRecord) -> ResumeRecord {
    clean_header(&mut record.header);

    for entry in &mut record.experience {
        entry.bullets = clean_bullets(std::mem::take(&mut entry.bullets));
    }
    for entry in &mut record.projects {
        entry.bullets = clean_bullets(std::mem::take(&mut entry.bullets));
    }
    for entry in &mut record.competitions {
        entry.bullets = clean_bullets(std::mem::take(&mut entry.bullets));
    }
    for entry in &mut record.education {
        entry.notes = drop_blank(std::mem::take(&mut entry.notes));
    }

    record
}

fn clean_header(header: &mut Header) {
    header.name = header.name.trim().to_string();
    header.email = header.email.trim().to_string();
    for field in [
        &mut header.location,
        &mut header.linkedin,
        &mut header.portfolio,
        &mut header.github,
    ] {
        if let Some(value) = field.as_mut() {
            *value = value.trim().to_string();
        }
    }
    if let Some(phone) = header.phone.as_mut() {
        *phone = normalize_phone(phone);
    }
}

/// `"(555) 123.4567"` becomes `"555-123-4567"`.
pub fn normalize_phone(phone: &str) -> String {
    PHONE_SEPARATORS_RE
        .replace_all(phone.trim(), "-")
        .trim_matches('-')
        .to_string()
}

fn drop_blank(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn clean_bullets(bullets: Vec<String>) -> Vec<String> {
    drop_blank(bullets)
        .into_iter()
        .map(|b| if b.ends_with('.') { b } else { b + "." })
        .collect()
}
