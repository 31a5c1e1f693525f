use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static PHONE_SEPARATORS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-\(\)\.]+").unwrap());
static PHONE_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{10,15}$").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_\+.~#?&/=]*)$",
    )
    .unwrap()
});

const REQUIRED_HEADER_FIELDS: &[&str] = &["name", "email"];
const LINK_FIELDS: &[&str] = &["linkedin", "portfolio", "github"];
const EXPECTED_SECTIONS: &[&str] = &["technical_skills", "education", "experience"];

/// Outcome of checking a raw payload. Advisory: a failed report never
/// blocks generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<String>,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Separators (space, dash, parentheses, dot) are ignored; 10 to 15 digits
/// remain, optionally after a leading `+`.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = PHONE_SEPARATORS_RE.replace_all(phone, "");
    PHONE_DIGITS_RE.is_match(&digits)
}

pub fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

/// Non-empty string value of `key`, if any.
fn present<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Checks the raw JSON payload, so missing sections can be told apart from
/// empty ones. Errors are reported in a fixed order: header presence,
/// required header fields, email, phone, links, then expected sections.
pub fn validate(payload: &Value) -> ValidationReport {
    let mut errors = Vec::new();

    match payload.get("header") {
        None => errors.push("Missing 'header' section".to_string()),
        Some(header) => {
            for field in REQUIRED_HEADER_FIELDS {
                if present(header, field).is_none() {
                    errors.push(format!("Missing required field: header.{field}"));
                }
            }

            if let Some(email) = present(header, "email") {
                if !is_valid_email(email) {
                    errors.push(format!("Invalid email format: {email}"));
                }
            }

            if let Some(phone) = present(header, "phone") {
                if !is_valid_phone(phone) {
                    errors.push(format!("Invalid phone format: {phone}"));
                }
            }

            for field in LINK_FIELDS {
                if let Some(url) = present(header, field) {
                    if !is_valid_url(url) {
                        errors.push(format!("Invalid URL format: {field}"));
                    }
                }
            }
        }
    }

    for section in EXPECTED_SECTIONS {
        if payload.get(section).is_none() {
            errors.push(format!("Missing '{section}' section"));
        }
    }

    ValidationReport {
        passed: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn complete() -> Value {
        json!({
            "header": {
                "name": "Jane Doe",
                "email": "jane@example.com",
                "phone": "(555) 123-4567",
                "linkedin": "https://linkedin.com/in/janedoe",
                "github": "https://github.com/janedoe"
            },
            "technical_skills": {"Languages": "Rust, Go"},
            "education": [],
            "experience": []
        })
    }

    #[test]
    fn test_complete_record_passes() {
        let report = validate(&complete());
        assert!(report.passed, "unexpected errors: {:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_invalid_email_reported() {
        let mut payload = complete();
        payload["header"]["email"] = json!("invalid-email");
        let report = validate(&payload);
        assert!(!report.passed);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("Invalid email format")));
    }

    #[test]
    fn test_short_phone_rejected() {
        assert!(!is_valid_phone("123"));
        assert!(is_valid_phone("+1 (555) 123-4567"));
        assert!(is_valid_phone("555.123.4567"));

        let mut payload = complete();
        payload["header"]["phone"] = json!("123");
        let report = validate(&payload);
        assert_eq!(report.errors, vec!["Invalid phone format: 123"]);
    }

    #[test]
    fn test_url_without_scheme_rejected() {
        assert!(!is_valid_url("example.com"));
        assert!(is_valid_url("https://www.example.com/path?q=1"));
        assert!(!is_valid_url("https://localhost"));

        let mut payload = complete();
        payload["header"]["portfolio"] = json!("example.com");
        let report = validate(&payload);
        assert_eq!(report.errors, vec!["Invalid URL format: portfolio"]);
    }

    #[test]
    fn test_missing_header_and_sections_in_order() {
        let report = validate(&json!({}));
        assert_eq!(
            report.errors,
            vec![
                "Missing 'header' section",
                "Missing 'technical_skills' section",
                "Missing 'education' section",
                "Missing 'experience' section",
            ]
        );
    }

    #[test]
    fn test_empty_required_fields_reported() {
        let report = validate(&json!({
            "header": {"name": "", "email": null},
            "technical_skills": {}, "education": [], "experience": []
        }));
        assert_eq!(
            report.errors,
            vec![
                "Missing required field: header.name",
                "Missing required field: header.email",
            ]
        );
    }

    #[test]
    fn test_empty_optional_fields_are_not_checked() {
        let mut payload = complete();
        payload["header"]["phone"] = json!("");
        payload["header"]["github"] = json!("");
        assert!(validate(&payload).passed);
    }
}
