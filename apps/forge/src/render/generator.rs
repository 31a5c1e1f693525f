use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::docx::Document;
use crate::errors::AppError;
use crate::intake::{clean, validate};
use crate::models::{DocumentStyleConfig, ResumeRecord};
use crate::render::builder::ResumeBuilder;
use crate::render::converter::{
    convert_or_unavailable, ConversionOutcome, FixedLayoutConverter, SofficeConverter,
};
use crate::render::style_provider::StyleProvider;

/// Paths produced by one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutput {
    pub word_path: PathBuf,
    pub pdf: ConversionOutcome,
}

/// Top-level entry point: JSON in, `.docx` (and, when possible, PDF) out.
///
/// Holds only read-only state, so one generator can serve many concurrent
/// calls; each call builds its own document.
pub struct ResumeGenerator {
    config: DocumentStyleConfig,
    styles: Option<Arc<dyn StyleProvider>>,
    converter: Arc<dyn FixedLayoutConverter>,
}

impl ResumeGenerator {
    pub fn new(config: DocumentStyleConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(ResumeGenerator {
            config,
            styles: None,
            converter: Arc::new(SofficeConverter::default()),
        })
    }

    pub fn with_converter(mut self, converter: Arc<dyn FixedLayoutConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Replaces the config-backed styling, e.g. with a template's `StyleApplier`.
    pub fn with_styles(mut self, styles: Arc<dyn StyleProvider>) -> Self {
        self.styles = Some(styles);
        self
    }

    pub fn config(&self) -> &DocumentStyleConfig {
        &self.config
    }

    fn provider(&self) -> &dyn StyleProvider {
        match &self.styles {
            Some(styles) => styles.as_ref(),
            None => &self.config,
        }
    }

    pub fn load_json(&self, path: &Path) -> Result<Value, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            error!("JSON file not found: {}", path.display());
            AppError::Io(e)
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            error!("Invalid JSON format in {}: {e}", path.display());
            AppError::Json(e)
        })
    }

    pub fn save_json(&self, payload: &Value, path: &Path) -> Result<(), AppError> {
        std::fs::write(path, serde_json::to_string_pretty(payload)?)?;
        info!("JSON saved to {}", path.display());
        Ok(())
    }

    pub fn build(&self, record: &ResumeRecord) -> Result<Document, AppError> {
        ResumeBuilder::new(self.provider()).build_resume(record)
    }

    pub fn generate_word(&self, record: &ResumeRecord, path: &Path) -> Result<PathBuf, AppError> {
        let doc = self.build(record)?;
        doc.save(path)?;
        info!("Word document saved to {}", path.display());
        Ok(path.to_path_buf())
    }

    /// Converts an existing `.docx`. The PDF lands next to it unless `pdf_path`
    /// is given. Never fails.
    pub fn generate_pdf(&self, word_path: &Path, pdf_path: Option<&Path>) -> ConversionOutcome {
        let dest = pdf_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| word_path.with_extension("pdf"));
        convert_or_unavailable(self.converter.as_ref(), word_path, &dest)
    }

    /// Loads, validates (advisory), cleans, and renders `json_path`.
    ///
    /// Output goes to `output_dir`, or next to the JSON file when `None`.
    pub fn generate_from_json(
        &self,
        json_path: &Path,
        output_dir: Option<&Path>,
        base_name: &str,
    ) -> Result<GenerationOutput, AppError> {
        let payload = self.load_json(json_path)?;
        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => json_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        self.generate_from_value(payload, &output_dir, base_name)
    }

    pub fn generate_from_value(
        &self,
        payload: Value,
        output_dir: &Path,
        base_name: &str,
    ) -> Result<GenerationOutput, AppError> {
        let report = validate(&payload);
        for problem in &report.errors {
            warn!("Validation: {problem}");
        }

        let record = clean(ResumeRecord::from_value(payload)?);

        std::fs::create_dir_all(output_dir)?;
        let stem = unique_stem(base_name);
        let word_path = output_dir.join(format!("{stem}.docx"));
        let pdf_path = output_dir.join(format!("{stem}.pdf"));

        self.generate_word(&record, &word_path)?;
        let pdf = self.generate_pdf(&word_path, Some(&pdf_path));

        Ok(GenerationOutput { word_path, pdf })
    }
}

/// `<base>_<YYYYmmdd_HHMMSS>_<8 hex>`: distinct across concurrent calls
/// within the same second.
fn unique_stem(base_name: &str) -> String {
    let base = base_name.trim();
    let base = if base.is_empty() { "resume" } else { base };
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{base}_{timestamp}_{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::docx;
    use crate::render::converter::NoConverter;

    fn minimal() -> Value {
        json!({
            "header": {"name": "Test User", "email": "test@example.com"},
            "technical_skills": {},
            "education": [],
            "experience": [],
            "projects": [],
            "competitions": [],
            "certifications": []
        })
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DocumentStyleConfig {
            margin_top: 3.0,
            ..Default::default()
        };
        let err = ResumeGenerator::new(config).err().unwrap();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_end_to_end_minimal_record() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("resume.json");
        std::fs::write(&json_path, minimal().to_string()).unwrap();

        let generator = ResumeGenerator::new(DocumentStyleConfig::default())
            .unwrap()
            .with_converter(Arc::new(NoConverter));
        let output = generator
            .generate_from_json(&json_path, Some(&dir.path().join("out")), "test")
            .unwrap();

        assert!(output.word_path.exists());
        assert!(std::fs::metadata(&output.word_path).unwrap().len() > 0);

        let doc = docx::read_path(&output.word_path).unwrap();
        let text = doc.text();
        assert!(text.contains("Test User"));
        for heading in [
            "TECHNICAL SKILLS",
            "EDUCATION",
            "EXPERIENCE",
            "PROJECTS",
            "CODING COMPETITIONS",
            "CERTIFICATIONS",
        ] {
            assert!(!text.contains(heading), "unexpected heading {heading}");
        }
    }

    #[test]
    fn test_missing_converter_still_returns_word_document() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ResumeGenerator::new(DocumentStyleConfig::default())
            .unwrap()
            .with_converter(Arc::new(SofficeConverter::new(
                "definitely-not-a-real-converter-binary",
            )));

        let output = generator
            .generate_from_value(minimal(), dir.path(), "resume")
            .unwrap();
        assert!(output.word_path.exists());
        assert_eq!(output.pdf.path(), None);
        assert!(matches!(output.pdf, ConversionOutcome::Unavailable { .. }));
    }

    #[test]
    fn test_invalid_record_still_generates() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ResumeGenerator::new(DocumentStyleConfig::default())
            .unwrap()
            .with_converter(Arc::new(NoConverter));
        let payload = json!({"header": {"name": "No Email", "email": "invalid-email"}});

        let output = generator
            .generate_from_value(payload, dir.path(), "resume")
            .unwrap();
        assert!(output.word_path.exists());
    }

    #[test]
    fn test_wrong_shape_is_hard_failure() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ResumeGenerator::new(DocumentStyleConfig::default()).unwrap();
        let err = generator
            .generate_from_value(json!({"experience": 42}), dir.path(), "resume")
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_RECORD");
    }

    #[test]
    fn test_generates_in_template_style() {
        use crate::docx::{Paragraph, Run};
        use crate::template::{analyze, StyleApplier};

        let dir = tempfile::tempdir().unwrap();
        let mut sample = Document::new();
        sample.geometry.margins = crate::models::Margins::uniform(0.8);
        let heading = sample.add_paragraph(Paragraph::new());
        heading.style = Some("Heading 1".to_string());
        heading.push(Run::new("EXPERIENCE").font("Georgia").size(13.0));
        for _ in 0..3 {
            sample
                .add_paragraph(Paragraph::new())
                .push(Run::new("Body text").font("Georgia").size(10.0));
        }
        let template_path = dir.path().join("template.docx");
        sample.save(&template_path).unwrap();

        let applier = StyleApplier::new(analyze(&template_path).unwrap());
        let generator = ResumeGenerator::new(DocumentStyleConfig::default())
            .unwrap()
            .with_converter(Arc::new(NoConverter))
            .with_styles(Arc::new(applier));
        let mut payload = minimal();
        payload["experience"] = json!([{
            "title": "Engineer", "company": "Acme", "location": "Remote",
            "dates": "2020 - 2024", "bullets": ["Shipped it"]
        }]);

        let output = generator
            .generate_from_value(payload, &dir.path().join("out"), "styled")
            .unwrap();
        let doc = docx::read_path(&output.word_path).unwrap();

        assert_eq!(doc.geometry.margins.left, 0.8);
        let name_run = &doc.paragraphs[0].runs[0];
        assert_eq!(name_run.font.as_deref(), Some("Georgia"));
        assert_eq!(name_run.size, Some(17.0));
        assert!(doc
            .paragraphs
            .iter()
            .any(|p| p.style.as_deref() == Some("Heading 1") && p.text() == "EXPERIENCE"));
    }

    #[test]
    fn test_output_names_are_distinct() {
        let a = unique_stem("jane");
        let b = unique_stem("jane");
        assert!(a.starts_with("jane_"));
        assert_ne!(a, b);
        assert!(unique_stem("  ").starts_with("resume_"));
    }

    #[test]
    fn test_load_and_save_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy.json");
        let generator = ResumeGenerator::new(DocumentStyleConfig::default()).unwrap();

        generator.save_json(&minimal(), &path).unwrap();
        assert_eq!(generator.load_json(&path).unwrap(), minimal());

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(generator.load_json(&path).unwrap_err().code(), "JSON_ERROR");
        assert_eq!(
            generator
                .load_json(&dir.path().join("missing.json"))
                .unwrap_err()
                .code(),
            "IO_ERROR"
        );
    }
}
