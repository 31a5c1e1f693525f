use tracing::debug;

use crate::docx::{Alignment, Document, Paragraph, Run};
use crate::errors::AppError;
use crate::models::{
    CertificationEntry, CompetitionEntry, EducationEntry, ExperienceEntry, Header, ProjectEntry,
    ResumeRecord, SkillTable,
};
use crate::render::style_provider::{StyleProvider, TextRole};

/// Width of the bold category label in the skills section, including at
/// least one trailing space.
const SKILL_LABEL_WIDTH: usize = 15;

type SectionFn<'a> = fn(&mut ResumeBuilder<'a>, &ResumeRecord) -> Result<(), AppError>;

/// Renders a record into a fresh document, one operation per section.
///
/// Every section method appends to the document created by
/// `create_document` and fails with `DocumentNotInitialized` before that.
pub struct ResumeBuilder<'a> {
    styles: &'a dyn StyleProvider,
    doc: Option<Document>,
}

impl<'a> ResumeBuilder<'a> {
    pub fn new(styles: &'a dyn StyleProvider) -> Self {
        ResumeBuilder { styles, doc: None }
    }

    pub fn create_document(&mut self) -> &mut Document {
        let mut doc = Document::new();
        doc.geometry = self.styles.page_geometry();
        self.doc.insert(doc)
    }

    pub fn document(&self) -> Option<&Document> {
        self.doc.as_ref()
    }

    pub fn into_document(self) -> Result<Document, AppError> {
        self.doc.ok_or(AppError::DocumentNotInitialized)
    }

    fn doc_mut(&mut self) -> Result<&mut Document, AppError> {
        self.doc.as_mut().ok_or(AppError::DocumentNotInitialized)
    }

    // ── run and paragraph helpers ───────────────────────────────────────────

    fn run(&self, text: impl Into<String>, role: TextRole) -> Run {
        let mut run = Run::new(text)
            .font(self.styles.font_family())
            .size(self.styles.font_size(role));
        run.color = self.styles.color(role);
        run
    }

    fn body_paragraph(&self) -> Paragraph {
        let mut p = Paragraph::new();
        let (before, after) = self.styles.paragraph_spacing();
        p.format.space_before = before;
        p.format.space_after = after;
        p.format.line_spacing = self.styles.line_spacing();
        p
    }

    fn push_body(&mut self, mut p: Paragraph) -> Result<(), AppError> {
        let styles = self.styles;
        let doc = self.doc_mut()?;
        styles.body_paragraph(doc, &mut p);
        doc.add_paragraph(p);
        Ok(())
    }

    fn push_list_item(&mut self, runs: Vec<Run>) -> Result<(), AppError> {
        let mut p = self.body_paragraph();
        p.runs = runs;
        let styles = self.styles;
        let doc = self.doc_mut()?;
        styles.list_paragraph(doc, &mut p);
        doc.add_paragraph(p);
        Ok(())
    }

    fn push_bullets(&mut self, bullets: &[String]) -> Result<(), AppError> {
        for bullet in bullets {
            let run = self.run(bullet.as_str(), TextRole::Body);
            self.push_list_item(vec![run])?;
        }
        Ok(())
    }

    /// One line with `left` at the margin and `right` pushed to a right tab
    /// stop at the text edge. Skipped when both sides are empty.
    fn push_two_column(&mut self, left: Run, right: Run) -> Result<(), AppError> {
        if left.text.is_empty() && right.text.is_empty() {
            return Ok(());
        }
        let content_width = self.doc_mut()?.geometry.content_width();

        let mut p = self.body_paragraph();
        p.format.right_tabs.push(content_width);
        let has_right = !right.text.is_empty();
        p.runs.push(left);
        if has_right {
            p.runs.push(Run::new("\t"));
            p.runs.push(right);
        }
        self.push_body(p)
    }

    // ── sections ────────────────────────────────────────────────────────────

    pub fn add_header(&mut self, header: &Header) -> Result<(), AppError> {
        self.doc_mut()?;

        if !header.name.is_empty() {
            let mut p = self.body_paragraph().with_alignment(Alignment::Center);
            p.push(self.run(header.name.as_str(), TextRole::Name).bold());
            self.push_body(p)?;
        }

        let contact = header.contact_parts();
        if !contact.is_empty() {
            let mut p = self.body_paragraph().with_alignment(Alignment::Center);
            p.push(self.run(contact.join(" | "), TextRole::Body));
            self.push_body(p)?;
        }

        let links = header.links();
        if !links.is_empty() {
            let mut p = self.body_paragraph().with_alignment(Alignment::Center);
            for (i, (label, url)) in links.into_iter().enumerate() {
                if i > 0 {
                    p.push(self.run(" | ", TextRole::Body));
                }
                p.push(self.run(label, TextRole::Link).underline().link(url));
            }
            self.push_body(p)?;
        }
        Ok(())
    }

    /// Upper-cased bold title followed by a full-width rule.
    pub fn add_section_header(&mut self, title: &str) -> Result<(), AppError> {
        let mut p = self.body_paragraph();
        p.format.space_before = Some(self.styles.section_spacing());
        p.push(self.run(title.to_uppercase(), TextRole::Section).bold());

        let styles = self.styles;
        let doc = self.doc_mut()?;
        styles.heading_paragraph(doc, &mut p, 1);
        doc.add_paragraph(p);

        let mut rule = Paragraph::new();
        rule.format.bottom_border = true;
        rule.format.space_after = Some(2.0);
        doc.add_paragraph(rule);
        Ok(())
    }

    pub fn add_technical_skills(&mut self, skills: &SkillTable) -> Result<(), AppError> {
        self.add_section_header("Technical Skills")?;
        for (category, list) in skills.iter() {
            let label = format!("{:<width$} ", category, width = SKILL_LABEL_WIDTH - 1);
            let mut p = self.body_paragraph();
            p.push(self.run(label, TextRole::Body).bold());
            p.push(self.run(list, TextRole::Body));
            self.push_body(p)?;
        }
        Ok(())
    }

    pub fn add_education(&mut self, education: &[EducationEntry]) -> Result<(), AppError> {
        self.add_section_header("Education")?;
        for edu in education {
            let degree = self.run(edu.degree.as_str(), TextRole::Body).bold();
            let dates = self.run(edu.dates.as_str(), TextRole::Body);
            self.push_two_column(degree, dates)?;

            let school_text = match edu.gpa.as_deref().filter(|g| !g.is_empty()) {
                Some(gpa) => format!("{} \u{2014} {}", edu.school, gpa),
                None => edu.school.clone(),
            };
            let school = self.run(school_text, TextRole::Body);
            let location = self.run(edu.location.as_str(), TextRole::Body);
            self.push_two_column(school, location)?;

            self.push_bullets(&edu.notes)?;
        }
        Ok(())
    }

    pub fn add_experience(&mut self, experience: &[ExperienceEntry]) -> Result<(), AppError> {
        self.add_section_header("Experience")?;
        for (i, exp) in experience.iter().enumerate() {
            let title = self.run(exp.title.as_str(), TextRole::Body).bold();
            let dates = self.run(exp.dates.as_str(), TextRole::Body);
            self.push_two_column(title, dates)?;

            let company = self.run(exp.company.as_str(), TextRole::Body).italic();
            let location = self.run(exp.location.as_str(), TextRole::Body).italic();
            self.push_two_column(company, location)?;

            self.push_bullets(&exp.bullets)?;

            if i + 1 < experience.len() {
                self.doc_mut()?.add_blank_paragraph();
            }
        }
        Ok(())
    }

    pub fn add_projects(&mut self, projects: &[ProjectEntry]) -> Result<(), AppError> {
        self.add_section_header("Projects")?;
        for project in projects {
            let name_text = match project.description.as_deref().filter(|d| !d.is_empty()) {
                Some(description) => format!("{} | {}", project.name, description),
                None => project.name.clone(),
            };
            let name = self.run(name_text, TextRole::Body).bold();
            let dates = self.run(project.dates.as_str(), TextRole::Body);
            self.push_two_column(name, dates)?;

            self.push_bullets(&project.bullets)?;
        }
        Ok(())
    }

    pub fn add_competitions(&mut self, competitions: &[CompetitionEntry]) -> Result<(), AppError> {
        self.add_section_header("Coding Competitions")?;
        for comp in competitions {
            let name = self.run(comp.name.as_str(), TextRole::Body).bold();
            let date = self.run(comp.date.as_str(), TextRole::Body);
            self.push_two_column(name, date)?;

            let organization = self.run(comp.organization.as_str(), TextRole::Body);
            let location = self.run(comp.location.as_str(), TextRole::Body);
            self.push_two_column(organization, location)?;

            self.push_bullets(&comp.bullets)?;
        }
        Ok(())
    }

    pub fn add_certifications(
        &mut self,
        certifications: &[CertificationEntry],
    ) -> Result<(), AppError> {
        self.add_section_header("Certifications")?;
        let content_width = self.doc_mut()?.geometry.content_width();
        for cert in certifications {
            let mut runs = vec![self.run(cert.name.as_str(), TextRole::Body)];
            if !cert.date.is_empty() {
                runs.push(Run::new("\t"));
                runs.push(self.run(cert.date.as_str(), TextRole::Body));
            }
            let mut p = self.body_paragraph();
            p.format.right_tabs.push(content_width);
            p.runs = runs;

            let styles = self.styles;
            let doc = self.doc_mut()?;
            styles.list_paragraph(doc, &mut p);
            doc.add_paragraph(p);
        }
        Ok(())
    }

    /// Creates a new document and renders every non-empty section in
    /// canonical order, with one blank paragraph between consecutive
    /// sections. Hands the finished document to the caller.
    pub fn build_resume(&mut self, record: &ResumeRecord) -> Result<Document, AppError> {
        self.create_document();
        if !record.header.name.is_empty() {
            let doc = self.doc_mut()?;
            doc.properties.title = Some(format!("{} Resume", record.header.name));
            doc.properties.author = Some(record.header.name.clone());
        }

        let sections: [(&str, bool, SectionFn<'a>); 7] = [
            ("header", !record.header.is_empty(), |b, r| {
                b.add_header(&r.header)
            }),
            (
                "technical_skills",
                !record.technical_skills.is_empty(),
                |b, r| b.add_technical_skills(&r.technical_skills),
            ),
            ("education", !record.education.is_empty(), |b, r| {
                b.add_education(&r.education)
            }),
            ("experience", !record.experience.is_empty(), |b, r| {
                b.add_experience(&r.experience)
            }),
            ("projects", !record.projects.is_empty(), |b, r| {
                b.add_projects(&r.projects)
            }),
            ("competitions", !record.competitions.is_empty(), |b, r| {
                b.add_competitions(&r.competitions)
            }),
            ("certifications", !record.certifications.is_empty(), |b, r| {
                b.add_certifications(&r.certifications)
            }),
        ];

        let mut emitted = false;
        for (name, present, render) in sections {
            if !present {
                debug!("Skipping empty section {name}");
                continue;
            }
            if emitted {
                self.doc_mut()?.add_blank_paragraph();
            }
            render(self, record)?;
            emitted = true;
        }

        self.doc.take().ok_or(AppError::DocumentNotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentStyleConfig;

    fn record() -> ResumeRecord {
        let raw = r#"{
            "header": {
                "name": "Jane Doe",
                "email": "jane@example.com",
                "phone": "555-123-4567",
                "location": "Austin, TX",
                "linkedin": "https://linkedin.com/in/jane",
                "github": "https://github.com/jane"
            },
            "technical_skills": {"Languages": "Rust, Go", "Tools": "Git"},
            "education": [{"degree": "BS Computer Science", "school": "UT Austin",
                           "location": "Austin, TX", "dates": "2016 - 2020", "gpa": "3.9",
                           "notes": ["Dean's list."]}],
            "experience": [
                {"title": "Engineer", "company": "Acme", "location": "Remote",
                 "dates": "2021 - Present", "bullets": ["Built things.", "Fixed things."]},
                {"title": "Intern", "company": "Initech", "location": "Austin, TX",
                 "dates": "2020", "bullets": ["Learned things."]}
            ],
            "certifications": [{"name": "AWS SAA", "date": "2023"}]
        }"#;
        ResumeRecord::from_json_str(raw).unwrap()
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.paragraphs.iter().map(Paragraph::text).collect()
    }

    #[test]
    fn test_section_methods_require_document() {
        let config = DocumentStyleConfig::default();
        let mut builder = ResumeBuilder::new(&config);
        let err = builder.add_section_header("Projects").unwrap_err();
        assert!(matches!(err, AppError::DocumentNotInitialized));
        assert!(builder.add_header(&Header::default()).is_err());
        assert!(builder.add_certifications(&[]).is_err());
    }

    #[test]
    fn test_header_layout() {
        let config = DocumentStyleConfig::default();
        let doc = ResumeBuilder::new(&config).build_resume(&record()).unwrap();

        let name = &doc.paragraphs[0];
        assert_eq!(name.text(), "Jane Doe");
        assert_eq!(name.alignment, Some(Alignment::Center));
        assert_eq!(name.runs[0].bold, Some(true));
        assert_eq!(name.runs[0].size, Some(20.0));

        assert_eq!(
            doc.paragraphs[1].text(),
            "555-123-4567 | jane@example.com | Austin, TX"
        );

        let links = &doc.paragraphs[2];
        assert_eq!(links.text(), "LinkedIn | GitHub");
        assert_eq!(
            links.runs[0].link.as_deref(),
            Some("https://linkedin.com/in/jane")
        );
        assert!(!links.text().contains("https://"));
    }

    #[test]
    fn test_sections_in_canonical_order_and_empty_ones_skipped() {
        let config = DocumentStyleConfig::default();
        let doc = ResumeBuilder::new(&config).build_resume(&record()).unwrap();
        let headings: Vec<String> = texts(&doc)
            .into_iter()
            .filter(|t| {
                ["TECHNICAL SKILLS", "EDUCATION", "EXPERIENCE", "PROJECTS", "CERTIFICATIONS"]
                    .contains(&t.as_str())
                    || t == "CODING COMPETITIONS"
            })
            .collect();
        assert_eq!(
            headings,
            vec!["TECHNICAL SKILLS", "EDUCATION", "EXPERIENCE", "CERTIFICATIONS"]
        );
        assert!(!doc.text().contains("PROJECTS"));
    }

    #[test]
    fn test_section_header_followed_by_rule() {
        let config = DocumentStyleConfig::default();
        let doc = ResumeBuilder::new(&config).build_resume(&record()).unwrap();
        let idx = doc
            .paragraphs
            .iter()
            .position(|p| p.text() == "EDUCATION")
            .unwrap();
        let heading = &doc.paragraphs[idx];
        assert_eq!(heading.runs[0].bold, Some(true));
        assert_eq!(heading.runs[0].size, Some(12.0));
        assert_eq!(heading.format.space_before, Some(6.0));
        assert!(doc.paragraphs[idx + 1].format.bottom_border);
    }

    #[test]
    fn test_entries_keep_input_order_with_separator_between() {
        let config = DocumentStyleConfig::default();
        let doc = ResumeBuilder::new(&config).build_resume(&record()).unwrap();
        let all = texts(&doc);
        let engineer = all.iter().position(|t| t.starts_with("Engineer")).unwrap();
        let intern = all.iter().position(|t| t.starts_with("Intern")).unwrap();
        assert!(engineer < intern);
        assert_eq!(all[intern - 1], "", "blank separator between entries");
        assert_eq!(all[engineer + 1], "Acme\tRemote");
        assert_eq!(doc.paragraphs[engineer + 2].style.as_deref(), Some("List Bullet"));
    }

    #[test]
    fn test_education_gpa_and_dates() {
        let config = DocumentStyleConfig::default();
        let doc = ResumeBuilder::new(&config).build_resume(&record()).unwrap();
        let all = texts(&doc);
        assert!(all.contains(&"BS Computer Science\t2016 - 2020".to_string()));
        assert!(all.contains(&"UT Austin \u{2014} 3.9\tAustin, TX".to_string()));

        let degree = doc
            .paragraphs
            .iter()
            .find(|p| p.text().starts_with("BS Computer"))
            .unwrap();
        assert_eq!(degree.format.right_tabs, vec![7.5]);
    }

    #[test]
    fn test_skill_labels_fixed_width() {
        let config = DocumentStyleConfig::default();
        let doc = ResumeBuilder::new(&config).build_resume(&record()).unwrap();
        let skills = doc
            .paragraphs
            .iter()
            .find(|p| p.text().starts_with("Languages"))
            .unwrap();
        assert_eq!(skills.runs[0].text, "Languages      ");
        assert_eq!(skills.runs[0].text.len(), 15);
        assert_eq!(skills.runs[0].bold, Some(true));
        assert_eq!(skills.runs[1].text, "Rust, Go");
    }

    #[test]
    fn test_certification_is_single_bulleted_line() {
        let config = DocumentStyleConfig::default();
        let doc = ResumeBuilder::new(&config).build_resume(&record()).unwrap();
        let last = doc.paragraphs.last().unwrap();
        assert_eq!(last.text(), "AWS SAA\t2023");
        assert_eq!(last.style.as_deref(), Some("List Bullet"));
    }

    #[test]
    fn test_blank_separators_only_between_sections() {
        let config = DocumentStyleConfig::default();
        let record = ResumeRecord::from_json_str(
            r#"{"header": {"name": "Test User", "email": "test@example.com"},
                "technical_skills": {}, "education": [], "experience": [],
                "projects": [], "competitions": [], "certifications": []}"#,
        )
        .unwrap();
        let doc = ResumeBuilder::new(&config).build_resume(&record).unwrap();
        assert_eq!(texts(&doc), vec!["Test User", "test@example.com"]);
    }

    #[test]
    fn test_margins_come_from_provider() {
        let config = DocumentStyleConfig {
            margin_top: 1.25,
            ..Default::default()
        };
        let doc = ResumeBuilder::new(&config).build_resume(&record()).unwrap();
        assert_eq!(doc.geometry.margins.top, 1.25);
    }
}
