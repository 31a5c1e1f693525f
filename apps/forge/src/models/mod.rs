pub mod resume;
pub mod style;

pub use resume::{
    CertificationEntry, CompetitionEntry, EducationEntry, ExperienceEntry, Header, ProjectEntry,
    ResumeRecord, SkillTable,
};
pub use style::{DocumentStyleConfig, Margins, Rgb};
