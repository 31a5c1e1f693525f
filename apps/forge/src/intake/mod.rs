//! Everything that happens to a resume payload before rendering: advisory
//! validation, normalization, statistics, and local snapshots.

pub mod backup;
pub mod cleaning;
pub mod statistics;
pub mod validation;

pub use backup::{BackupInfo, BackupStore};
pub use cleaning::clean;
pub use statistics::{analyze_resume, ResumeStatistics};
pub use validation::{validate, ValidationReport};
