//! Many generations at once, plus the plain-text run report.

pub mod processor;
pub mod report;

pub use processor::{BatchProcessor, CsvRow, DEFAULT_WORKERS};
pub use report::{default_report_path, write_report, BatchFailure, BatchResults, BatchSuccess};
