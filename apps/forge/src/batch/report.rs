use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;

const RULE_WIDE: usize = 60;
const RULE_NARROW: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSuccess {
    pub input: String,
    pub word: PathBuf,
    /// `None` when the fixed-layout converter was unavailable.
    pub pdf: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub input: String,
    /// `[CODE] message`.
    pub error: String,
}

/// Outcome of one batch run. Items appear in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResults {
    pub successful: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
    pub total: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub duration_secs: f64,
}

impl BatchResults {
    pub fn start() -> Self {
        let now = Local::now();
        BatchResults {
            successful: Vec::new(),
            failed: Vec::new(),
            total: 0,
            started_at: now,
            finished_at: now,
            duration_secs: 0.0,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Local::now();
        self.total = self.successful.len() + self.failed.len();
        let elapsed = self.finished_at - self.started_at;
        self.duration_secs = elapsed.num_milliseconds().max(0) as f64 / 1000.0;
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `batch_report_<YYYYmmdd_HHMMSS>.txt` in the working directory.
pub fn default_report_path() -> PathBuf {
    PathBuf::from(format!(
        "batch_report_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

pub fn render_report(results: &BatchResults) -> String {
    let mut out = String::new();
    let wide = "=".repeat(RULE_WIDE);
    let narrow = "-".repeat(RULE_NARROW);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{wide}\nBATCH PROCESSING REPORT\n{wide}\n");
    let _ = writeln!(out, "Start Time: {}", results.started_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "End Time: {}", results.finished_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Duration: {:.2} seconds", results.duration_secs);
    let _ = writeln!(out, "Total Files: {}", results.total);
    let _ = writeln!(out, "Successful: {}", results.successful.len());
    let _ = writeln!(out, "Failed: {}\n", results.failed.len());

    if !results.successful.is_empty() {
        let _ = writeln!(out, "SUCCESSFUL PROCESSING:\n{narrow}");
        for item in &results.successful {
            let _ = writeln!(out, "Input: {}", item.input);
            let _ = writeln!(out, "  Word: {}", item.word.display());
            if let Some(pdf) = &item.pdf {
                let _ = writeln!(out, "  PDF: {}", pdf.display());
            }
            out.push('\n');
        }
    }

    if !results.failed.is_empty() {
        let _ = writeln!(out, "\nFAILED PROCESSING:\n{narrow}");
        for item in &results.failed {
            let _ = writeln!(out, "Input: {}", item.input);
            let _ = writeln!(out, "  Error: {}\n", item.error);
        }
    }

    out
}

pub fn write_report(results: &BatchResults, path: &Path) -> Result<PathBuf, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_report(results))?;
    info!("Report saved to: {}", path.display());
    Ok(path.to_path_buf())
}
