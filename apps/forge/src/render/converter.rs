//! Fixed-layout (PDF) conversion through an external program.
//!
//! The converter is a soft dependency: a missing or failing program turns
//! into `ConversionOutcome::Unavailable`, never into a failed generation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("converter program '{0}' is not installed or not on PATH")]
    NotInstalled(String),

    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("converter reported success but wrote no file at {0}")]
    MissingOutput(PathBuf),

    #[error("fixed-layout conversion is disabled")]
    Disabled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One-shot, blocking conversion from a primary document to a fixed-layout file.
pub trait FixedLayoutConverter: Send + Sync {
    fn name(&self) -> &str;

    fn convert(&self, source: &Path, dest: &Path) -> Result<(), ConvertError>;
}

/// Result of the secondary conversion step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Converted { path: PathBuf },
    Unavailable { reason: String },
}

impl ConversionOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConversionOutcome::Converted { path } => Some(path),
            ConversionOutcome::Unavailable { .. } => None,
        }
    }
}

/// Runs the conversion, downgrading every failure to `Unavailable`.
pub fn convert_or_unavailable(
    converter: &dyn FixedLayoutConverter,
    source: &Path,
    dest: &Path,
) -> ConversionOutcome {
    match converter.convert(source, dest) {
        Ok(()) => {
            info!("PDF saved to {}", dest.display());
            ConversionOutcome::Converted {
                path: dest.to_path_buf(),
            }
        }
        Err(e) => {
            warn!(
                "PDF conversion via {} failed: {e}. Word document is still available.",
                converter.name()
            );
            ConversionOutcome::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LibreOffice headless
// ────────────────────────────────────────────────────────────────────────────

/// Converts with `<program> --headless --convert-to pdf --outdir <dir> <source>`.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: String,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        SofficeConverter::new("soffice")
    }
}

impl SofficeConverter {
    pub fn new(program: impl Into<String>) -> Self {
        SofficeConverter {
            program: program.into(),
        }
    }
}

impl FixedLayoutConverter for SofficeConverter {
    fn name(&self) -> &str {
        &self.program
    }

    fn convert(&self, source: &Path, dest: &Path) -> Result<(), ConvertError> {
        let out_dir = match dest.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let output = Command::new(&self.program)
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(&out_dir)
            .arg(source)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ConvertError::NotInstalled(self.program.clone()),
                _ => ConvertError::Io(e),
            })?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // The program names its output after the source stem.
        let stem = source.file_stem().unwrap_or(source.as_os_str());
        let produced = out_dir.join(format!("{}.pdf", stem.to_string_lossy()));
        if !produced.exists() {
            return Err(ConvertError::MissingOutput(produced));
        }
        if produced != dest {
            std::fs::rename(&produced, dest)?;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wrappers
// ────────────────────────────────────────────────────────────────────────────

/// Converter used when only the primary document is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConverter;

impl FixedLayoutConverter for NoConverter {
    fn name(&self) -> &str {
        "none"
    }

    fn convert(&self, _source: &Path, _dest: &Path) -> Result<(), ConvertError> {
        Err(ConvertError::Disabled)
    }
}

/// Admits one conversion at a time. The external program is commonly
/// single-instance per machine, so concurrent workers share one of these.
pub struct SerializedConverter<C> {
    inner: C,
    gate: Mutex<()>,
}

impl<C: FixedLayoutConverter> SerializedConverter<C> {
    pub fn new(inner: C) -> Self {
        SerializedConverter {
            inner,
            gate: Mutex::new(()),
        }
    }
}

impl<C: FixedLayoutConverter> FixedLayoutConverter for SerializedConverter<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn convert(&self, source: &Path, dest: &Path) -> Result<(), ConvertError> {
        let _guard = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.inner.convert(source, dest)
    }
}
