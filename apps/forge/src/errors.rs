use thiserror::Error;

use crate::docx::DocxError;

/// Crate-level error type.
/// Every variant maps to a stable code via `code()` so batch reports and the CLI
/// can surface one machine-readable tag per failed item.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Document not created. Call create_document() first.")]
    DocumentNotInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid resume record: {0}")]
    InvalidRecord(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document error: {0}")]
    Docx(#[from] DocxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DocumentNotInitialized => "DOCUMENT_NOT_INITIALIZED",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::InvalidRecord(_) => "INVALID_RECORD",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Docx(_) => "DOCUMENT_ERROR",
            AppError::Csv(_) => "CSV_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Formats the error the way batch reports and CLI output present it.
    pub fn to_report_line(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_initialized_message_mentions_create_document() {
        let err = AppError::DocumentNotInitialized;
        assert!(err.to_string().contains("create_document()"));
        assert_eq!(err.code(), "DOCUMENT_NOT_INITIALIZED");
    }

    #[test]
    fn test_report_line_carries_code_and_message() {
        let err = AppError::InvalidConfig("margin_top 3 outside [0.1, 2.0]".to_string());
        let line = err.to_report_line();
        assert!(line.starts_with("[INVALID_CONFIG]"));
        assert!(line.contains("margin_top"));
    }

    #[test]
    fn test_internal_error_code_and_report_line() {
        let err = AppError::Internal(anyhow::anyhow!("worker pool closed"));
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(
            err.to_report_line(),
            "[INTERNAL_ERROR] Internal error: worker pool closed"
        );
    }

    #[test]
    fn test_io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AppError = io.into();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
