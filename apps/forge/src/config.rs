use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::batch::DEFAULT_WORKERS;

/// Process-level configuration loaded from environment variables.
/// Every variable is optional; defaults match the CLI defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// Named styling signatures saved with `template save`.
    pub template_dir: PathBuf,
    /// Program used for the fixed-layout (PDF) conversion step.
    pub converter_program: String,
    pub workers: usize,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: PathBuf::from("./output"),
            backup_dir: PathBuf::from("./backups"),
            template_dir: PathBuf::from("./templates"),
            converter_program: "soffice".to_string(),
            workers: DEFAULT_WORKERS,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let workers = match std::env::var("FORGE_WORKERS") {
            Ok(raw) => parse_workers(&raw)?,
            Err(_) => defaults.workers,
        };

        Ok(Config {
            output_dir: optional_env("FORGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            backup_dir: optional_env("FORGE_BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_dir),
            template_dir: optional_env("FORGE_TEMPLATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_dir),
            converter_program: optional_env("FORGE_CONVERTER")
                .unwrap_or(defaults.converter_program),
            workers,
            rust_log: optional_env("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_workers(raw: &str) -> Result<usize> {
    let workers = raw
        .trim()
        .parse::<usize>()
        .with_context(|| format!("FORGE_WORKERS must be a positive integer, got '{raw}'"))?;
    anyhow::ensure!(workers > 0, "FORGE_WORKERS must be at least 1");
    Ok(workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.converter_program, "soffice");
        assert_eq!(config.template_dir, PathBuf::from("./templates"));
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_parse_workers_accepts_positive() {
        assert_eq!(parse_workers(" 8 ").unwrap(), 8);
    }

    #[test]
    fn test_parse_workers_rejects_zero_and_garbage() {
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("many").is_err());
    }
}
