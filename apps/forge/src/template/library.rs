use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::AppError;

use super::analyzer::{load_signature, save_analysis};
use super::signature::StylingSignature;

/// Directory of named styling signatures, one `<name>.json` per template.
pub struct TemplateLibrary {
    dir: PathBuf,
}

impl TemplateLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(TemplateLibrary { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores `signature` under `name`, replacing any template of that name.
    pub fn save_as_template(
        &self,
        signature: &StylingSignature,
        name: &str,
    ) -> Result<PathBuf, AppError> {
        let path = self.path(name)?;
        save_analysis(signature, &path)?;
        info!("Template saved: {}", path.display());
        Ok(path)
    }

    /// Names of stored templates, sorted.
    pub fn list_templates(&self) -> Result<Vec<String>, AppError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load_template(&self, name: &str) -> Result<StylingSignature, AppError> {
        load_signature(&self.path(name)?)
    }

    /// Template names are plain file stems: no separators or parent references.
    fn path(&self, name: &str) -> Result<PathBuf, AppError> {
        let name = name.trim();
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(AppError::InvalidConfig(format!(
                "invalid template name '{name}'"
            )));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}
