use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::errors::AppError;

const HASH_LEN: usize = 8;

/// Metadata for one stored backup, newest file name first when listed.
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub hash: Option<String>,
}

/// Directory of JSON snapshots named `<name>_<YYYYmmdd_HHMMSS>_<hash8>.json`.
///
/// Identical payloads share a hash and are stored once.
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(BackupStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a snapshot of `payload`, or returns the path of an existing
    /// snapshot with the same content hash.
    pub fn create_backup(&self, payload: &Value, name: Option<&str>) -> Result<PathBuf, AppError> {
        let hash = content_hash(payload);
        let suffix = format!("_{hash}.json");

        if let Some(existing) = self
            .json_files()?
            .into_iter()
            .find(|p| file_name(p).ends_with(&suffix))
        {
            info!("Identical backup already exists: {}", existing.display());
            return Ok(existing);
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let stem = name.filter(|n| !n.trim().is_empty()).unwrap_or("backup");
        let path = self.dir.join(format!("{stem}_{timestamp}{suffix}"));

        std::fs::write(&path, serde_json::to_string_pretty(payload)?)?;
        info!("Backup created: {}", path.display());
        Ok(path)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, AppError> {
        let mut files = self.json_files()?;
        files.sort_by(|a, b| file_name(b).cmp(&file_name(a)));

        let mut backups = Vec::with_capacity(files.len());
        for path in files {
            let meta = std::fs::metadata(&path)?;
            let filename = file_name(&path);
            let hash = Path::new(&filename)
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|stem| stem.rsplit_once('_'))
                .map(|(_, hash)| hash.to_string());
            backups.push(BackupInfo {
                filename,
                size: meta.len(),
                modified: meta.modified().map(DateTime::<Utc>::from)?,
                hash,
                path,
            });
        }
        Ok(backups)
    }

    pub fn restore_backup(&self, path: &Path) -> Result<Value, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Deletes all but the `keep` most recently modified backups. Returns the
    /// number of files removed.
    pub fn cleanup_old_backups(&self, keep: usize) -> Result<usize, AppError> {
        let mut dated = Vec::new();
        for path in self.json_files()? {
            let modified = std::fs::metadata(&path)?.modified()?;
            dated.push((modified, path));
        }
        dated.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        let mut removed = 0;
        for (_, path) in dated.into_iter().skip(keep) {
            std::fs::remove_file(&path)?;
            info!("Deleted old backup: {}", path.display());
            removed += 1;
        }
        Ok(removed)
    }

    fn json_files(&self) -> Result<Vec<PathBuf>, AppError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First 8 hex characters of the SHA-256 of the key-sorted JSON text.
pub fn content_hash(payload: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(payload, &mut canonical);
    let digest = Sha256::digest(canonical.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(HASH_LEN);
    hex
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_hash_ignores_key_order() {
        let a = json!({"header": {"name": "A", "email": "a@b.co"}, "education": []});
        let b = json!({"education": [], "header": {"email": "a@b.co", "name": "A"}});
        assert_eq!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 8);
        assert_ne!(content_hash(&a), content_hash(&json!({"education": []})));
    }

    #[test]
    fn test_create_backup_names_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path()).unwrap();
        let payload = json!({"header": {"name": "Jane"}});

        let first = store.create_backup(&payload, Some("jane")).unwrap();
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("jane_"), "unexpected name {name}");
        assert!(name.ends_with(&format!("_{}.json", content_hash(&payload))));

        let second = store.create_backup(&payload, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_default_name_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path()).unwrap();
        let payload = json!({"experience": [{"title": "Engineer"}]});

        let path = store.create_backup(&payload, None).unwrap();
        assert!(file_name(&path).starts_with("backup_"));
        assert_eq!(store.restore_backup(&path).unwrap(), payload);

        let listed = store.list_backups().unwrap();
        assert_eq!(listed[0].hash.as_deref(), Some(content_hash(&payload).as_str()));
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path()).unwrap();
        for i in 0..4 {
            store.create_backup(&json!({ "n": i }), Some("v")).unwrap();
        }
        assert_eq!(store.list_backups().unwrap().len(), 4);

        let removed = store.cleanup_old_backups(2).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.list_backups().unwrap().len(), 2);
        assert_eq!(store.cleanup_old_backups(5).unwrap(), 0);
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let store = BackupStore::new(&nested).unwrap();
        assert!(store.dir().is_dir());
    }
}
