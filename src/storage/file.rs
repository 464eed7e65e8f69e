//! File-based learner storage for Pathway.
//!
//! The record is a single JSON file, by default `~/.pathway/record.json`.
//! Atomic writes are achieved via temp file + rename pattern.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{PathwayError, Result};
use crate::storage::{LearnerRecord, LearnerStore};

/// File-based learner storage.
#[derive(Debug, Clone)]
pub struct FileLearnerStore {
    /// Path of the record file.
    path: PathBuf,
}

impl FileLearnerStore {
    /// Create a store at the configured record path.
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = config.record_path().ok_or_else(|| {
            PathwayError::config("Could not determine record path (no home directory)")
        })?;
        Self::with_path(path)
    }

    /// Create a store at a custom path, creating the parent directory.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| PathwayError::storage(parent, e))?;
            }
        }

        Ok(Self { path })
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path for a temp file used during atomic writes.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "record.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    /// Write the record atomically using temp file + rename.
    fn atomic_write(&self, record: &LearnerRecord) -> Result<()> {
        let temp_path = self.temp_path();
        let json = serde_json::to_string_pretty(record)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| PathwayError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| PathwayError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| PathwayError::storage(&temp_path, e))?;
        }

        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, &self.path).map_err(|e| PathwayError::storage(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), "learner record saved");
        Ok(())
    }
}

impl LearnerStore for FileLearnerStore {
    fn load(&self) -> Result<Option<LearnerRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| PathwayError::storage(&self.path, e))?;
        let record: LearnerRecord = serde_json::from_str(&content)?;

        Ok(Some(record))
    }

    fn save(&self, record: &LearnerRecord) -> Result<()> {
        self.atomic_write(record)
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| PathwayError::storage(&self.path, e))?;
        }

        let temp_path = self.temp_path();
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }

        Ok(())
    }
}
