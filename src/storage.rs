//! Per-user file storage: uploaded photo bytes and the archived
//! artifacts of finalized reports.
//!
//! Layout under the data directory:
//!
//! ```text
//! users/<user_id>/photos/photo_<uuid>.<ext>   session uploads
//! users/<user_id>/reports/<report_id>/        finalized artifacts
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::models::Photo;

#[derive(Debug, Clone)]
pub struct Storage {
    base: PathBuf,
}

impl Storage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn default_dir() -> Result<Self> {
        if let Ok(dir) = std::env::var("FIELDREPORT_DATA_DIR") {
            return Ok(Self::new(dir));
        }
        let dirs = directories::ProjectDirs::from("", "", "fieldreport")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(Self::new(dirs.data_dir()))
    }

    pub fn database_path(&self) -> PathBuf {
        self.base.join("fieldreport.db")
    }

    fn user_dir(&self, user_id: Uuid) -> PathBuf {
        self.base.join("users").join(user_id.to_string())
    }

    /// Write an uploaded photo to the user's session photo directory.
    /// The extension is taken from the uploaded filename, `.jpg` when
    /// absent.
    pub fn save_photo(
        &self,
        user_id: Uuid,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let dir = self.user_dir(user_id).join("photos");
        std::fs::create_dir_all(&dir)?;
        let ext = extension_of(file_name).unwrap_or("jpg");
        let path = dir.join(format!("photo_{}.{}", Uuid::new_v4().simple(), ext));
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write photo to {}", path.display()))?;
        Ok(path)
    }

    /// Archive a finalized report: write the generated document and
    /// move the session's photos into the report directory, rewriting
    /// each photo's `file_path` to its archived location. Photos that
    /// already live outside the session directory (a report re-opened
    /// via `/open`) are copied, not moved. Returns the stored document
    /// path.
    pub fn archive_report(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        doc_name: &str,
        doc_bytes: &[u8],
        photos: &mut [Photo],
    ) -> Result<PathBuf> {
        let dir = self.user_dir(user_id).join("reports").join(report_id.to_string());
        let photos_dir = dir.join("photos");
        std::fs::create_dir_all(&photos_dir)?;

        let doc_path = dir.join(doc_name);
        std::fs::write(&doc_path, doc_bytes)
            .with_context(|| format!("Failed to write document to {}", doc_path.display()))?;

        let session_dir = self.user_dir(user_id).join("photos");
        for photo in photos {
            let Some(src) = photo.file_path.clone().map(PathBuf::from) else {
                continue;
            };
            if !src.exists() {
                tracing::warn!("Photo file missing at archive time: {}", src.display());
                continue;
            }
            if let Some(name) = src.file_name() {
                let dest = photos_dir.join(name);
                std::fs::copy(&src, &dest)?;
                if src.starts_with(&session_dir) {
                    std::fs::remove_file(&src).ok();
                }
                photo.file_path = Some(dest.to_string_lossy().into_owned());
            }
        }

        Ok(doc_path)
    }

    /// Remove session photo files that were never archived (cancel
    /// path). Files outside the session directory belong to an
    /// archived report a cancelled `/open` was seeded from; those are
    /// left alone.
    pub fn discard_photos(&self, user_id: Uuid, photos: &[Photo]) {
        let session_dir = self.user_dir(user_id).join("photos");
        for photo in photos {
            let Some(path) = photo.file_path.as_deref() else {
                continue;
            };
            if !Path::new(path).starts_with(&session_dir) {
                continue;
            }
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove photo {}: {}", path, e);
                }
            }
        }
    }

    pub fn delete_report_dir(&self, user_id: Uuid, report_id: Uuid) -> Result<()> {
        let dir = self.user_dir(user_id).join("reports").join(report_id.to_string());
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
        }
        Ok(())
    }
}

fn extension_of(file_name: Option<&str>) -> Option<&str> {
    let name = file_name?;
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
