//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file della upload root e la
//! policy di idoneità e backup.
//!
//! ## Responsabilità:
//! - Idoneità di un attachment (id, esistenza file, estensione)
//! - Controllo della dimensione massima ottimizzabile
//! - Derivazione del path di backup sotto `<upload_root>/backup/`
//! - Cancellazione best-effort del backup
//! - Utilità per dimensioni human-readable
//!
//! ## Formati supportati:
//! - **Immagini**: JPG, JPEG, PNG
//!
//! ## Struttura backup:
//! ```text
//! /uploads/2024/05/photo.jpg
//! /uploads/backup/2024/05/photo.jpg
//! ```

use crate::attachment::Attachment;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Extensions the optimizer accepts
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Name of the backup subtree under the upload root
pub const BACKUP_DIR: &str = "backup";

/// File operations scoped to one upload root
#[derive(Debug, Clone)]
pub struct FileManager {
    upload_root: PathBuf,
}

impl FileManager {
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
        }
    }

    /// Check if an attachment can be sent to the optimizer
    pub fn is_eligible(attachment: &Attachment) -> bool {
        attachment.id.is_set()
            && attachment.file.is_file()
            && Self::is_supported_format(&attachment.file)
    }

    /// Check if a file format is supported
    pub fn is_supported_format(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// True if the original is larger than `max_bytes`. A missing file counts as 0 bytes.
    pub async fn exceeds_size_limit(attachment: &Attachment, max_bytes: u64) -> bool {
        Self::file_size(&attachment.file).await > max_bytes
    }

    /// Size on disk, 0 when the file cannot be read
    pub async fn file_size(path: &Path) -> u64 {
        fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
    }

    /// Same relative path under the backup subtree; `None` outside the upload root
    pub fn backup_path_for(&self, original_path: &Path) -> Option<PathBuf> {
        let relative = original_path.strip_prefix(&self.upload_root).ok()?;
        if relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.upload_root.join(BACKUP_DIR).join(relative))
    }

    /// Existing backup of the attachment's original, if any
    pub fn backup_of(&self, attachment: &Attachment) -> Option<PathBuf> {
        self.backup_path_for(&attachment.file)
            .filter(|path| path.is_file())
    }

    pub fn has_backup(&self, attachment: &Attachment) -> bool {
        self.backup_of(attachment).is_some()
    }

    /// Remove the backup; true if it was removed. Failures are logged and ignored.
    pub async fn delete_backup(&self, attachment: &Attachment) -> bool {
        let Some(backup_path) = self
            .backup_path_for(&attachment.file)
            .filter(|path| path.exists())
        else {
            return false;
        };

        match fs::remove_file(&backup_path).await {
            Ok(()) => {
                debug!("Deleted backup {}", backup_path.display());
                true
            }
            Err(e) => {
                warn!("Could not delete backup {}: {}", backup_path.display(), e);
                false
            }
        }
    }

    /// Copy `from` over `to`, creating parent directories
    pub async fn copy_over(from: &Path, to: &Path) -> Result<u64> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(fs::copy(from, to).await?)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
