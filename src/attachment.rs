//! # Attachment Model
//!
//! Un attachment è un'immagine caricata nella media library con le sue
//! renditions (le size generate: thumbnail, medium, ...). La size "full" è
//! sempre l'originale e non compare nella lista delle renditions.
//!
//! La libreria degli attachment è un file JSON sotto la upload root:
//!
//! ```json
//! {
//!   "attachments": {
//!     "42": {
//!       "file": "2024/05/photo.jpg",
//!       "url": "https://example.com/uploads/2024/05/photo.jpg",
//!       "renditions": [
//!         { "label": "thumbnail", "file": "photo-150x150.jpg" }
//!       ]
//!     }
//!   }
//! }
//! ```

use crate::error::{OptimizeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Size label of the original image.
pub const FULL_SIZE: &str = "full";

/// Opaque attachment identity. Zero means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub u64);

impl AttachmentId {
    pub fn is_set(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A generated size of an attachment. `file` is relative to the original's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub label: String,
    pub file: String,
}

impl Rendition {
    pub fn new(label: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            file: file.into(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.label == FULL_SIZE
    }
}

/// An uploaded image asset with its absolute original path and public URL
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: AttachmentId,
    pub file: PathBuf,
    pub url: String,
    pub renditions: Vec<Rendition>,
}

impl Attachment {
    pub fn new(id: AttachmentId, file: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            id,
            file: file.into(),
            url: url.into(),
            renditions: Vec::new(),
        }
    }

    pub fn with_renditions(mut self, renditions: Vec<Rendition>) -> Self {
        self.renditions = renditions;
        self
    }
}

/// Persisted entry of the attachment library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Path relative to the upload root
    pub file: PathBuf,
    pub url: String,
    #[serde(default)]
    pub renditions: Vec<Rendition>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryFile {
    attachments: BTreeMap<u64, LibraryEntry>,
}

/// JSON-backed attachment library rooted at the upload directory
pub struct AttachmentLibrary {
    path: PathBuf,
    upload_root: PathBuf,
    library: LibraryFile,
}

impl AttachmentLibrary {
    /// Load the library; a missing file is an empty library
    pub async fn load(path: &Path, upload_root: &Path) -> Result<Self> {
        let library = if path.exists() {
            let content = fs::read_to_string(path).await?;
            serde_json::from_str(&content)?
        } else {
            LibraryFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            upload_root: upload_root.to_path_buf(),
            library,
        })
    }

    pub async fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.library)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }

    pub fn insert(&mut self, id: AttachmentId, entry: LibraryEntry) {
        self.library.attachments.insert(id.0, entry);
    }

    /// Resolve an attachment with its absolute original path
    pub fn get(&self, id: AttachmentId) -> Result<Attachment> {
        let entry = self
            .library
            .attachments
            .get(&id.0)
            .ok_or(OptimizeError::UnknownAttachment(id.0))?;

        Ok(Attachment {
            id,
            file: self.upload_root.join(&entry.file),
            url: entry.url.clone(),
            renditions: entry.renditions.clone(),
        })
    }

    /// Replace the stored renditions, e.g. after a restore regenerated them
    pub fn set_renditions(&mut self, id: AttachmentId, renditions: Vec<Rendition>) -> Result<()> {
        let entry = self
            .library
            .attachments
            .get_mut(&id.0)
            .ok_or(OptimizeError::UnknownAttachment(id.0))?;
        entry.renditions = renditions;
        Ok(())
    }
}
