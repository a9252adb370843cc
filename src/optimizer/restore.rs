//! # Restoration Manager
//!
//! Ripristina un attachment dal backup pre-ottimizzazione.
//!
//! ## Flusso:
//! 1. Nessun backup: no-op (nessuna notifica, nessuno stato toccato)
//! 2. Notifica `before_restore`
//! 3. Copia il backup sopra l'originale (best-effort)
//! 4. Rigenera le size dall'originale, senza optimize-on-upload
//! 5. Cancella record e status dallo store
//! 6. Notifica `after_restore`
//!
//! Un fallimento della copia al punto 3 viene solo loggato: i passi
//! successivi vengono eseguiti comunque.

use crate::attachment::{Attachment, Rendition};
use crate::error::Result;
use crate::file_manager::FileManager;
use crate::hooks::Hooks;
use crate::optimizer::locks::AttachmentLocks;
use crate::regenerate::RenditionGenerator;
use crate::state::RecordStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one `restore` call
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    NoBackup,
    Restored {
        /// False when copying the backup over the original failed
        backup_copied: bool,
        /// None when regeneration failed
        renditions: Option<Vec<Rendition>>,
    },
}

/// Reverts attachments to their backup and clears their optimization state
pub struct RestorationManager {
    files: FileManager,
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn RenditionGenerator>,
    hooks: Hooks,
    locks: AttachmentLocks,
}

impl RestorationManager {
    pub fn new(
        files: FileManager,
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn RenditionGenerator>,
        hooks: Hooks,
    ) -> Self {
        Self {
            files,
            store,
            generator,
            hooks,
            locks: AttachmentLocks::new(),
        }
    }

    pub fn with_locks(mut self, locks: AttachmentLocks) -> Self {
        self.locks = locks;
        self
    }

    pub async fn restore(&self, attachment: &Attachment) -> Result<RestoreOutcome> {
        let id = attachment.id;
        let _guard = self.locks.acquire(id).await;

        let Some(backup_path) = self.files.backup_of(attachment) else {
            debug!("Attachment {} has no backup", id);
            return Ok(RestoreOutcome::NoBackup);
        };

        self.hooks.before_restore(id);

        let backup_copied = match FileManager::copy_over(&backup_path, &attachment.file).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "Could not copy backup {} over {}: {}",
                    backup_path.display(),
                    attachment.file.display(),
                    e
                );
                false
            }
        };

        let renditions = match self.generator.regenerate(attachment, false).await {
            Ok(renditions) => Some(renditions),
            Err(e) => {
                warn!("Could not regenerate sizes of attachment {}: {}", id, e);
                None
            }
        };

        self.store.clear(id).await?;
        self.hooks.after_restore(id);

        Ok(RestoreOutcome::Restored {
            backup_copied,
            renditions,
        })
    }

    /// Remove the attachment's backup; true if it was removed. Failures are ignored.
    pub async fn delete_backup(&self, attachment: &Attachment) -> bool {
        let _guard = self.locks.acquire(attachment.id).await;
        self.files.delete_backup(attachment).await
    }
}
