//! # Attachment Optimizer
//!
//! Orchestratore dell'ottimizzazione di un singolo attachment.
//!
//! ## Flusso di esecuzione:
//! 1. Risolve il livello di aggressività (richiesto o default)
//! 2. Scarta attachment non idonei (id, estensione, file mancante, dimensione)
//! 3. Scarta se già ottimizzato con lo stesso livello
//! 4. Notifica `before_optimize`
//! 5. Ottimizza l'originale ("full"), con backup secondo configurazione
//! 6. Se l'originale fallisce: salva il record con status `error` e si ferma
//! 7. Ottimizza ogni rendition in sequenza (size escluse registrate senza chiamate)
//! 8. Finalizza i totali, salva con status `success`, notifica `after_optimize`
//!
//! Le renditions sono processate una alla volta: il record viene
//! ricostruito da zero ad ogni esecuzione e passato di passo in passo.

use crate::accumulator::{self, Fold};
use crate::attachment::{Attachment, Rendition, FULL_SIZE};
use crate::client::{ClientError, OptimizerClient};
use crate::config::OptimizeSettings;
use crate::error::Result;
use crate::file_manager::FileManager;
use crate::hooks::{Hooks, RenditionContext};
use crate::optimizer::locks::AttachmentLocks;
use crate::optimizer::path_resolver::PathResolver;
use crate::record::{optimization_level, OptimizationRecord, OptimizationStatus};
use crate::state::RecordStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why an attachment was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    /// Missing original or unsupported extension
    NotEligible,
    TooLarge,
    /// Already optimized at the requested level
    AlreadyOptimized,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingId => "attachment has no id",
            SkipReason::NotEligible => "file missing or format not supported",
            SkipReason::TooLarge => "file exceeds the maximum optimizable size",
            SkipReason::AlreadyOptimized => "already optimized at this level",
        };
        f.write_str(text)
    }
}

/// Result of one `optimize` call
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeOutcome {
    /// Nothing was written and no notification fired
    Skipped(SkipReason),
    /// The original failed; the record was stored with status `error`
    Failed(OptimizationRecord),
    /// Stored with status `success`
    Optimized(OptimizationRecord),
}

impl OptimizeOutcome {
    /// The persisted record, if any
    pub fn record(&self) -> Option<&OptimizationRecord> {
        match self {
            OptimizeOutcome::Skipped(_) => None,
            OptimizeOutcome::Failed(record) | OptimizeOutcome::Optimized(record) => Some(record),
        }
    }
}

/// Drives every rendition of an attachment through the optimizer client
pub struct AttachmentOptimizer {
    client: Arc<dyn OptimizerClient>,
    store: Arc<dyn RecordStore>,
    hooks: Hooks,
    locks: AttachmentLocks,
}

impl AttachmentOptimizer {
    pub fn new(client: Arc<dyn OptimizerClient>, store: Arc<dyn RecordStore>, hooks: Hooks) -> Self {
        Self {
            client,
            store,
            hooks,
            locks: AttachmentLocks::new(),
        }
    }

    /// Share per-attachment locks with other components (e.g. restoration)
    pub fn with_locks(mut self, locks: AttachmentLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Optimize the original and `renditions` at `level` (or the configured default)
    pub async fn optimize(
        &self,
        attachment: &Attachment,
        level: Option<u8>,
        renditions: &[Rendition],
        settings: &OptimizeSettings,
    ) -> Result<OptimizeOutcome> {
        let level = level.unwrap_or(settings.default_aggressiveness_level);
        let id = attachment.id;

        if !id.is_set() {
            return Ok(OptimizeOutcome::Skipped(SkipReason::MissingId));
        }
        if !FileManager::is_eligible(attachment) {
            debug!("Attachment {} not eligible: {}", id, attachment.file.display());
            return Ok(OptimizeOutcome::Skipped(SkipReason::NotEligible));
        }
        if FileManager::exceeds_size_limit(attachment, settings.max_optimizable_bytes).await {
            debug!("Attachment {} exceeds {} bytes", id, settings.max_optimizable_bytes);
            return Ok(OptimizeOutcome::Skipped(SkipReason::TooLarge));
        }

        let _guard = self.locks.acquire(id).await;

        if self.store.load_status(id).await? == OptimizationStatus::Success {
            let stored = self.store.load(id).await?;
            if optimization_level(stored.as_ref(), settings.default_aggressiveness_level) == level {
                debug!("Attachment {} already optimized at level {}", id, level);
                return Ok(OptimizeOutcome::Skipped(SkipReason::AlreadyOptimized));
            }
        }

        self.hooks.before_optimize(id);

        let record = OptimizationRecord::new(level);
        let response = self
            .client
            .optimize_file(&attachment.file, settings.request_backup_on_optimize, level)
            .await;

        let mut record = match accumulator::fold(record, FULL_SIZE, &attachment.url, &response) {
            Fold::Abort(record) => {
                warn!(
                    "Original of attachment {} could not be optimized: {}",
                    id,
                    record.result(FULL_SIZE).and_then(|r| r.message()).unwrap_or_default()
                );
                self.store.save_outcome(id, &record, OptimizationStatus::Error).await?;
                return Ok(OptimizeOutcome::Failed(record));
            }
            Fold::Continue(record) => record,
        };

        for rendition in renditions.iter().filter(|r| !r.is_full()) {
            record = self.optimize_rendition(record, attachment, rendition, level, settings).await;
        }

        let record = accumulator::finalize(record);
        self.store.save_outcome(id, &record, OptimizationStatus::Success).await?;

        info!(
            "Attachment {}: {} -> {} bytes ({:.2}% saved)",
            id, record.total_original_bytes, record.total_optimized_bytes, record.percent_saved
        );

        self.hooks.after_optimize(id, &record);
        Ok(OptimizeOutcome::Optimized(record))
    }

    async fn optimize_rendition(
        &self,
        record: OptimizationRecord,
        attachment: &Attachment,
        rendition: &Rendition,
        level: u8,
        settings: &OptimizeSettings,
    ) -> OptimizationRecord {
        if settings.is_size_disallowed(&rendition.label) {
            debug!("Size {} of attachment {} is disallowed", rendition.label, attachment.id);
            return accumulator::exclude(record, &rendition.label);
        }

        let Some(path) = PathResolver::rendition_path(&attachment.file, &rendition.file) else {
            warn!(
                "Size {} of attachment {} has an invalid file name: {}",
                rendition.label, attachment.id, rendition.file
            );
            let failure = Err(ClientError::new(format!("Invalid file name: {}", rendition.file)));
            return accumulator::fold(record, &rendition.label, "", &failure).into_record();
        };
        let url = PathResolver::rendition_url(&attachment.url, &rendition.file);

        let response = self.client.optimize_file(&path, false, level).await;
        if let Err(ref e) = response {
            debug!("Size {} of attachment {} failed: {}", rendition.label, attachment.id, e);
        }

        // A rendition failure never aborts; only the original can
        let record = accumulator::fold(record, &rendition.label, &url, &response).into_record();

        let context = RenditionContext {
            attachment_id: attachment.id,
            response: &response,
            path: &path,
            url: &url,
            size_label: &rendition.label,
            aggressiveness: level,
        };
        self.hooks.filter_rendition(record, &context)
    }
}
