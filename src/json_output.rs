//! # JSON Output Module
//!
//! Output strutturato in JSON (una riga per evento) per l'uso programmatico
//! della CLI con `--json`.
//!
//! ## Tipi di messaggi:
//! - `optimized`: Attachment ottimizzato, con il record salvato
//! - `failed`: L'originale è stato rifiutato dal servizio
//! - `skipped`: Attachment non idoneo o già ottimizzato
//! - `restored`: Attachment ripristinato dal backup
//! - `backup_deleted`: Backup rimosso
//! - `status`: Riepilogo di un attachment
//! - `complete`: Fine di un run con statistiche finali
//! - `error`: Errore durante l'elaborazione

use crate::optimizer::{OptimizeOutcome, RestoreOutcome};
use crate::progress::OptimizationStats;
use crate::record::{AttachmentSummary, OptimizationRecord};
use serde::Serialize;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Optimized {
        attachment_id: u64,
        record: OptimizationRecord,
    },
    Failed {
        attachment_id: u64,
        record: OptimizationRecord,
    },
    Skipped {
        attachment_id: u64,
        reason: String,
    },
    Restored {
        attachment_id: u64,
        backup_copied: bool,
        renditions_regenerated: Option<usize>,
    },
    NoBackup {
        attachment_id: u64,
    },
    BackupDeleted {
        attachment_id: u64,
        /// False when there was no backup or it could not be removed
        deleted: bool,
    },
    Status(AttachmentSummary),
    Complete(OptimizationStats),
    Error {
        message: String,
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn from_optimize(attachment_id: u64, outcome: &OptimizeOutcome) -> Self {
        match outcome {
            OptimizeOutcome::Optimized(record) => Self::Optimized {
                attachment_id,
                record: record.clone(),
            },
            OptimizeOutcome::Failed(record) => Self::Failed {
                attachment_id,
                record: record.clone(),
            },
            OptimizeOutcome::Skipped(reason) => Self::Skipped {
                attachment_id,
                reason: reason.to_string(),
            },
        }
    }

    pub fn from_restore(attachment_id: u64, outcome: &RestoreOutcome) -> Self {
        match outcome {
            RestoreOutcome::NoBackup => Self::NoBackup { attachment_id },
            RestoreOutcome::Restored {
                backup_copied,
                renditions,
            } => Self::Restored {
                attachment_id,
                backup_copied: *backup_copied,
                renditions_regenerated: renditions.as_ref().map(Vec::len),
            },
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::SkipReason;

    #[test]
    fn test_skipped_message_shape() {
        let message = JsonMessage::from_optimize(7, &OptimizeOutcome::Skipped(SkipReason::TooLarge));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "skipped");
        assert_eq!(json["attachment_id"], 7);
        assert_eq!(json["reason"], "file exceeds the maximum optimizable size");
    }

    #[test]
    fn test_restored_message_counts_renditions() {
        let outcome = RestoreOutcome::Restored {
            backup_copied: false,
            renditions: None,
        };
        let json = serde_json::to_value(JsonMessage::from_restore(3, &outcome)).unwrap();
        assert_eq!(json["type"], "restored");
        assert_eq!(json["backup_copied"], false);
        assert!(json["renditions_regenerated"].is_null());
    }

    #[test]
    fn test_complete_message_flattens_stats() {
        let json = serde_json::to_value(JsonMessage::Complete(OptimizationStats::new())).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["attachments_processed"], 0);
    }
}
