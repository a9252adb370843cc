//! # Result Accumulator
//!
//! Folding puro dei risultati per size nel record aggregato. Ogni passo
//! consuma il record e ne restituisce uno nuovo, così la logica si testa
//! senza un'intera esecuzione dell'orchestratore.
//!
//! ## Regole:
//! - Failure su "full": registrata, il loop si interrompe (`Fold::Abort`)
//! - Failure su altre size: registrata solo nello slot della size
//! - Success: registrata e sommata ai totali (campi mancanti = 0)
//! - `finalize`: calcola `percent_saved` dai totali, una volta sola

use crate::attachment::FULL_SIZE;
use crate::client::ClientResult;
use crate::record::{OptimizationRecord, OptimizationResult};

/// Fixed explanation recorded for sizes excluded by configuration
pub const DISALLOWED_SIZE_MESSAGE: &str =
    "This size isn't authorized to be optimized. Update your settings if you want to optimize it.";

/// Result of folding one rendition into the record
#[derive(Debug, Clone, PartialEq)]
pub enum Fold {
    Continue(OptimizationRecord),
    /// The original failed; no further renditions must be processed
    Abort(OptimizationRecord),
}

impl Fold {
    pub fn into_record(self) -> OptimizationRecord {
        match self {
            Fold::Continue(record) | Fold::Abort(record) => record,
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Fold::Abort(_))
    }
}

/// Fold the service answer for `size_label` into the record
pub fn fold(
    mut record: OptimizationRecord,
    size_label: &str,
    file_url: &str,
    response: &ClientResult,
) -> Fold {
    match response {
        Err(failure) => {
            record.per_rendition.insert(
                size_label.to_string(),
                OptimizationResult::Failure {
                    error: failure.message.clone(),
                },
            );

            if size_label == FULL_SIZE {
                Fold::Abort(record)
            } else {
                Fold::Continue(record)
            }
        }
        Ok(response) => {
            let original_size = response.original_size.unwrap_or(0);
            let optimized_size = response.new_size.unwrap_or(0);

            record.per_rendition.insert(
                size_label.to_string(),
                OptimizationResult::Success {
                    file_url: file_url.to_string(),
                    original_size,
                    optimized_size,
                    percent: response.percent.unwrap_or(0.0),
                },
            );
            record.total_original_bytes += original_size;
            record.total_optimized_bytes += optimized_size;

            Fold::Continue(record)
        }
    }
}

/// Record a rendition excluded by policy; it never reaches the service
pub fn exclude(mut record: OptimizationRecord, size_label: &str) -> OptimizationRecord {
    record.per_rendition.insert(
        size_label.to_string(),
        OptimizationResult::Skipped {
            reason: DISALLOWED_SIZE_MESSAGE.to_string(),
        },
    );
    record
}

/// Compute the aggregate percentage from the final totals
pub fn finalize(mut record: OptimizationRecord) -> OptimizationRecord {
    record.percent_saved = percent_saved(record.total_original_bytes, record.total_optimized_bytes);
    record
}

/// `100 * (original - optimized) / original`, rounded half-up to 2 decimals; 0 when original is 0
pub fn percent_saved(original_bytes: u64, optimized_bytes: u64) -> f64 {
    if original_bytes == 0 {
        return 0.0;
    }

    hundredths_half_up(original_bytes, optimized_bytes) as f64 / 100.0
}

/// `floor(10_000 * saved / original + 1/2)` in exact integer arithmetic
fn hundredths_half_up(original_bytes: u64, optimized_bytes: u64) -> i128 {
    let original = i128::from(original_bytes);
    let saved = original - i128::from(optimized_bytes);
    (20_000 * saved + original).div_euclid(2 * original)
}
