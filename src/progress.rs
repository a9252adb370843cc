//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di un run
//! su più attachment.
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar principale
//! - `OptimizationStats`: Traccia statistiche cumulative
//!
//! ## Statistiche tracciate:
//! - **attachments_processed**: Totale attachment elaborati
//! - **attachments_optimized**: Attachment salvati con status `success`
//! - **attachments_skipped**: Attachment non idonei o già ottimizzati
//! - **attachments_failed**: Originale rifiutato dal servizio
//! - **total_original_size** / **total_bytes_saved**: Somme dai record
//!
//! ## Esempio:
//! ```ignore
//! let progress = ProgressManager::new(ids.len() as u64);
//! let mut stats = OptimizationStats::new();
//! stats.add_optimized(&record);
//! progress.update("42: 53.33% saved");
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::FileManager;
use crate::record::OptimizationRecord;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Manages progress reporting for a batch of attachments
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress bar that draws nothing (JSON mode)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for a batch run
#[derive(Debug, Default, Clone, Serialize)]
pub struct OptimizationStats {
    pub attachments_processed: usize,
    pub attachments_optimized: usize,
    pub attachments_skipped: usize,
    pub attachments_failed: usize,
    pub total_original_size: u64,
    pub total_bytes_saved: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_optimized(&mut self, record: &OptimizationRecord) {
        self.attachments_processed += 1;
        self.attachments_optimized += 1;
        self.total_original_size += record.total_original_bytes;
        self.total_bytes_saved += record.bytes_saved();
    }

    pub fn add_skipped(&mut self) {
        self.attachments_processed += 1;
        self.attachments_skipped += 1;
    }

    pub fn add_failed(&mut self) {
        self.attachments_processed += 1;
        self.attachments_failed += 1;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} | Optimized: {} | Skipped: {} | Failed: {} | Total saved: {} ({:.2}%)",
            self.attachments_processed,
            self.attachments_optimized,
            self.attachments_skipped,
            self.attachments_failed,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}
