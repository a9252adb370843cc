//! # Optimization Record Types
//!
//! Il record aggregato di un attachment: livello di aggressività, totali in
//! byte, percentuale risparmiata e il risultato per ogni size.
//!
//! ## Esempio struttura record:
//! ```json
//! {
//!   "aggressiveness_level": 1,
//!   "total_original_bytes": 3000,
//!   "total_optimized_bytes": 1400,
//!   "percent_saved": 53.33,
//!   "per_rendition": {
//!     "full": { "status": "success", "file_url": "...", "original_size": 1000, "optimized_size": 400, "percent": 60.0 },
//!     "thumbnail": { "status": "failure", "error": "Timeout" }
//!   }
//! }
//! ```

use crate::attachment::FULL_SIZE;
use crate::file_manager::FileManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Outcome of a single rendition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizationResult {
    Success {
        file_url: String,
        original_size: u64,
        optimized_size: u64,
        percent: f64,
    },
    Failure {
        error: String,
    },
    /// Excluded by policy, never sent to the service
    Skipped {
        reason: String,
    },
}

impl OptimizationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Human-readable message for failures and exclusions
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
            Self::Skipped { reason } => Some(reason),
        }
    }
}

/// Aggregate record for one attachment, rebuilt from scratch on every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub aggressiveness_level: u8,
    pub total_original_bytes: u64,
    pub total_optimized_bytes: u64,
    pub percent_saved: f64,
    pub per_rendition: BTreeMap<String, OptimizationResult>,
}

impl OptimizationRecord {
    pub fn new(aggressiveness_level: u8) -> Self {
        Self {
            aggressiveness_level,
            total_original_bytes: 0,
            total_optimized_bytes: 0,
            percent_saved: 0.0,
            per_rendition: BTreeMap::new(),
        }
    }

    pub fn result(&self, size_label: &str) -> Option<&OptimizationResult> {
        self.per_rendition.get(size_label)
    }

    /// Number of generated sizes (not "full") that were optimized
    pub fn optimized_sizes_count(&self) -> usize {
        self.per_rendition
            .iter()
            .filter(|(label, result)| label.as_str() != FULL_SIZE && result.is_success())
            .count()
    }

    /// True when the original itself could not be optimized
    pub fn has_error(&self) -> bool {
        matches!(self.result(FULL_SIZE), Some(OptimizationResult::Failure { .. }))
    }

    pub fn bytes_saved(&self) -> u64 {
        self.total_original_bytes.saturating_sub(self.total_optimized_bytes)
    }
}

/// Persisted optimization status of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStatus {
    #[default]
    None,
    Success,
    Error,
}

impl OptimizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Self::None),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown optimization status: {}", other)),
        }
    }
}

/// Level an attachment was optimized with, or the configured default when unknown
pub fn optimization_level(record: Option<&OptimizationRecord>, default_level: u8) -> u8 {
    record
        .map(|record| record.aggressiveness_level)
        .unwrap_or(default_level)
}

/// Read-only view of an attachment's optimization state, used for display
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentSummary {
    pub attachment_id: u64,
    pub status: OptimizationStatus,
    pub is_optimized: bool,
    pub has_error: bool,
    pub has_backup: bool,
    pub optimization_level: u8,
    pub optimized_sizes_count: usize,
    pub original_size: String,
    pub percent_saved: f64,
    pub error: Option<String>,
}

impl AttachmentSummary {
    /// `file_size` is the size on disk, used when the record has no "full" entry
    pub fn new(
        attachment_id: u64,
        status: OptimizationStatus,
        record: Option<&OptimizationRecord>,
        has_backup: bool,
        default_level: u8,
        file_size: u64,
    ) -> Self {
        let original_size = match record.and_then(|r| r.result(FULL_SIZE)) {
            Some(OptimizationResult::Success { original_size, .. }) if *original_size > 0 => *original_size,
            _ => file_size,
        };

        Self {
            attachment_id,
            status,
            is_optimized: status == OptimizationStatus::Success,
            has_error: record.map(|r| r.has_error()).unwrap_or(false),
            has_backup,
            optimization_level: optimization_level(record, default_level),
            optimized_sizes_count: record.map(|r| r.optimized_sizes_count()).unwrap_or(0),
            original_size: FileManager::format_size(original_size),
            percent_saved: record.map(|r| r.percent_saved).unwrap_or(0.0),
            error: record
                .and_then(|r| r.result(FULL_SIZE))
                .and_then(|r| r.message())
                .map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(original_size: u64, optimized_size: u64) -> OptimizationResult {
        OptimizationResult::Success {
            file_url: "https://example.com/a.jpg".to_string(),
            original_size,
            optimized_size,
            percent: 0.0,
        }
    }

    #[test]
    fn test_has_error_follows_full_size() {
        let mut record = OptimizationRecord::new(1);
        assert!(!record.has_error());

        record.per_rendition.insert(FULL_SIZE.to_string(), success(10, 5));
        assert!(!record.has_error());

        record.per_rendition.insert(
            FULL_SIZE.to_string(),
            OptimizationResult::Failure { error: "quota exceeded".to_string() },
        );
        assert!(record.has_error());
    }

    #[test]
    fn test_optimized_sizes_count_ignores_full_and_failures() {
        let mut record = OptimizationRecord::new(1);
        record.per_rendition.insert(FULL_SIZE.to_string(), success(10, 5));
        record.per_rendition.insert("thumbnail".to_string(), success(4, 2));
        record.per_rendition.insert(
            "medium".to_string(),
            OptimizationResult::Failure { error: "boom".to_string() },
        );
        record.per_rendition.insert(
            "large".to_string(),
            OptimizationResult::Skipped { reason: "excluded".to_string() },
        );

        assert_eq!(record.optimized_sizes_count(), 1);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("".parse::<OptimizationStatus>().unwrap(), OptimizationStatus::None);
        assert_eq!("success".parse::<OptimizationStatus>().unwrap(), OptimizationStatus::Success);
        assert_eq!("error".parse::<OptimizationStatus>().unwrap(), OptimizationStatus::Error);
        assert!("done".parse::<OptimizationStatus>().is_err());
    }

    #[test]
    fn test_result_serialization_is_tagged() {
        let json = serde_json::to_value(OptimizationResult::Skipped { reason: "no".to_string() }).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "no");
    }

    #[test]
    fn test_summary_falls_back_to_file_size() {
        let summary = AttachmentSummary::new(3, OptimizationStatus::None, None, false, 1, 2048);
        assert_eq!(summary.original_size, "2.00 KB");
        assert_eq!(summary.optimization_level, 1);
        assert!(!summary.is_optimized);

        let mut record = OptimizationRecord::new(2);
        record.per_rendition.insert(FULL_SIZE.to_string(), success(1024, 512));
        let summary = AttachmentSummary::new(3, OptimizationStatus::Success, Some(&record), true, 1, 512);
        assert_eq!(summary.original_size, "1.00 KB");
        assert_eq!(summary.optimization_level, 2);
        assert!(summary.is_optimized);
    }
}
