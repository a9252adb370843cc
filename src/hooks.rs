//! # Notification Hooks
//!
//! Collaboratori iniettati nell'orchestratore e nel restoration manager:
//! - `OptimizationObserver`: notifiche fire-and-forget (before/after optimize, before/after restore)
//! - `RenditionFilter`: punto di estensione che può trasformare il record dopo ogni size

use crate::attachment::AttachmentId;
use crate::client::ClientResult;
use crate::record::OptimizationRecord;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Observational callbacks. All methods default to no-ops.
pub trait OptimizationObserver: Send + Sync {
    fn before_optimize(&self, _id: AttachmentId) {}

    fn after_optimize(&self, _id: AttachmentId, _record: &OptimizationRecord) {}

    fn before_restore(&self, _id: AttachmentId) {}

    fn after_restore(&self, _id: AttachmentId) {}
}

/// Everything known about a rendition right after it was folded
#[derive(Debug, Clone, Copy)]
pub struct RenditionContext<'a> {
    pub attachment_id: AttachmentId,
    pub response: &'a ClientResult,
    pub path: &'a Path,
    pub url: &'a str,
    pub size_label: &'a str,
    pub aggressiveness: u8,
}

/// Value-transforming extension point run after each rendition fold
pub trait RenditionFilter: Send + Sync {
    fn filter(&self, record: OptimizationRecord, context: &RenditionContext<'_>) -> OptimizationRecord;
}

/// Registered observers and filters
#[derive(Clone, Default)]
pub struct Hooks {
    observers: Vec<Arc<dyn OptimizationObserver>>,
    filters: Vec<Arc<dyn RenditionFilter>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn OptimizationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn RenditionFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn before_optimize(&self, id: AttachmentId) {
        self.observers.iter().for_each(|o| o.before_optimize(id));
    }

    pub fn after_optimize(&self, id: AttachmentId, record: &OptimizationRecord) {
        self.observers.iter().for_each(|o| o.after_optimize(id, record));
    }

    pub fn before_restore(&self, id: AttachmentId) {
        self.observers.iter().for_each(|o| o.before_restore(id));
    }

    pub fn after_restore(&self, id: AttachmentId) {
        self.observers.iter().for_each(|o| o.after_restore(id));
    }

    /// Run every filter in registration order; each one's output feeds the next
    pub fn filter_rendition(
        &self,
        record: OptimizationRecord,
        context: &RenditionContext<'_>,
    ) -> OptimizationRecord {
        self.filters
            .iter()
            .fold(record, |record, filter| filter.filter(record, context))
    }
}

/// Logs every notification
pub struct TracingObserver;

impl OptimizationObserver for TracingObserver {
    fn before_optimize(&self, id: AttachmentId) {
        info!("Optimizing attachment {}", id);
    }

    fn after_optimize(&self, id: AttachmentId, record: &OptimizationRecord) {
        info!(
            "Attachment {} optimized: {} sizes, {:.2}% saved",
            id,
            record.per_rendition.len(),
            record.percent_saved
        );
    }

    fn before_restore(&self, id: AttachmentId) {
        info!("Restoring attachment {}", id);
    }

    fn after_restore(&self, id: AttachmentId) {
        info!("Attachment {} restored from backup", id);
    }
}
