//! # Optimizer Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `attachment_optimizer`: Orchestratore dell'ottimizzazione di un attachment
//! - `restore`: Ripristino dal backup
//! - `locks`: Serializzazione per attachment id
//! - `path_resolver`: Calcolo path/URL delle renditions

pub mod attachment_optimizer;
pub mod locks;
pub mod path_resolver;
pub mod restore;

#[cfg(test)]
pub(crate) mod test_support;

pub use attachment_optimizer::{AttachmentOptimizer, OptimizeOutcome, SkipReason};
pub use locks::AttachmentLocks;
pub use path_resolver::PathResolver;
pub use restore::{RestorationManager, RestoreOutcome};
