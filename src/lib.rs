//! # Media Library Optimizer
//!
//! Ottimizzazione delle immagini di una media library tramite un servizio
//! di compressione esterno, con risultati per size e ripristino dal backup.
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione e `OptimizeSettings` per ogni chiamata
//! - `error`: Tipi di errore custom
//! - `attachment`: Attachment, renditions e libreria JSON
//! - `record`: Record aggregato, risultati per size, status
//! - `accumulator`: Folding dei risultati nel record
//! - `file_manager`: Idoneità, limiti di dimensione e backup
//! - `state`: Record store (file JSON o in memoria)
//! - `hooks`: Observer e filtri sulle renditions
//! - `client`: Contratto del servizio di ottimizzazione
//! - `optimizer`: Orchestratore e restoration manager
//! - `regenerate`: Rigenerazione delle size dopo un restore
//! - `progress` / `json_output`: Output della CLI
//!
//! ## Utilizzo:
//! ```ignore
//! use media_library_optimizer::{AttachmentOptimizer, Config, Hooks, MemoryStore};
//!
//! let config = Config::default();
//! let optimizer = AttachmentOptimizer::new(client, Arc::new(MemoryStore::new()), Hooks::new());
//! let outcome = optimizer
//!     .optimize(&attachment, None, &attachment.renditions, &config.optimize_settings())
//!     .await?;
//! ```

pub mod accumulator;
pub mod attachment;
pub mod client;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod hooks;
pub mod json_output;
pub mod optimizer;
pub mod progress;
pub mod record;
pub mod regenerate;
pub mod state;

pub use attachment::{Attachment, AttachmentId, AttachmentLibrary, Rendition, FULL_SIZE};
pub use client::{ClientError, CommandOptimizerClient, OptimizerClient, OptimizerResponse};
pub use config::{Config, OptimizeSettings};
pub use error::OptimizeError;
pub use file_manager::FileManager;
pub use hooks::{Hooks, OptimizationObserver, RenditionContext, RenditionFilter, TracingObserver};
pub use optimizer::{AttachmentOptimizer, OptimizeOutcome, RestorationManager, RestoreOutcome, SkipReason};
pub use record::{AttachmentSummary, OptimizationRecord, OptimizationResult, OptimizationStatus};
pub use regenerate::{ImageRenditionGenerator, RenditionGenerator};
pub use state::{JsonStateStore, MemoryStore, RecordStore};
