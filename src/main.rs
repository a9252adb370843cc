//! # Media Library Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione e composizione dei collaboratori
//!   (client, store, hooks, generatore di renditions)
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-library-optimizer optimize 42 43 --level 2
//! media-library-optimizer restore 42
//! media-library-optimizer status 42 --json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use media_library_optimizer::config::MAX_AGGRESSIVENESS_LEVEL;
use media_library_optimizer::json_output::JsonMessage;
use media_library_optimizer::progress::{OptimizationStats, ProgressManager};
use media_library_optimizer::{
    AttachmentId, AttachmentLibrary, AttachmentOptimizer, AttachmentSummary, CommandOptimizerClient,
    Config, FileManager, Hooks, ImageRenditionGenerator, JsonStateStore, OptimizeOutcome,
    RecordStore, RestorationManager, RestoreOutcome, TracingObserver,
};

#[derive(Parser)]
#[command(name = "media-library-optimizer")]
#[command(about = "Optimize media-library images and restore them from backup")]
struct Args {
    /// Configuration file (default: ~/.media-optimizer/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output one JSON object per event
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize the original and every size of the given attachments
    Optimize {
        ids: Vec<u64>,

        /// Aggressiveness level (0-2); defaults to the configured level
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=MAX_AGGRESSIVENESS_LEVEL as i64))]
        level: Option<u8>,
    },
    /// Restore an attachment from its backup
    Restore { id: u64 },
    /// Delete an attachment's backup
    DeleteBackup { id: u64 },
    /// Show an attachment's optimization state
    Status { id: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so JSON output stays clean
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = match args.config {
        Some(ref path) => path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::from_file(&config_path).await?;

    if !config.upload_root.is_dir() {
        return Err(anyhow::anyhow!(
            "Upload root does not exist: {}",
            config.upload_root.display()
        ));
    }

    let result = run(&args, &config).await;
    if let Err(ref e) = result {
        if args.json {
            JsonMessage::error(e.to_string(), e.chain().nth(1).map(|s| s.to_string())).emit();
        }
    }
    result
}

async fn run(args: &Args, config: &Config) -> Result<()> {
    let files = FileManager::new(&config.upload_root);
    let store: Arc<dyn RecordStore> = Arc::new(JsonStateStore::open(&config.state_file_path()).await?);
    let mut library = AttachmentLibrary::load(&config.library_file_path(), &config.upload_root).await?;
    let hooks = Hooks::new().with_observer(Arc::new(TracingObserver));

    match args.command {
        Command::Optimize { ref ids, level } => {
            let command = config.optimizer_command.clone().ok_or_else(|| {
                anyhow::anyhow!("No optimizer_command configured")
            })?;
            let client = Arc::new(CommandOptimizerClient::new(command, files));
            let optimizer = AttachmentOptimizer::new(client, store, hooks);
            optimize(&optimizer, &library, ids, level, config, args.json).await
        }
        Command::Restore { id } => {
            let attachment = library.get(AttachmentId(id))?;
            let generator = Arc::new(ImageRenditionGenerator::new(config.rendition_sizes.clone()));
            let manager = RestorationManager::new(files, store, generator, hooks);

            let outcome = manager.restore(&attachment).await?;
            if let RestoreOutcome::Restored {
                renditions: Some(ref renditions),
                ..
            } = outcome
            {
                library.set_renditions(attachment.id, renditions.clone())?;
                library.save().await?;
            }

            if args.json {
                JsonMessage::from_restore(id, &outcome).emit();
            } else {
                match outcome {
                    RestoreOutcome::NoBackup => info!("Attachment {} has no backup", id),
                    RestoreOutcome::Restored { backup_copied, .. } => {
                        info!("Attachment {} restored (backup copied: {})", id, backup_copied)
                    }
                }
            }
            Ok(())
        }
        Command::DeleteBackup { id } => {
            let attachment = library.get(AttachmentId(id))?;
            let deleted = files.delete_backup(&attachment).await;

            if args.json {
                JsonMessage::BackupDeleted {
                    attachment_id: id,
                    deleted,
                }
                .emit();
            } else if deleted {
                info!("Backup of attachment {} deleted", id);
            } else {
                info!("Attachment {} has no backup to delete", id);
            }
            Ok(())
        }
        Command::Status { id } => {
            let attachment = library.get(AttachmentId(id))?;
            let status = store.load_status(attachment.id).await?;
            let record = store.load(attachment.id).await?;
            let summary = AttachmentSummary::new(
                id,
                status,
                record.as_ref(),
                files.has_backup(&attachment),
                config.default_aggressiveness_level,
                FileManager::file_size(&attachment.file).await,
            );

            if args.json {
                JsonMessage::Status(summary).emit();
            } else {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            Ok(())
        }
    }
}

async fn optimize(
    optimizer: &AttachmentOptimizer,
    library: &AttachmentLibrary,
    ids: &[u64],
    level: Option<u8>,
    config: &Config,
    json: bool,
) -> Result<()> {
    let settings = config.optimize_settings();
    let progress = if json {
        ProgressManager::hidden()
    } else {
        ProgressManager::new(ids.len() as u64)
    };
    let mut stats = OptimizationStats::new();

    for &id in ids {
        let attachment = match library.get(AttachmentId(id)) {
            Ok(attachment) => attachment,
            Err(e) => {
                error!("{}", e);
                stats.add_failed();
                progress.update(&format!("❌ {}: unknown", id));
                continue;
            }
        };

        let outcome = optimizer
            .optimize(&attachment, level, &attachment.renditions, &settings)
            .await?;

        let message = match outcome {
            OptimizeOutcome::Optimized(ref record) => {
                stats.add_optimized(record);
                format!("✅ {}: {:.2}% saved", id, record.percent_saved)
            }
            OptimizeOutcome::Failed(_) => {
                stats.add_failed();
                format!("❌ {}: error", id)
            }
            OptimizeOutcome::Skipped(reason) => {
                stats.add_skipped();
                format!("⏩ {}: {}", id, reason)
            }
        };

        if json {
            JsonMessage::from_optimize(id, &outcome).emit();
        }
        progress.update(&message);
    }

    progress.finish(&stats.format_summary());

    if json {
        JsonMessage::Complete(stats).emit();
    } else {
        info!("=== Optimization Complete ===");
        info!("{}", stats.format_summary());
    }

    Ok(())
}
