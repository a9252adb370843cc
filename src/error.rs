//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare gli errori possibili
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Cosa NON è un errore:
//! - Un fallimento del servizio remoto su una size: viene registrato nel
//!   record come `OptimizationResult::Failure`
//! - Un attachment non idoneo (estensione, dimensione, id mancante): il
//!   risultato è `OptimizeOutcome::Skipped`
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O sul filesystem degli upload
//! - `Image`: Errori di decodifica durante la rigenerazione delle size
//! - `State`: Errori di lettura/scrittura del record store
//! - `Command`: Il tool esterno di ottimizzazione non è avviabile
//! - `UnknownAttachment`: Id non presente nella libreria

/// Custom error types for attachment optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("State file error: {0}")]
    State(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Optimizer command error: {0}")]
    Command(String),

    #[error("Unknown attachment: {0}")]
    UnknownAttachment(u64),
}

pub type Result<T> = std::result::Result<T, OptimizeError>;
