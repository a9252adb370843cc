//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di ottimizzazione
//! - Fornisce validazione dei parametri
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Costruisce `OptimizeSettings`, il valore esplicito passato
//!   all'orchestratore ad ogni chiamata
//!
//! ## Parametri di configurazione:
//! - `upload_root`: Root degli upload, contiene anche `backup/`
//! - `default_aggressiveness_level`: Livello di default (0-2, default: 1)
//! - `request_backup_on_optimize`: Backup dell'originale prima dell'ottimizzazione (default: false)
//! - `disallowed_size_labels`: Size da non ottimizzare
//! - `network_wide_install`: Se true le size escluse vengono ottimizzate comunque
//! - `max_optimizable_bytes`: Dimensione massima dell'originale (default: 5 MB)
//! - `optimizer_command`: Programma esterno usato come client di ottimizzazione
//! - `rendition_sizes`: Size rigenerate dopo un restore
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     default_aggressiveness_level: 2,
//!     request_backup_on_optimize: true,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Highest aggressiveness level the service understands
pub const MAX_AGGRESSIVENESS_LEVEL: u8 = 2;

/// Default size limit of an optimizable original (5 MB)
pub const DEFAULT_MAX_OPTIMIZABLE_BYTES: u64 = 5 * 1024 * 1024;

/// External optimizer program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

/// A size regenerated from the original after a restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenditionSize {
    pub label: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub crop: bool,
}

impl RenditionSize {
    pub fn new(label: &str, width: u32, height: u32, crop: bool) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
            crop,
        }
    }
}

/// Configuration for attachment optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upload root; backups live under `<upload_root>/backup`
    pub upload_root: PathBuf,
    /// State file (relative paths resolve under the upload root)
    pub state_file: PathBuf,
    /// Attachment library file (relative paths resolve under the upload root)
    pub library_file: PathBuf,
    /// Level used when none is requested
    pub default_aggressiveness_level: u8,
    /// Ask the client to back up originals before optimizing them
    pub request_backup_on_optimize: bool,
    /// Size labels never sent to the optimizer
    pub disallowed_size_labels: BTreeSet<String>,
    /// Network-wide installs optimize every size
    pub network_wide_install: bool,
    /// Originals larger than this are not optimized
    pub max_optimizable_bytes: u64,
    /// Program used as optimizer client
    pub optimizer_command: Option<CommandConfig>,
    /// Sizes regenerated after a restore
    pub rendition_sizes: Vec<RenditionSize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from("uploads"),
            state_file: PathBuf::from("optimizer-state.json"),
            library_file: PathBuf::from("library.json"),
            default_aggressiveness_level: 1,
            request_backup_on_optimize: false,
            disallowed_size_labels: BTreeSet::new(),
            network_wide_install: false,
            max_optimizable_bytes: DEFAULT_MAX_OPTIMIZABLE_BYTES,
            optimizer_command: None,
            rendition_sizes: vec![
                RenditionSize::new("thumbnail", 150, 150, true),
                RenditionSize::new("medium", 300, 300, false),
                RenditionSize::new("large", 1024, 1024, false),
            ],
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.default_aggressiveness_level > MAX_AGGRESSIVENESS_LEVEL {
            return Err(anyhow::anyhow!(
                "Aggressiveness level must be between 0 and {}",
                MAX_AGGRESSIVENESS_LEVEL
            ));
        }

        if self.max_optimizable_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum optimizable size must be greater than 0"));
        }

        if let Some(ref command) = self.optimizer_command {
            if command.program.as_os_str().is_empty() {
                return Err(anyhow::anyhow!("Optimizer command program is empty"));
            }
            if command.timeout_secs == 0 {
                return Err(anyhow::anyhow!("Optimizer command timeout must be greater than 0"));
            }
        }

        for size in &self.rendition_sizes {
            if size.width == 0 || size.height == 0 {
                return Err(anyhow::anyhow!("Rendition size {} has a zero dimension", size.label));
            }
        }

        Ok(())
    }

    /// Default location: `~/.media-optimizer/config.json`
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
            .join(".media-optimizer")
            .join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.upload_root.join(&self.state_file)
    }

    pub fn library_file_path(&self) -> PathBuf {
        self.upload_root.join(&self.library_file)
    }

    /// Settings snapshot handed to the orchestrator
    pub fn optimize_settings(&self) -> OptimizeSettings {
        OptimizeSettings::from(self)
    }
}

/// Read-only configuration an optimization run sees
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeSettings {
    pub default_aggressiveness_level: u8,
    pub request_backup_on_optimize: bool,
    pub disallowed_size_labels: BTreeSet<String>,
    pub network_wide_install: bool,
    pub max_optimizable_bytes: u64,
}

impl OptimizeSettings {
    /// Excluded sizes are only honored outside network-wide installs
    pub fn is_size_disallowed(&self, size_label: &str) -> bool {
        !self.network_wide_install && self.disallowed_size_labels.contains(size_label)
    }
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Config::default().optimize_settings()
    }
}

impl From<&Config> for OptimizeSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_aggressiveness_level: config.default_aggressiveness_level,
            request_backup_on_optimize: config.request_backup_on_optimize,
            disallowed_size_labels: config.disallowed_size_labels.clone(),
            network_wide_install: config.network_wide_install,
            max_optimizable_bytes: config.max_optimizable_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.default_aggressiveness_level = 3;
        assert!(config.validate().is_err());

        config.default_aggressiveness_level = 2;
        config.max_optimizable_bytes = 0;
        assert!(config.validate().is_err());

        config.max_optimizable_bytes = 1024;
        config.optimizer_command = Some(CommandConfig {
            program: PathBuf::from("optimizer"),
            args: Vec::new(),
            timeout_secs: 0,
        });
        assert!(config.validate().is_err());

        config.optimizer_command = None;
        config.rendition_sizes.push(RenditionSize::new("broken", 0, 10, false));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_aggressiveness_level, 1);
        assert!(!config.request_backup_on_optimize);
        assert!(!config.network_wide_install);
        assert_eq!(config.max_optimizable_bytes, 5_242_880);
        assert_eq!(config.rendition_sizes.len(), 3);
    }

    #[test]
    fn test_disallowed_sizes_respect_network_install() {
        let mut config = Config::default();
        config.disallowed_size_labels.insert("large".to_string());

        let settings = config.optimize_settings();
        assert!(settings.is_size_disallowed("large"));
        assert!(!settings.is_size_disallowed("medium"));

        config.network_wide_install = true;
        assert!(!config.optimize_settings().is_size_disallowed("large"));
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut original_config = Config {
            upload_root: temp_dir.path().to_path_buf(),
            default_aggressiveness_level: 2,
            request_backup_on_optimize: true,
            max_optimizable_bytes: 1000,
            ..Default::default()
        };
        original_config.disallowed_size_labels.insert("thumbnail".to_string());

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.default_aggressiveness_level, 2);
        assert!(loaded_config.request_backup_on_optimize);
        assert_eq!(loaded_config.max_optimizable_bytes, 1000);
        assert!(loaded_config.disallowed_size_labels.contains("thumbnail"));
        assert_eq!(loaded_config.state_file_path(), temp_dir.path().join("optimizer-state.json"));
    }

    #[tokio::test]
    async fn test_missing_config_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("nope.json")).await.unwrap();
        assert_eq!(config.default_aggressiveness_level, 1);
    }

    #[tokio::test]
    async fn test_partial_config_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "network_wide_install": true }"#).unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert!(config.network_wide_install);
        assert_eq!(config.max_optimizable_bytes, DEFAULT_MAX_OPTIMIZABLE_BYTES);
    }
}
