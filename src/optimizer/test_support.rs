//! Fakes shared by the optimizer and restoration tests.

use crate::attachment::{Attachment, AttachmentId, Rendition};
use crate::client::{ClientResult, OptimizerClient, OptimizerResponse};
use crate::error::Result;
use crate::file_manager::FileManager;
use crate::hooks::OptimizationObserver;
use crate::record::OptimizationRecord;
use crate::regenerate::RenditionGenerator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Upload root with one attachment (id 42) and two renditions under `2024/05/`
pub struct Fixture {
    _dir: TempDir,
    pub root: PathBuf,
    pub files: FileManager,
    pub attachment: Attachment,
}

impl Fixture {
    pub fn new(file_name: &str, bytes: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        let original = root.join("2024/05").join(file_name);
        std::fs::create_dir_all(original.parent().unwrap()).unwrap();
        std::fs::write(&original, vec![1u8; bytes]).unwrap();

        let path = Path::new(file_name);
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let ext = path.extension().unwrap().to_string_lossy().to_string();
        let renditions = vec![
            Rendition::new("thumbnail", format!("{}-150x150.{}", stem, ext)),
            Rendition::new("medium", format!("{}-300x200.{}", stem, ext)),
        ];
        for rendition in &renditions {
            std::fs::write(original.parent().unwrap().join(&rendition.file), vec![1u8; 10]).unwrap();
        }

        let attachment = Attachment::new(
            AttachmentId(42),
            &original,
            format!("https://example.com/uploads/2024/05/{}", file_name),
        )
        .with_renditions(renditions);

        Self {
            files: FileManager::new(&root),
            root,
            _dir: dir,
            attachment,
        }
    }

    pub fn write_backup(&self, contents: &[u8]) -> PathBuf {
        let backup = self.files.backup_path_for(&self.attachment.file).unwrap();
        std::fs::create_dir_all(backup.parent().unwrap()).unwrap();
        std::fs::write(&backup, contents).unwrap();
        backup
    }
}

/// Answers per file name; unscripted files succeed with 100 -> 50 bytes
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<HashMap<String, ClientResult>>,
    calls: Mutex<Vec<(PathBuf, bool, u8)>>,
}

impl ScriptedClient {
    pub fn respond(&self, file_name: &str, response: ClientResult) {
        self.responses.lock().unwrap().insert(file_name.to_string(), response);
    }

    pub fn called_files(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _, _)| path.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    pub fn backup_flags(&self) -> Vec<bool> {
        self.calls.lock().unwrap().iter().map(|(_, backup, _)| *backup).collect()
    }

    pub fn levels(&self) -> Vec<u8> {
        self.calls.lock().unwrap().iter().map(|(_, _, level)| *level).collect()
    }
}

#[async_trait]
impl OptimizerClient for ScriptedClient {
    async fn optimize_file(&self, path: &Path, request_backup: bool, aggressiveness: u8) -> ClientResult {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), request_backup, aggressiveness));

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.responses
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_else(|| Ok(OptimizerResponse::new(100, 50, 50.0)))
    }
}

/// Records notifications as `event:id`
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: &str, id: AttachmentId) {
        self.events.lock().unwrap().push(format!("{}:{}", event, id));
    }
}

impl OptimizationObserver for RecordingObserver {
    fn before_optimize(&self, id: AttachmentId) {
        self.push("before_optimize", id);
    }

    fn after_optimize(&self, id: AttachmentId, _record: &OptimizationRecord) {
        self.push("after_optimize", id);
    }

    fn before_restore(&self, id: AttachmentId) {
        self.push("before_restore", id);
    }

    fn after_restore(&self, id: AttachmentId) {
        self.push("after_restore", id);
    }
}

/// Returns the attachment's current renditions and records each call's upload-hook flag
#[derive(Default)]
pub struct RecordingGenerator {
    calls: Mutex<Vec<bool>>,
}

impl RecordingGenerator {
    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenditionGenerator for RecordingGenerator {
    async fn regenerate(&self, attachment: &Attachment, optimize_on_upload: bool) -> Result<Vec<Rendition>> {
        self.calls.lock().unwrap().push(optimize_on_upload);
        Ok(attachment.renditions.clone())
    }
}
