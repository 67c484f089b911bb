/// Artifact sinks ("downloads")

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures::future::BoxFuture;

use crate::error::ExportError;
use crate::export::ExportArtifact;

/// Destination of a finished artifact. Implementations must never leave a
/// partially written file behind.
pub trait ArtifactSink: Send + Sync {
    /// Store the artifact under `file_name`; resolves to where it ended up.
    fn save<'a>(&'a self, file_name: &'a str, artifact: &'a ExportArtifact) -> BoxFuture<'a, Result<String, ExportError>>;
}

/// Writes artifacts into a directory via a temp file + rename.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(file_name);

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| ExportError::Io(e.error))?;
    Ok(target)
}

impl ArtifactSink for DirectorySink {
    fn save<'a>(&'a self, file_name: &'a str, artifact: &'a ExportArtifact) -> BoxFuture<'a, Result<String, ExportError>> {
        Box::pin(async move {
            let dir = self.dir.clone();
            let name = file_name.to_string();
            let bytes = artifact.bytes().to_vec();
            let target = tokio::task::spawn_blocking(move || write_atomically(&dir, &name, &bytes))
                .await
                .map_err(|e| ExportError::CaptureFailed(format!("save task failed: {}", e)))??;

            log::info!(
                "saved {} ({}, {} bytes)",
                target.display(),
                artifact.mime_type(),
                artifact.bytes().len()
            );
            Ok(target.display().to_string())
        })
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<(String, ExportArtifact)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<(String, ExportArtifact)> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn save<'a>(&'a self, file_name: &'a str, artifact: &'a ExportArtifact) -> BoxFuture<'a, Result<String, ExportError>> {
        Box::pin(async move {
            self.saved
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((file_name.to_string(), artifact.clone()));
            Ok(format!("memory://{}", file_name))
        })
    }
}
