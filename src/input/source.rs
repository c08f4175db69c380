//! Source file metadata for the extraction pipeline

use crate::cache::FileStamp;
use crate::error::{Result, ScreenerError};
use crate::input::file_detector::FileKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// An uploaded document plus the identity the cache keys on.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub stamp: FileStamp,
    pub kind: FileKind,
}

impl SourceFile {
    pub fn open(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(ScreenerError::InvalidInput(format!(
                "not a file: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                ScreenerError::InvalidInput(format!("path has no file name: {}", path.display()))
            })?;

        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let kind = path
            .extension()
            .and_then(|e| e.to_str())
            .map(FileKind::from_extension)
            .unwrap_or(FileKind::Unknown);

        Ok(Self {
            path: path.to_path_buf(),
            stamp: FileStamp::new(name, metadata.len(), modified_ms),
            kind,
        })
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}
