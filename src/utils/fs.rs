use std::path::{Path, PathBuf};
use tokio::fs;
use crate::utils::{PipelineError, PipelineResult};

/// A source file read into memory, ready for ingestion
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Get the file name component of a path as a string
pub fn extract_filename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Reads a source image from disk
pub async fn read_source(path: impl AsRef<Path>) -> PipelineResult<SourceFile> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .await
        .map_err(|e| PipelineError::IO(format!("Failed to read {}: {}", path.display(), e)))?;
    let name = extract_filename(&path.to_string_lossy()).to_string();
    Ok(SourceFile { name, bytes })
}

/// Writes an exported artifact into `dir`, creating it if needed
pub async fn write_artifact(dir: impl AsRef<Path>, name: &str, bytes: &[u8]) -> PipelineResult<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    fs::write(&path, bytes)
        .await
        .map_err(|e| PipelineError::IO(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(path)
}
