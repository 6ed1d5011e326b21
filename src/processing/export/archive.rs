use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::utils::{PipelineError, PipelineResult};

/// Bundles named files into one archive.
pub trait ArchivePacker: Send + Sync {
    fn pack(&self, entries: &BTreeMap<String, Vec<u8>>) -> PipelineResult<Vec<u8>>;

    fn extension(&self) -> &'static str;
}

/// Writes a zip archive in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPacker;

impl ArchivePacker for ZipPacker {
    fn pack(&self, entries: &BTreeMap<String, Vec<u8>>) -> PipelineResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in entries {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| PipelineError::archive(format!("Cannot add {}: {}", name, e)))?;
            writer
                .write_all(bytes)
                .map_err(|e| PipelineError::archive(format!("Cannot write {}: {}", name, e)))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| PipelineError::archive(format!("Cannot finish archive: {}", e)))?;
        Ok(cursor.into_inner())
    }

    fn extension(&self) -> &'static str {
        "zip"
    }
}
