use std::collections::BTreeMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::{ImageItem, ItemStatus};
use crate::utils::{file_stem, sanitize_stem, PipelineResult, UniqueNames};

use super::archive::{ArchivePacker, ZipPacker};
use super::codec::{ImageEncoder, RasterCodec};

/// Prefix for single-image downloads
const SINGLE_PREFIX: &str = "removed_bg_";

/// One re-encoded image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedImage {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// A packaged batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub file_name: String,
    /// Entry names in queue order; the archive stores them sorted by name
    pub entries: Vec<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Re-encodes processed items, singly or bundled.
pub struct ExportPackager {
    encoder: Box<dyn ImageEncoder>,
    packer: Box<dyn ArchivePacker>,
}

impl Default for ExportPackager {
    fn default() -> Self {
        Self::new(Box::new(RasterCodec), Box::new(ZipPacker))
    }
}

impl ExportPackager {
    pub fn new(encoder: Box<dyn ImageEncoder>, packer: Box<dyn ArchivePacker>) -> Self {
        Self { encoder, packer }
    }

    /// Encodes the processed pixels, falling back to the original.
    pub fn export_single(&self, item: &ImageItem) -> PipelineResult<ExportedImage> {
        let bytes = self.encoder.encode(item.displayed(), item.width(), item.height())?;
        let file_name = format!(
            "{SINGLE_PREFIX}{}.{}",
            sanitize_stem(file_stem(item.name())),
            self.encoder.extension()
        );
        debug!("Exported '{}' as {} ({} bytes)", item.name(), file_name, bytes.len());
        Ok(ExportedImage { file_name, bytes })
    }

    /// Bundles every finished item. Returns `None` when nothing is finished.
    pub fn export_batch(&self, items: &[ImageItem]) -> PipelineResult<Option<ExportArtifact>> {
        let done: Vec<&ImageItem> = items
            .iter()
            .filter(|item| item.status() == ItemStatus::Done)
            .collect();
        if done.is_empty() {
            debug!("No processed images, skipping archive");
            return Ok(None);
        }

        let mut names = UniqueNames::new();
        let mut entries = BTreeMap::new();
        let mut order = Vec::with_capacity(done.len());
        for item in done {
            let Some(pixels) = item.processed() else {
                continue;
            };
            let bytes = self.encoder.encode(pixels, item.width(), item.height())?;
            let name = names.claim(file_stem(item.name()), self.encoder.extension());
            order.push(name.clone());
            entries.insert(name, bytes);
        }

        let bytes = self.packer.pack(&entries)?;
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let file_name = format!("batch_{stamp}.{}", self.packer.extension());

        info!("Packaged {} images into {} ({} bytes)", order.len(), file_name, bytes.len());
        Ok(Some(ExportArtifact {
            file_name,
            entries: order,
            bytes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Settings;
    use crate::processing::export::ImageDecoder;
    use std::io::Cursor;

    fn item(name: &str, processed: bool) -> ImageItem {
        let mut item = ImageItem::new(name, "image/png", 1, 1, vec![0, 255, 0, 255], Settings::default());
        if processed {
            item.set_processed(vec![0, 255, 0, 0]);
        }
        item
    }

    #[test]
    fn single_export_prefers_processed_pixels() {
        let packager = ExportPackager::default();
        let exported = packager.export_single(&item("shot.final.jpg", true)).unwrap();
        assert_eq!(exported.file_name, "removed_bg_shot.final.png");
        let decoded = RasterCodec.decode(&exported.bytes).unwrap();
        assert_eq!(decoded.pixels, vec![0, 255, 0, 0]);
    }

    #[test]
    fn single_export_falls_back_to_original() {
        let packager = ExportPackager::default();
        let exported = packager.export_single(&item("raw.png", false)).unwrap();
        let decoded = RasterCodec.decode(&exported.bytes).unwrap();
        assert_eq!(decoded.pixels, vec![0, 255, 0, 255]);
    }

    #[test]
    fn batch_export_skips_pending_and_dedupes_names() {
        let packager = ExportPackager::default();
        let items = vec![item("a.jpg", true), item("b.png", false), item("a.png", true)];

        let artifact = packager.export_batch(&items).unwrap().unwrap();

        assert_eq!(artifact.entries, vec!["a.png", "a_1.png"]);
        assert!(artifact.file_name.starts_with("batch_"));
        assert!(artifact.file_name.ends_with(".zip"));
        let archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn entries_follow_queue_order_while_archive_is_sorted() {
        let packager = ExportPackager::default();
        let items = vec![item("zebra.png", true), item("apple.png", true)];

        let artifact = packager.export_batch(&items).unwrap().unwrap();

        assert_eq!(artifact.entries, vec!["zebra.png", "apple.png"]);
        let mut archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
        let stored: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(stored, vec!["apple.png", "zebra.png"]);
    }

    #[test]
    fn batch_export_without_done_items_is_a_no_op() {
        let packager = ExportPackager::default();
        assert!(packager.export_batch(&[item("a.png", false)]).unwrap().is_none());
        assert!(packager.export_batch(&[]).unwrap().is_none());
    }
}
