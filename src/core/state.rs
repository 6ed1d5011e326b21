//! Session state and the operations a front end drives.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{BatchProgress, ImageItem, ItemStore, PipelineConfig, Rgb, Settings, TransformKind};
use crate::processing::batch::{cooperative_yield, BatchReport, BatchScheduler, RunMonitor};
use crate::processing::bridge::{BuiltinEngineLoader, EngineLoader, MarshallingBridge};
use crate::processing::export::{ExportArtifact, ExportPackager, ExportedImage, ImageDecoder, RasterCodec};
use crate::utils::{PipelineError, PipelineResult, SourceFile};

/// A source that could not be ingested.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of adding a group of files.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub added: usize,
    /// Files beyond the remaining capacity, never decoded
    pub dropped: usize,
    pub failed: Vec<IngestFailure>,
}

/// All session state, owned by one controller.
///
/// The queue, selection, engine handle and scheduler live here and every
/// operation borrows this value, so there is no ambient global state.
pub struct Pipeline {
    config: PipelineConfig,
    store: ItemStore,
    bridge: MarshallingBridge,
    scheduler: BatchScheduler,
    decoder: Box<dyn ImageDecoder>,
    exporter: ExportPackager,
}

impl Pipeline {
    /// Creates a pipeline with the built-in codec and zip packager.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_collaborators(config, Box::new(RasterCodec), ExportPackager::default())
    }

    pub fn with_collaborators(
        config: PipelineConfig,
        decoder: Box<dyn ImageDecoder>,
        exporter: ExportPackager,
    ) -> Self {
        debug!(
            "Pipeline created (capacity: {}, boost: {})",
            config.queue_capacity, config.enhance_boost
        );
        Self {
            store: ItemStore::new(config.queue_capacity, config.default_settings),
            bridge: MarshallingBridge::new(),
            scheduler: BatchScheduler::new(config.enhance_boost),
            decoder,
            exporter,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn bridge(&self) -> &MarshallingBridge {
        &self.bridge
    }

    /// Handle for observing a run or requesting an abort from another task.
    pub fn monitor(&self) -> RunMonitor {
        self.scheduler.monitor()
    }

    /// Loads the built-in engine. Safe to call repeatedly.
    pub async fn initialize(&mut self) -> PipelineResult<()> {
        let loader = BuiltinEngineLoader::new(self.config.engine_memory_limit);
        self.initialize_with(&loader).await
    }

    /// Loads a custom engine. Ignored when an engine is already active.
    pub async fn initialize_with<L: EngineLoader>(&mut self, loader: &L) -> PipelineResult<()> {
        self.bridge.initialize(loader).await?;
        Ok(())
    }

    // ── Queue ────────────────────────────────────────────────────────────────────────

    /// Decodes one source and appends it.
    pub fn ingest(&mut self, name: &str, bytes: &[u8]) -> PipelineResult<&ImageItem> {
        if self.store.remaining_capacity() == 0 {
            return Err(PipelineError::QueueFull { capacity: self.store.capacity() });
        }
        let item = self.store.ingest(name, bytes, self.decoder.as_ref())?;
        self.store.append(item)?;
        self.store.get(self.store.len() - 1)
    }

    /// Adds files in order until the queue is full; the rest are dropped.
    ///
    /// Decode failures are collected in the report and do not stop the others.
    pub async fn ingest_files<I>(&mut self, files: I) -> IngestReport
    where
        I: IntoIterator<Item = SourceFile>,
    {
        let files: Vec<SourceFile> = files.into_iter().collect();
        let accepted = files.len().min(self.store.remaining_capacity());
        let mut report = IngestReport {
            dropped: files.len() - accepted,
            ..Default::default()
        };
        if report.dropped > 0 {
            warn!(
                "Queue limit of {} reached, dropping {} files",
                self.store.capacity(),
                report.dropped
            );
        }

        for (i, file) in files.into_iter().take(accepted).enumerate() {
            if i > 0 {
                cooperative_yield().await;
            }
            match self.ingest(&file.name, &file.bytes) {
                Ok(_) => report.added += 1,
                Err(e) => {
                    warn!("Skipping '{}': {}", file.name, e);
                    report.failed.push(IngestFailure { name: file.name, error: e.to_string() });
                }
            }
        }

        info!(
            "Ingested {} images ({} failed, {} dropped), queue {}/{}",
            report.added,
            report.failed.len(),
            report.dropped,
            self.store.len(),
            self.store.capacity()
        );
        report
    }

    pub fn select(&mut self, index: usize) -> PipelineResult<()> {
        self.store.select(index)
    }

    pub fn remove(&mut self, index: usize) -> PipelineResult<ImageItem> {
        self.store.remove(index)
    }

    pub fn clear(&mut self) {
        debug!("Clearing {} images", self.store.len());
        self.store.clear();
    }

    pub fn update_settings(&mut self, index: usize, settings: Settings) -> PipelineResult<()> {
        self.store.update_settings(index, settings)
    }

    pub fn apply_to_all(&mut self, settings: Settings) {
        info!(
            "Applied {} (threshold {}) to all {} images",
            settings.target_color.to_hex(),
            settings.threshold,
            self.store.len()
        );
        self.store.apply_to_all(settings);
    }

    pub fn pick_color(&mut self, index: usize, x: u32, y: u32) -> PipelineResult<Rgb> {
        self.store.pick_color(index, x, y)
    }

    pub fn revert(&mut self, index: usize) -> PipelineResult<()> {
        self.store.revert(index)
    }

    // ── Processing ───────────────────────────────────────────────────────────────────

    /// Processes one item with its current settings.
    pub async fn process_item(&mut self, index: usize, kind: TransformKind) -> PipelineResult<()> {
        cooperative_yield().await;
        self.scheduler
            .process_item(&mut self.store, &mut self.bridge, index, kind)
    }

    /// Processes the selected item; a no-op on an empty queue.
    pub async fn process_selected(&mut self, kind: TransformKind) -> PipelineResult<()> {
        match self.store.selection() {
            Some(index) => self.process_item(index, kind).await,
            None => Ok(()),
        }
    }

    /// Removes the background of every item, then exports the finished ones
    /// when `auto_export` is on.
    pub async fn process_all<F>(&mut self, on_progress: F) -> PipelineResult<BatchReport>
    where
        F: FnMut(&BatchProgress),
    {
        let exporter = self.config.auto_export.then_some(&self.exporter);
        self.scheduler
            .run_batch(&mut self.store, &mut self.bridge, exporter, on_progress)
            .await
    }

    // ── Export ───────────────────────────────────────────────────────────────────────

    pub fn export_item(&self, index: usize) -> PipelineResult<ExportedImage> {
        self.exporter.export_single(self.store.get(index)?)
    }

    pub fn export_all(&self) -> PipelineResult<Option<ExportArtifact>> {
        self.exporter.export_batch(self.store.items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::export::ImageEncoder;

    fn png(pixels: &[u8], width: u32, height: u32) -> Vec<u8> {
        RasterCodec.encode(pixels, width, height).unwrap()
    }

    fn source(name: &str, bytes: Vec<u8>) -> SourceFile {
        SourceFile { name: name.to_string(), bytes }
    }

    #[tokio::test]
    async fn ingest_files_respects_remaining_capacity() {
        let config = PipelineConfig { queue_capacity: 2, ..Default::default() };
        let mut pipeline = Pipeline::new(config);
        let one = png(&[1, 2, 3, 255], 1, 1);

        let report = pipeline
            .ingest_files(vec![
                source("a.png", one.clone()),
                source("b.png", one.clone()),
                source("c.png", one.clone()),
            ])
            .await;

        assert_eq!(report.added, 2);
        assert_eq!(report.dropped, 1);
        assert_eq!(pipeline.store().len(), 2);

        let err = pipeline.ingest("d.png", &one).unwrap_err();
        assert!(matches!(err, PipelineError::QueueFull { capacity: 2 }));
        assert_eq!(pipeline.store().len(), 2);
    }

    #[tokio::test]
    async fn decode_failures_are_reported_not_inserted() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let report = pipeline
            .ingest_files(vec![
                source("bad.png", b"nope".to_vec()),
                source("good.png", png(&[9, 9, 9, 255], 1, 1)),
            ])
            .await;

        assert_eq!(report.added, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "bad.png");
        assert_eq!(pipeline.store().len(), 1);
        assert_eq!(pipeline.store().get(0).unwrap().name(), "good.png");
        assert_eq!(pipeline.store().get(0).unwrap().format(), "image/png");
    }

    #[tokio::test]
    async fn ingested_items_take_configured_default_settings() {
        let settings = Settings { target_color: Rgb(0, 0, 255), threshold: 5 };
        let config = PipelineConfig { default_settings: settings, ..Default::default() };
        let mut pipeline = Pipeline::new(config);
        pipeline.ingest("a.png", &png(&[0, 0, 0, 255], 1, 1)).unwrap();
        assert_eq!(pipeline.store().get(0).unwrap().settings, settings);
    }

    #[tokio::test]
    async fn enhance_then_revert() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        pipeline.initialize().await.unwrap();
        pipeline.ingest("a.png", &png(&[0, 100, 0, 255], 1, 1)).unwrap();
        pipeline
            .update_settings(0, Settings { target_color: Rgb(0, 100, 0), threshold: 10 })
            .unwrap();

        pipeline.process_selected(TransformKind::EnhanceColor).await.unwrap();
        assert_eq!(pipeline.store().get(0).unwrap().processed().unwrap(), &[0, 150, 0, 255]);

        pipeline.revert(0).unwrap();
        assert!(pipeline.store().get(0).unwrap().processed().is_none());
    }

    #[tokio::test]
    async fn process_all_without_auto_export_produces_no_archive() {
        let config = PipelineConfig { auto_export: false, ..Default::default() };
        let mut pipeline = Pipeline::new(config);
        pipeline.initialize().await.unwrap();
        pipeline.ingest("a.png", &png(&[0, 255, 0, 255], 1, 1)).unwrap();

        let report = pipeline.process_all(|_| {}).await.unwrap();

        assert_eq!(report.processed, 1);
        assert!(report.archive.is_none());
        assert!(pipeline.export_all().unwrap().is_some());
    }

    #[tokio::test]
    async fn export_item_names_file_after_source() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        pipeline.ingest("holiday.jpeg", &png(&[1, 1, 1, 255], 1, 1)).unwrap();
        let exported = pipeline.export_item(0).unwrap();
        assert_eq!(exported.file_name, "removed_bg_holiday.png");
        assert!(matches!(pipeline.export_item(3), Err(PipelineError::IndexOutOfRange { .. })));
    }
}
