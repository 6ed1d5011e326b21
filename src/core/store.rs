//! Ordered, capacity-bounded image queue with a single selection.

use tracing::debug;

use crate::core::{ImageItem, ItemSummary, Rgb, Settings};
use crate::processing::export::ImageDecoder;
use crate::utils::{pixel_offset, validate_shape, PipelineError, PipelineResult};

/// The session's images plus the selected index.
///
/// Selection is `None` exactly when the queue is empty.
#[derive(Debug)]
pub struct ItemStore {
    items: Vec<ImageItem>,
    selection: Option<usize>,
    capacity: usize,
    default_settings: Settings,
}

impl ItemStore {
    pub fn new(capacity: usize, default_settings: Settings) -> Self {
        Self {
            items: Vec::new(),
            selection: None,
            capacity,
            default_settings,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> PipelineResult<&ImageItem> {
        let len = self.items.len();
        self.items
            .get(index)
            .ok_or(PipelineError::IndexOutOfRange { index, len })
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> PipelineResult<&mut ImageItem> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or(PipelineError::IndexOutOfRange { index, len })
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    pub fn selected(&self) -> Option<&ImageItem> {
        self.selection.and_then(|index| self.items.get(index))
    }

    pub fn summaries(&self) -> Vec<ItemSummary> {
        self.items.iter().map(ItemSummary::from).collect()
    }

    /// Decodes `bytes` into a new pending item. The queue is not touched.
    pub fn ingest(
        &self,
        name: &str,
        bytes: &[u8],
        decoder: &dyn ImageDecoder,
    ) -> PipelineResult<ImageItem> {
        let decoded = decoder.decode(bytes)?;
        validate_shape(&decoded.pixels, decoded.width, decoded.height)
            .map_err(|e| PipelineError::decode(format!("Decoder returned bad buffer: {}", e)))?;

        Ok(ImageItem::new(
            name,
            decoded.format.mime_type(),
            decoded.width,
            decoded.height,
            decoded.pixels,
            self.default_settings,
        ))
    }

    /// Appends at the end; selects it when nothing was selected.
    ///
    /// Ids are unique within the queue, so a copy of a queued item is refused.
    pub fn append(&mut self, item: ImageItem) -> PipelineResult<()> {
        if self.items.len() >= self.capacity {
            return Err(PipelineError::QueueFull { capacity: self.capacity });
        }
        if self.items.iter().any(|queued| queued.id() == item.id()) {
            return Err(PipelineError::DuplicateItem { id: item.id().to_string() });
        }
        debug!("Queued '{}' ({}×{})", item.name(), item.width(), item.height());
        self.items.push(item);
        if self.selection.is_none() {
            self.selection = Some(0);
        }
        Ok(())
    }

    pub fn select(&mut self, index: usize) -> PipelineResult<()> {
        self.get(index)?;
        self.selection = Some(index);
        Ok(())
    }

    /// Removes the item at `index` and re-targets the selection.
    pub fn remove(&mut self, index: usize) -> PipelineResult<ImageItem> {
        self.get(index)?;
        let removed = self.items.remove(index);

        self.selection = match self.selection {
            Some(selected) if selected == index => {
                if self.items.is_empty() { None } else { Some(0) }
            }
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Drops every item and buffer.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selection = None;
    }

    /// Replaces the settings of one item. Earlier results stay as they are.
    pub fn update_settings(&mut self, index: usize, settings: Settings) -> PipelineResult<()> {
        self.get_mut(index)?.settings = settings;
        Ok(())
    }

    /// Gives every item the same settings.
    pub fn apply_to_all(&mut self, settings: Settings) {
        for item in &mut self.items {
            item.settings = settings;
        }
    }

    /// Sets the item's target colour to the displayed pixel at `(x, y)`.
    pub fn pick_color(&mut self, index: usize, x: u32, y: u32) -> PipelineResult<Rgb> {
        let item = self.get_mut(index)?;
        let (width, height) = (item.width(), item.height());
        let offset = pixel_offset(width, height, x, y)
            .ok_or(PipelineError::OutOfFrame { x, y, width, height })?;

        let px = &item.displayed()[offset..offset + 3];
        let color = Rgb(px[0], px[1], px[2]);
        item.settings.target_color = color;
        Ok(color)
    }

    /// Discards the processed result so the item shows its original again.
    pub fn revert(&mut self, index: usize) -> PipelineResult<()> {
        self.get_mut(index)?.clear_processed();
        Ok(())
    }
}
