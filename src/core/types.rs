//! Core types for items, per-item settings and transform parameters.

use serde::{Deserialize, Serialize};

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Per-item chroma-key settings.
///
/// Plain value type; every item owns its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Colour to key out (or boost)
    pub target_color: Rgb,
    /// Distance bound, 0-255
    pub threshold: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_color: Rgb(0, 255, 0),
            threshold: 30,
        }
    }
}

/// Processing status, derived from whether a processed buffer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Done,
}

/// Which engine entry point to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformKind {
    RemoveBackground,
    EnhanceColor,
}

/// Scalar parameters passed across the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub target_color: Rgb,
    pub threshold: u8,
    /// Only read by `EnhanceColor`
    pub boost: f32,
}

impl TransformParams {
    pub fn from_settings(settings: Settings, boost: f32) -> Self {
        Self {
            target_color: settings.target_color,
            threshold: settings.threshold,
            boost,
        }
    }
}

/// One loaded image in the queue.
///
/// The original buffer is fixed at creation; the processed buffer is replaced
/// wholesale on every run.
#[derive(Debug, Clone)]
pub struct ImageItem {
    id: String,
    name: String,
    format: String,
    width: u32,
    height: u32,
    original: Vec<u8>,
    processed: Option<Vec<u8>>,
    /// Mutable per-item settings
    pub settings: Settings,
}

impl ImageItem {
    /// Creates a pending item; `original` must already match `width * height * 4`.
    pub(crate) fn new(
        name: impl Into<String>,
        format: impl Into<String>,
        width: u32,
        height: u32,
        original: Vec<u8>,
        settings: Settings,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.into(),
            format: format.into(),
            width,
            height,
            original,
            processed: None,
            settings,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type of the source file
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn original(&self) -> &[u8] {
        &self.original
    }

    pub fn processed(&self) -> Option<&[u8]> {
        self.processed.as_deref()
    }

    /// Processed pixels when present, else the original
    pub fn displayed(&self) -> &[u8] {
        self.processed().unwrap_or(&self.original)
    }

    pub fn status(&self) -> ItemStatus {
        if self.processed.is_some() {
            ItemStatus::Done
        } else {
            ItemStatus::Pending
        }
    }

    /// Stores a transform result; the caller guarantees it came from this
    /// item's original so its length matches.
    pub(crate) fn set_processed(&mut self, pixels: Vec<u8>) {
        debug_assert_eq!(pixels.len(), self.original.len());
        self.processed = Some(pixels);
    }

    pub(crate) fn clear_processed(&mut self) {
        self.processed = None;
    }
}

/// Lightweight view of an item for front ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: String,
    pub name: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub settings: Settings,
    pub status: ItemStatus,
}

impl From<&ImageItem> for ItemSummary {
    fn from(item: &ImageItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            format: item.format.clone(),
            width: item.width,
            height: item.height,
            settings: item.settings,
            status: item.status(),
        }
    }
}
