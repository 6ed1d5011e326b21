//! Core session types and state management.
//!
//! This module contains the fundamental types used throughout the crate:
//! - [`Pipeline`]: the controller that owns all session state
//! - [`ItemStore`]: the ordered, bounded image queue and its selection
//! - [`ImageItem`] / [`Settings`]: one image and its chroma-key settings
//! - [`PipelineConfig`]: session tunables
//! - [`BatchProgress`]: progress events for batch runs

mod config;
mod progress;
mod state;
mod store;
mod types;

pub use config::{PipelineConfig, DEFAULT_QUEUE_CAPACITY};
pub use progress::{round_percent, BatchProgress, ProgressType};
pub use state::{IngestFailure, IngestReport, Pipeline};
pub use store::ItemStore;
pub use types::{ImageItem, ItemStatus, ItemSummary, Rgb, Settings, TransformKind, TransformParams};
