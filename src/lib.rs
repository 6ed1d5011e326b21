// Module declarations in dependency order
pub mod core;
pub mod processing;
pub mod utils;

// Public exports for external consumers
pub use core::{
    BatchProgress, ImageItem, ItemStatus, ItemStore, Pipeline, PipelineConfig, Rgb, Settings,
    TransformKind,
};
pub use processing::{
    BatchReport, ExportArtifact, ExportPackager, ExportedImage, MarshallingBridge, SchedulerState,
};
pub use utils::{BridgeError, PipelineError, PipelineResult};

// This library file is the public API; the demo driver lives in main.rs.
