pub mod batch;
pub mod bridge;
pub mod export;

pub use batch::{BatchReport, BatchScheduler, RunMonitor, SchedulerState};
pub use bridge::{BuiltinEngineLoader, EngineLoader, MarshallingBridge, NativeEngine};
pub use export::{ExportArtifact, ExportPackager, ExportedImage, RasterCodec, ZipPacker};
