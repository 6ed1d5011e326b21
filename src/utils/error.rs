//! Error types for the chroma-key pipeline.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.

use std::io;
use thiserror::Error;
use serde::Serialize;

/// Errors raised while crossing into the native engine's memory.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BridgeError {
    /// A transform was requested before `initialize` completed
    #[error("Engine not ready: initialize the bridge before applying transforms")]
    EngineNotReady,

    /// The loaded engine speaks a different ABI than this bridge
    #[error("Engine ABI mismatch: expected v{expected}, engine reports v{found}")]
    EngineVersionMismatch { expected: u32, found: u32 },

    /// The engine allocator returned 0
    #[error("Out of foreign memory: failed to allocate {requested} bytes")]
    OutOfForeignMemory { requested: usize },

    /// Buffer length disagrees with `width * height * 4`
    #[error("Shape mismatch: {width}x{height} needs {expected} bytes, got {actual}")]
    ShapeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// The engine handed back a region that lies outside its own memory
    #[error("Foreign memory fault at {ptr:#x} (+{len} bytes)")]
    ForeignMemoryFault { ptr: usize, len: usize },
}

impl BridgeError {
    /// Whether the engine itself is unusable, as opposed to a single call failing.
    pub fn is_engine_exhausted(&self) -> bool {
        matches!(
            self,
            Self::EngineNotReady | Self::EngineVersionMismatch { .. } | Self::ForeignMemoryFault { .. }
        )
    }
}

/// Main error type for the pipeline.
///
/// All errors surfaced to a front end are converted to this type first.
#[derive(Error, Debug, Serialize)]
pub enum PipelineError {
    /// Native engine / marshalling failure
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Source bytes are not a supported raster image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Queue already holds `capacity` items
    #[error("Queue full: capacity of {capacity} images reached")]
    QueueFull { capacity: usize },

    /// An item with this id is already queued
    #[error("Duplicate item: {id} is already in the queue")]
    DuplicateItem { id: String },

    /// Index does not address an item in the queue
    #[error("Index {index} out of range for queue of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Pixel coordinate outside the image
    #[error("Pixel ({x}, {y}) is outside the {width}x{height} frame")]
    OutOfFrame { x: u32, y: u32, width: u32, height: u32 },

    /// A batch run is already active
    #[error("Scheduler busy: a batch run is already in progress")]
    SchedulerBusy,

    /// Re-encoding a pixel buffer failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Building the archive failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// File IO error
    #[error("IO error: {0}")]
    IO(String),
}

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for bridge calls.
pub type BridgeResult<T> = Result<T, BridgeError>;

// Helper methods for error creation
impl PipelineError {
    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::Encode(msg.into())
    }

    pub fn archive<T: Into<String>>(msg: T) -> Self {
        Self::Archive(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}

// Convert std::io::Error to PipelineError
impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_exhaustion_classification() {
        assert!(BridgeError::EngineNotReady.is_engine_exhausted());
        assert!(BridgeError::ForeignMemoryFault { ptr: 8, len: 4 }.is_engine_exhausted());
        assert!(!BridgeError::OutOfForeignMemory { requested: 16 }.is_engine_exhausted());
        assert!(
            !BridgeError::ShapeMismatch { width: 1, height: 1, expected: 4, actual: 3 }
                .is_engine_exhausted()
        );
    }

    #[test]
    fn bridge_errors_convert_into_pipeline_errors() {
        let err: PipelineError = BridgeError::EngineNotReady.into();
        assert!(matches!(err, PipelineError::Bridge(BridgeError::EngineNotReady)));
        assert!(err.to_string().starts_with("Bridge error"));
    }
}
