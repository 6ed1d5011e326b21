//! Marshalling bridge to the native pixel engine.
//!
//! The engine only operates on its own memory, so every transform copies the
//! pixels in, runs an entry point and copies the result back out.
//!
//! # Architecture
//!
//! - [`NativeEngine`] / [`EngineLoader`]: the versioned interface an engine implements.
//! - [`MarshallingBridge`]: owns the handle and runs the copy-in / invoke / copy-out protocol.
//! - [`LinearMemoryEngine`]: built-in engine with a private linear memory and allocator.

mod engine;
mod linear;
mod marshal;
mod scratch;

pub use engine::{EngineLoader, NativeEngine, ENGINE_ABI_VERSION};
pub use linear::{BuiltinEngineLoader, LinearMemoryEngine};
pub use marshal::MarshallingBridge;
