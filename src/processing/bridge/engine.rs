//! The fixed interface a native pixel engine exposes to the bridge.

use std::future::Future;
use crate::utils::BridgeResult;

/// Interface revision the bridge binds to. An engine reporting anything else
/// is refused at initialization.
pub const ENGINE_ABI_VERSION: u32 = 1;

/// A non-reentrant pixel engine that only operates on its own memory.
///
/// Addresses are offsets into [`memory`](NativeEngine::memory); 0 is never a
/// valid region and doubles as the allocation-failure signal. Both entry
/// points mutate exactly `width * height * 4` bytes starting at `ptr`, one
/// pixel at a time, and never read across pixel boundaries.
pub trait NativeEngine: Send {
    fn abi_version(&self) -> u32;

    /// Reserves `size` bytes, returning their address or 0 when exhausted.
    fn allocate(&mut self, size: usize) -> usize;

    fn release(&mut self, ptr: usize);

    /// The engine's whole address space.
    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];

    #[allow(clippy::too_many_arguments)]
    fn remove_background(
        &mut self,
        ptr: usize,
        width: i32,
        height: i32,
        target_r: i32,
        target_g: i32,
        target_b: i32,
        threshold: i32,
    );

    #[allow(clippy::too_many_arguments)]
    fn enhance_color(
        &mut self,
        ptr: usize,
        width: i32,
        height: i32,
        target_r: i32,
        target_g: i32,
        target_b: i32,
        threshold: i32,
        boost: f32,
    );

    /// Number of regions currently allocated; used for leak accounting.
    fn live_allocations(&self) -> usize;
}

/// Produces an engine handle. Loading may be slow (compilation, I/O), hence async.
pub trait EngineLoader {
    fn load(&self) -> impl Future<Output = BridgeResult<Box<dyn NativeEngine>>> + Send;
}
