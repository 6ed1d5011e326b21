//! Built-in engine backed by a private, growable linear memory.
//!
//! The engine never sees host buffers: callers must allocate a region, copy
//! pixels in, run an entry point and copy them back out, exactly as with a
//! sandboxed module.

use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, warn};

use crate::utils::{BridgeResult, CHANNELS};

use super::engine::{EngineLoader, NativeEngine, ENGINE_ABI_VERSION};

/// First usable address; everything below stays unmapped so 0 is never handed out.
const HEAP_BASE: usize = 16;
const ALIGN: usize = 16;

/// First-fit allocator over a linear memory that grows on demand up to `limit`.
pub struct LinearMemoryEngine {
    memory: Vec<u8>,
    limit: usize,
    /// address -> reserved length
    allocations: BTreeMap<usize, usize>,
}

impl LinearMemoryEngine {
    pub fn new(limit: usize) -> Self {
        Self {
            memory: vec![0; HEAP_BASE.min(limit)],
            limit,
            allocations: BTreeMap::new(),
        }
    }

    fn find_gap(&self, size: usize) -> Option<usize> {
        let mut cursor = HEAP_BASE;
        for (&ptr, &len) in &self.allocations {
            if ptr.checked_sub(cursor)? >= size {
                return Some(cursor);
            }
            cursor = ptr + len;
        }
        Some(cursor)
    }

    fn region(&mut self, ptr: usize, width: i32, height: i32) -> Option<&mut [u8]> {
        let len = usize::try_from(width)
            .ok()?
            .checked_mul(usize::try_from(height).ok()?)?
            .checked_mul(CHANNELS)?;
        let end = ptr.checked_add(len)?;
        self.memory.get_mut(ptr..end)
    }
}

fn distance(px: &[u8], r: i32, g: i32, b: i32) -> f32 {
    let dr = (px[0] as i32 - r) as f32;
    let dg = (px[1] as i32 - g) as f32;
    let db = (px[2] as i32 - b) as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

impl NativeEngine for LinearMemoryEngine {
    fn abi_version(&self) -> u32 {
        ENGINE_ABI_VERSION
    }

    fn allocate(&mut self, size: usize) -> usize {
        let Some(size) = size.max(1).checked_next_multiple_of(ALIGN) else {
            return 0;
        };
        let Some(ptr) = self.find_gap(size) else {
            return 0;
        };
        let end = match ptr.checked_add(size) {
            Some(end) if end <= self.limit => end,
            _ => {
                debug!("Engine memory exhausted: {} bytes requested, limit {}", size, self.limit);
                return 0;
            }
        };
        if end > self.memory.len() {
            self.memory.resize(end, 0);
        }
        self.allocations.insert(ptr, size);
        ptr
    }

    fn release(&mut self, ptr: usize) {
        if self.allocations.remove(&ptr).is_none() {
            warn!("Release of unknown engine region {:#x}", ptr);
        }
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn remove_background(
        &mut self,
        ptr: usize,
        width: i32,
        height: i32,
        target_r: i32,
        target_g: i32,
        target_b: i32,
        threshold: i32,
    ) {
        let Some(region) = self.region(ptr, width, height) else {
            return;
        };
        for px in region.chunks_exact_mut(CHANNELS) {
            if distance(px, target_r, target_g, target_b) < threshold as f32 {
                px[3] = 0;
            }
        }
    }

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
    ) {
        let Some(region) = self.region(ptr, width, height) else {
            return;
        };
        for px in region.chunks_exact_mut(CHANNELS) {
            if distance(px, target_r, target_g, target_b) < threshold as f32 {
                for channel in &mut px[..3] {
                    // `as` saturates, so only the upper bound needs clamping
                    *channel = (*channel as f32 * boost).min(255.0) as u8;
                }
            }
        }
    }

    fn live_allocations(&self) -> usize {
        self.allocations.len()
    }
}

/// Loads a fresh [`LinearMemoryEngine`].
#[derive(Debug, Clone)]
pub struct BuiltinEngineLoader {
    pub memory_limit: usize,
}

impl BuiltinEngineLoader {
    pub fn new(memory_limit: usize) -> Self {
        Self { memory_limit }
    }
}

impl EngineLoader for BuiltinEngineLoader {
    fn load(&self) -> impl Future<Output = BridgeResult<Box<dyn NativeEngine>>> + Send {
        let limit = self.memory_limit;
        async move {
            debug!("Loading built-in engine (memory limit: {} bytes)", limit);
            Ok(Box::new(LinearMemoryEngine::new(limit)) as Box<dyn NativeEngine>)
        }
    }
}
