use crate::utils::{BridgeError, BridgeResult};

use super::engine::NativeEngine;

/// A region inside the engine's memory that is released when dropped.
///
/// Holding the engine borrow for the region's whole life means nothing else
/// can touch the engine until the region is gone, and `Drop` covers every
/// exit path including unwinding out of an entry point.
pub(crate) struct ScratchRegion<'e> {
    engine: &'e mut (dyn NativeEngine + 'static),
    ptr: usize,
    len: usize,
}

impl<'e> ScratchRegion<'e> {
    pub(crate) fn allocate(engine: &'e mut (dyn NativeEngine + 'static), len: usize) -> BridgeResult<Self> {
        let ptr = engine.allocate(len);
        if ptr == 0 {
            return Err(BridgeError::OutOfForeignMemory { requested: len });
        }
        Ok(Self { engine, ptr, len })
    }

    pub(crate) fn ptr(&self) -> usize {
        self.ptr
    }

    pub(crate) fn engine(&mut self) -> &mut (dyn NativeEngine + 'static) {
        &mut *self.engine
    }

    fn range(&self) -> BridgeResult<std::ops::Range<usize>> {
        let fault = BridgeError::ForeignMemoryFault { ptr: self.ptr, len: self.len };
        let end = self.ptr.checked_add(self.len).ok_or_else(|| fault.clone())?;
        if end > self.engine.memory().len() {
            return Err(fault);
        }
        Ok(self.ptr..end)
    }

    /// Copies `data` verbatim into the region.
    pub(crate) fn write(&mut self, data: &[u8]) -> BridgeResult<()> {
        debug_assert_eq!(data.len(), self.len);
        let range = self.range()?;
        self.engine.memory_mut()[range].copy_from_slice(data);
        Ok(())
    }

    /// Copies the region out into a new host buffer.
    pub(crate) fn read(&self) -> BridgeResult<Vec<u8>> {
        let range = self.range()?;
        Ok(self.engine.memory()[range].to_vec())
    }
}

impl Drop for ScratchRegion<'_> {
    fn drop(&mut self) {
        self.engine.release(self.ptr);
    }
}
