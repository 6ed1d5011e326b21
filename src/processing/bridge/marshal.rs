use tracing::{debug, info};

use crate::core::{Rgb, TransformKind, TransformParams};
use crate::utils::{validate_shape, BridgeError, BridgeResult};

use super::engine::{EngineLoader, NativeEngine, ENGINE_ABI_VERSION};
use super::scratch::ScratchRegion;

/// Owns the engine handle and moves pixels in and out of its memory.
#[derive(Default)]
pub struct MarshallingBridge {
    engine: Option<Box<dyn NativeEngine>>,
}

impl MarshallingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    /// Loads the engine once. Later calls return immediately while a handle exists.
    pub async fn initialize<L: EngineLoader>(&mut self, loader: &L) -> BridgeResult<()> {
        if self.engine.is_some() {
            debug!("Engine already initialized");
            return Ok(());
        }

        let engine = loader.load().await?;
        let found = engine.abi_version();
        if found != ENGINE_ABI_VERSION {
            return Err(BridgeError::EngineVersionMismatch {
                expected: ENGINE_ABI_VERSION,
                found,
            });
        }

        info!("Native engine active (ABI v{})", found);
        self.engine = Some(engine);
        Ok(())
    }

    /// Regions currently held inside the engine, `None` before initialization.
    pub fn live_allocations(&self) -> Option<usize> {
        self.engine.as_ref().map(|engine| engine.live_allocations())
    }

    /// Runs one transform over a copy of `buffer`.
    ///
    /// `buffer` is never modified. The scratch region is released on every
    /// path out of this function.
    pub fn apply_transform(
        &mut self,
        kind: TransformKind,
        buffer: &[u8],
        width: u32,
        height: u32,
        params: &TransformParams,
    ) -> BridgeResult<Vec<u8>> {
        let engine = self.engine.as_deref_mut().ok_or(BridgeError::EngineNotReady)?;

        validate_shape(buffer, width, height)?;
        let shape_error = || BridgeError::ShapeMismatch {
            width,
            height,
            expected: buffer.len(),
            actual: buffer.len(),
        };
        let w = i32::try_from(width).map_err(|_| shape_error())?;
        let h = i32::try_from(height).map_err(|_| shape_error())?;

        let mut scratch = ScratchRegion::allocate(engine, buffer.len())?;
        scratch.write(buffer)?;

        let ptr = scratch.ptr();
        let Rgb(r, g, b) = params.target_color;
        let (r, g, b) = (r as i32, g as i32, b as i32);
        let threshold = params.threshold as i32;
        match kind {
            TransformKind::RemoveBackground => {
                scratch.engine().remove_background(ptr, w, h, r, g, b, threshold)
            }
            TransformKind::EnhanceColor => {
                scratch.engine().enhance_color(ptr, w, h, r, g, b, threshold, params.boost)
            }
        }

        scratch.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Settings;
    use crate::processing::bridge::{BuiltinEngineLoader, LinearMemoryEngine};
    use std::future::Future;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Copy)]
    enum Fault {
        None,
        PanicInEntryPoint,
        WildPointer,
        WrongAbi,
    }

    /// Wraps the built-in engine to inject failures.
    struct FaultyEngine {
        inner: LinearMemoryEngine,
        fault: Fault,
    }

    impl NativeEngine for FaultyEngine {
        fn abi_version(&self) -> u32 {
            match self.fault {
                Fault::WrongAbi => ENGINE_ABI_VERSION + 1,
                _ => ENGINE_ABI_VERSION,
            }
        }

        fn allocate(&mut self, size: usize) -> usize {
            let ptr = self.inner.allocate(size);
            match self.fault {
                Fault::WildPointer if ptr != 0 => {
                    // keep the real region booked so release is observable
                    ptr + self.inner.memory().len()
                }
                _ => ptr,
            }
        }

        fn release(&mut self, ptr: usize) {
            let ptr = match self.fault {
                Fault::WildPointer => ptr - self.inner.memory().len(),
                _ => ptr,
            };
            self.inner.release(ptr)
        }

        fn memory(&self) -> &[u8] {
            self.inner.memory()
        }

        fn memory_mut(&mut self) -> &mut [u8] {
            self.inner.memory_mut()
        }

        fn remove_background(&mut self, ptr: usize, w: i32, h: i32, r: i32, g: i32, b: i32, t: i32) {
            if let Fault::PanicInEntryPoint = self.fault {
                panic!("engine trapped");
            }
            self.inner.remove_background(ptr, w, h, r, g, b, t)
        }

        fn enhance_color(&mut self, ptr: usize, w: i32, h: i32, r: i32, g: i32, b: i32, t: i32, boost: f32) {
            self.inner.enhance_color(ptr, w, h, r, g, b, t, boost)
        }

        fn live_allocations(&self) -> usize {
            self.inner.live_allocations()
        }
    }

    struct FaultyLoader {
        fault: Fault,
        limit: usize,
        loads: Arc<AtomicUsize>,
    }

    impl FaultyLoader {
        fn new(fault: Fault, limit: usize) -> Self {
            Self { fault, limit, loads: Arc::new(AtomicUsize::new(0)) }
        }
    }

    impl EngineLoader for FaultyLoader {
        fn load(&self) -> impl Future<Output = BridgeResult<Box<dyn NativeEngine>>> + Send {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let engine = FaultyEngine { inner: LinearMemoryEngine::new(self.limit), fault: self.fault };
            async move { Ok(Box::new(engine) as Box<dyn NativeEngine>) }
        }
    }

    fn params(threshold: u8) -> TransformParams {
        TransformParams::from_settings(
            Settings { target_color: Rgb(0, 255, 0), threshold },
            1.5,
        )
    }

    fn green_and_red() -> Vec<u8> {
        vec![0, 255, 0, 255, 255, 0, 0, 255]
    }

    async fn ready_bridge(fault: Fault, limit: usize) -> MarshallingBridge {
        let mut bridge = MarshallingBridge::new();
        bridge.initialize(&FaultyLoader::new(fault, limit)).await.unwrap();
        bridge
    }

    #[test]
    fn transform_before_initialize_fails() {
        let mut bridge = MarshallingBridge::new();
        let err = bridge
            .apply_transform(TransformKind::RemoveBackground, &green_and_red(), 2, 1, &params(30))
            .unwrap_err();
        assert_eq!(err, BridgeError::EngineNotReady);
        assert_eq!(bridge.live_allocations(), None);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let loader = FaultyLoader::new(Fault::None, 1024);
        let mut bridge = MarshallingBridge::new();
        bridge.initialize(&loader).await.unwrap();
        bridge.initialize(&loader).await.unwrap();
        assert!(bridge.is_ready());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn abi_mismatch_fails_at_startup() {
        let mut bridge = MarshallingBridge::new();
        let err = bridge
            .initialize(&FaultyLoader::new(Fault::WrongAbi, 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::EngineVersionMismatch { .. }));
        assert!(!bridge.is_ready());
    }

    #[tokio::test]
    async fn transform_returns_new_buffer_and_keeps_input() {
        let mut bridge = MarshallingBridge::new();
        bridge.initialize(&BuiltinEngineLoader::new(1024)).await.unwrap();
        let input = green_and_red();

        let output = bridge
            .apply_transform(TransformKind::RemoveBackground, &input, 2, 1, &params(30))
            .unwrap();

        assert_eq!(input, green_and_red());
        assert_eq!(output, vec![0, 255, 0, 0, 255, 0, 0, 255]);
        assert_eq!(bridge.live_allocations(), Some(0));
    }

    #[tokio::test]
    async fn enhance_goes_through_the_same_protocol() {
        let mut bridge = ready_bridge(Fault::None, 1024).await;
        let input = vec![0, 200, 0, 255];
        let output = bridge
            .apply_transform(TransformKind::EnhanceColor, &input, 1, 1, &params(80))
            .unwrap();
        assert_eq!(output, vec![0, 255, 0, 255]);
        assert_eq!(bridge.live_allocations(), Some(0));
    }

    #[tokio::test]
    async fn shape_mismatch_is_rejected_before_allocating() {
        let mut bridge = ready_bridge(Fault::None, 1024).await;
        let err = bridge
            .apply_transform(TransformKind::RemoveBackground, &[0u8; 7], 2, 1, &params(30))
            .unwrap_err();
        assert!(matches!(err, BridgeError::ShapeMismatch { expected: 8, actual: 7, .. }));
        assert_eq!(bridge.live_allocations(), Some(0));
    }

    #[tokio::test]
    async fn allocation_failure_leaves_no_region_behind() {
        let mut bridge = ready_bridge(Fault::None, 64).await;
        let small = green_and_red();
        bridge
            .apply_transform(TransformKind::RemoveBackground, &small, 2, 1, &params(30))
            .unwrap();
        let before = bridge.live_allocations();

        let big = vec![7u8; 16 * 16 * 4];
        let err = bridge
            .apply_transform(TransformKind::RemoveBackground, &big, 16, 16, &params(30))
            .unwrap_err();

        assert_eq!(err, BridgeError::OutOfForeignMemory { requested: big.len() });
        assert_eq!(big, vec![7u8; 16 * 16 * 4]);
        assert_eq!(bridge.live_allocations(), before);

        // the engine is still usable afterwards
        assert!(bridge
            .apply_transform(TransformKind::RemoveBackground, &small, 2, 1, &params(30))
            .is_ok());
        assert_eq!(bridge.live_allocations(), Some(0));
    }

    #[tokio::test]
    async fn panicking_entry_point_still_releases_scratch() {
        let mut bridge = ready_bridge(Fault::PanicInEntryPoint, 1024).await;
        let input = green_and_red();

        let result = catch_unwind(AssertUnwindSafe(|| {
            bridge.apply_transform(TransformKind::RemoveBackground, &input, 2, 1, &params(30))
        }));

        assert!(result.is_err());
        assert_eq!(bridge.live_allocations(), Some(0));
    }

    #[tokio::test]
    async fn out_of_bounds_region_faults_and_releases() {
        let mut bridge = ready_bridge(Fault::WildPointer, 1024).await;
        let err = bridge
            .apply_transform(TransformKind::RemoveBackground, &green_and_red(), 2, 1, &params(30))
            .unwrap_err();
        assert!(matches!(err, BridgeError::ForeignMemoryFault { .. }));
        assert_eq!(bridge.live_allocations(), Some(0));
    }
}
