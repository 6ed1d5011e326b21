use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{BatchProgress, ItemStore, TransformKind, TransformParams};
use crate::processing::bridge::MarshallingBridge;
use crate::processing::export::{ExportArtifact, ExportPackager};
use crate::utils::{PipelineError, PipelineResult};

/// Where the scheduler is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum SchedulerState {
    Idle,
    Running { index: usize, total: usize },
    Completed,
}

/// Shared view of the scheduler for observers on other tasks.
///
/// Reports the run state and carries abort requests, which are honoured
/// between items only.
#[derive(Debug, Clone)]
pub struct RunMonitor {
    state: Arc<Mutex<SchedulerState>>,
    abort: Arc<AtomicBool>,
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState::Idle)),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl RunMonitor {
    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), SchedulerState::Running { .. })
    }

    /// Asks the active run to stop before its next item. No effect when idle.
    pub fn request_abort(&self) {
        if self.is_running() {
            self.abort.store(true, Ordering::SeqCst);
        }
    }

    fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }
}

/// Marks a run active; returns the scheduler to `Idle` when dropped, so a
/// failed or dropped run never leaves it stuck in `Running`.
struct RunGuard {
    monitor: RunMonitor,
}

impl RunGuard {
    fn set(&self, state: SchedulerState) {
        *self.monitor.state.lock() = state;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.set(SchedulerState::Idle);
        self.monitor.abort.store(false, Ordering::SeqCst);
    }
}

/// Suspends once so the host executor can run other work.
///
/// Works on any executor: the task wakes itself and completes on the next poll.
pub fn cooperative_yield() -> impl Future<Output = ()> {
    YieldNow { yielded: false }
}

struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// A skipped item and why.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub index: usize,
    pub name: String,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    pub failed: Vec<ItemFailure>,
    /// The run stopped early on request
    pub aborted: bool,
    /// Present when the run completed and at least one item is done
    pub archive: Option<ExportArtifact>,
    /// Set when packaging failed after a completed run
    pub export_error: Option<String>,
}

/// Drives the bridge across the queue, one item at a time.
pub struct BatchScheduler {
    monitor: RunMonitor,
    boost: f32,
}

impl BatchScheduler {
    pub fn new(boost: f32) -> Self {
        Self {
            monitor: RunMonitor::default(),
            boost,
        }
    }

    pub fn monitor(&self) -> RunMonitor {
        self.monitor.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.monitor.state()
    }

    fn begin(&self, total: usize) -> PipelineResult<RunGuard> {
        let mut state = self.monitor.state.lock();
        if matches!(*state, SchedulerState::Running { .. }) {
            return Err(PipelineError::SchedulerBusy);
        }
        *state = SchedulerState::Running { index: 0, total };
        self.monitor.abort.store(false, Ordering::SeqCst);
        Ok(RunGuard { monitor: self.monitor.clone() })
    }

    /// Runs `kind` on one item with its current settings and stores the result.
    pub fn process_item(
        &self,
        store: &mut ItemStore,
        bridge: &mut MarshallingBridge,
        index: usize,
        kind: TransformKind,
    ) -> PipelineResult<()> {
        if self.monitor.is_running() {
            return Err(PipelineError::SchedulerBusy);
        }
        transform_item(store, bridge, index, kind, self.boost)
    }

    /// Removes the background of every item in queue order.
    ///
    /// Emits one progress event per item and yields between items. A failing
    /// item is reported and skipped; only an exhausted engine ends the run
    /// with an error. When the run completes, `exporter` (if any) packages
    /// the finished items.
    pub async fn run_batch<F>(
        &self,
        store: &mut ItemStore,
        bridge: &mut MarshallingBridge,
        exporter: Option<&ExportPackager>,
        mut on_progress: F,
    ) -> PipelineResult<BatchReport>
    where
        F: FnMut(&BatchProgress),
    {
        let total = store.len();
        if total == 0 {
            debug!("Batch requested on an empty queue");
            return Ok(BatchReport::default());
        }

        let guard = self.begin(total)?;
        info!("Processing batch of {} images", total);
        let mut report = BatchReport { total, ..Default::default() };

        for index in 0..total {
            if self.monitor.abort_requested() {
                warn!("Batch aborted after {} of {} images", index, total);
                report.aborted = true;
                return Ok(report);
            }
            guard.set(SchedulerState::Running { index, total });

            let name = store.get(index)?.name().to_string();
            let error = match transform_item(store, bridge, index, TransformKind::RemoveBackground, self.boost) {
                Ok(()) => {
                    report.processed += 1;
                    None
                }
                Err(PipelineError::Bridge(e)) if e.is_engine_exhausted() => {
                    warn!("Engine unusable at '{}', stopping batch: {}", name, e);
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Processing failed for {}: {}", name, e);
                    let error = e.to_string();
                    report.failed.push(ItemFailure { index, name: name.clone(), error: error.clone() });
                    Some(error)
                }
            };

            on_progress(&BatchProgress::new(index + 1, total, &name, error));

            if index + 1 < total {
                cooperative_yield().await;
            }
        }

        guard.set(SchedulerState::Completed);
        if report.failed.is_empty() {
            info!("Batch processing completed successfully: {} images processed", report.processed);
        } else {
            warn!(
                "Batch processing completed with {} failed images out of {}",
                report.failed.len(),
                total
            );
        }

        if let Some(exporter) = exporter {
            match exporter.export_batch(store.items()) {
                Ok(archive) => report.archive = archive,
                Err(e) => {
                    warn!("Batch export failed: {}", e);
                    report.export_error = Some(e.to_string());
                }
            }
        }

        Ok(report)
    }
}

fn transform_item(
    store: &mut ItemStore,
    bridge: &mut MarshallingBridge,
    index: usize,
    kind: TransformKind,
    boost: f32,
) -> PipelineResult<()> {
    let item = store.get(index)?;
    let params = TransformParams::from_settings(item.settings, boost);
    let pixels = bridge.apply_transform(kind, item.original(), item.width(), item.height(), &params)?;

    debug!("{:?} applied to '{}'", kind, item.name());
    store.get_mut(index)?.set_processed(pixels);
    Ok(())
}
