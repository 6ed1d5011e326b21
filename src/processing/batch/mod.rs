mod scheduler;

pub use scheduler::{
    cooperative_yield, BatchReport, BatchScheduler, ItemFailure, RunMonitor, SchedulerState,
};
