use crate::metrics::backend::{MetricsBackend, TaskOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_task_completed(&self, _: &str, _: TaskOutcome, _: u64) {}

    #[inline(always)]
    fn record_job_dispatched(&self, _: &str) {}

    #[inline(always)]
    fn record_dispatch_failed(&self, _: &str) {}

    #[inline(always)]
    fn record_jobs_moved(&self, _: &str, _: usize) {}

    #[inline(always)]
    fn record_client_ready(&self, _: &str, _: bool) {}
}
