use std::sync::Arc;

/// Outcome of one task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Provider returned a state object.
    Success,
    /// Provider returned an error; the rest of the chain was skipped.
    Failure,
}

impl TaskOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskOutcome::Success => "success",
            TaskOutcome::Failure => "failure",
        }
    }
}

/// Backend metrics collection interface.
///
/// Runner-side events are keyed by provider name, dispatcher-side events by
/// runner endpoint. Both label sets stay small.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record one provider execution with its outcome and duration.
    fn record_task_completed(&self, provider: &str, outcome: TaskOutcome, duration_ms: u64);

    /// Record a job accepted by the runner at `endpoint`.
    fn record_job_dispatched(&self, endpoint: &str);

    /// Record a failed `Dispatch` call to `endpoint`.
    ///
    /// Transient transport failures are retried inside the client first; this
    /// is called once per job that still failed.
    fn record_dispatch_failed(&self, endpoint: &str);

    /// Record jobs taken away from an unready runner.
    fn record_jobs_moved(&self, endpoint: &str, count: usize);

    /// Record the readiness observed by the health sweep.
    fn record_client_ready(&self, endpoint: &str, ready: bool);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
