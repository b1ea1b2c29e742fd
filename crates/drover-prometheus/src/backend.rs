use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder, proto::MetricFamily,
};

use drover_core::{MetricsBackend, TaskOutcome};

const NAMESPACE: &str = "drover";

/// Prometheus metrics backend for drover.
///
/// ## Label cardinality
/// - `provider`: registered provider names ("ticker", "localexec", ...)
/// - `outcome`: "success", "failure"
/// - `endpoint`: one value per configured runner
#[derive(Clone)]
pub struct PrometheusMetrics {
    tasks_completed: CounterVec,
    task_duration: HistogramVec,
    jobs_dispatched: IntCounterVec,
    dispatch_failures: IntCounterVec,
    jobs_moved: IntCounterVec,
    client_ready: IntGaugeVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a backend that registers its collectors into `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let tasks_completed = CounterVec::new(
            Opts::new("tasks_completed_total", "Provider executions by outcome")
                .namespace(NAMESPACE),
            &["provider", "outcome"],
        )?;
        registry.register(Box::new(tasks_completed.clone()))?;

        let task_duration = HistogramVec::new(
            HistogramOpts::new("task_duration_seconds", "Provider execution time in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
            &["provider"],
        )?;
        registry.register(Box::new(task_duration.clone()))?;

        let jobs_dispatched = IntCounterVec::new(
            Opts::new("jobs_dispatched_total", "Jobs accepted by a runner").namespace(NAMESPACE),
            &["endpoint"],
        )?;
        registry.register(Box::new(jobs_dispatched.clone()))?;

        let dispatch_failures = IntCounterVec::new(
            Opts::new("dispatch_failures_total", "Dispatch calls that failed after retries")
                .namespace(NAMESPACE),
            &["endpoint"],
        )?;
        registry.register(Box::new(dispatch_failures.clone()))?;

        let jobs_moved = IntCounterVec::new(
            Opts::new("jobs_moved_total", "Jobs taken away from an unready runner")
                .namespace(NAMESPACE),
            &["endpoint"],
        )?;
        registry.register(Box::new(jobs_moved.clone()))?;

        let client_ready = IntGaugeVec::new(
            Opts::new("client_ready", "Runner readiness seen by the last health sweep")
                .namespace(NAMESPACE),
            &["endpoint"],
        )?;
        registry.register(Box::new(client_ready.clone()))?;

        Ok(Self {
            tasks_completed,
            task_duration,
            jobs_dispatched,
            dispatch_failures,
            jobs_moved,
            client_ready,
            registry,
        })
    }

    /// Create a backend with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_task_completed(&self, provider: &str, outcome: TaskOutcome, duration_ms: u64) {
        self.tasks_completed
            .with_label_values(&[provider, outcome.as_label()])
            .inc();
        self.task_duration
            .with_label_values(&[provider])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_job_dispatched(&self, endpoint: &str) {
        self.jobs_dispatched.with_label_values(&[endpoint]).inc();
    }

    fn record_dispatch_failed(&self, endpoint: &str) {
        self.dispatch_failures.with_label_values(&[endpoint]).inc();
    }

    fn record_jobs_moved(&self, endpoint: &str, count: usize) {
        self.jobs_moved
            .with_label_values(&[endpoint])
            .inc_by(count as u64);
    }

    fn record_client_ready(&self, endpoint: &str, ready: bool) {
        self.client_ready
            .with_label_values(&[endpoint])
            .set(i64::from(ready));
    }
}
