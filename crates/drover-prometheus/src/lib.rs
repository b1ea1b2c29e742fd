//! Prometheus metrics backend for drover.
//!
//! [`PrometheusMetrics`] implements [`drover_core::MetricsBackend`] on its own
//! registry. Inject it as a `MetricsHandle` into the runner's `JobBuilder` or
//! the dispatcher's `DispatchManager`, then serve [`PrometheusMetrics::encode`]
//! from a `/metrics` route.
//!
//! ```rust
//! use std::sync::Arc;
//! use drover_core::{MetricsBackend, MetricsHandle};
//! use drover_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: MetricsHandle = Arc::new(metrics.clone());
//!
//! handle.record_job_dispatched("10.0.0.7:8103");
//! let body = metrics.encode()?;
//! assert!(body.contains("drover_jobs_dispatched_total"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `drover_tasks_completed_total{provider, outcome}` - Counter
//! - `drover_task_duration_seconds{provider}` - Histogram
//! - `drover_jobs_dispatched_total{endpoint}` - Counter
//! - `drover_dispatch_failures_total{endpoint}` - Counter
//! - `drover_jobs_moved_total{endpoint}` - Counter
//! - `drover_client_ready{endpoint}` - Gauge (1 ready, 0 not)

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
