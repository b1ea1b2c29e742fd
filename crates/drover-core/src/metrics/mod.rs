//! Metrics collection abstraction for drover.
//!
//! Task execution on runners and job dispatch on the dispatcher report through
//! [`MetricsBackend`]. Backends (prometheus, etc) are injected as a
//! [`MetricsHandle`]; [`noop_metrics`] is used when nothing is configured.
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, TaskOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
