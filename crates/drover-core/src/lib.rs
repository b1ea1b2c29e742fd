mod error;
pub use error::CoreError;

mod interpolate;
pub use interpolate::interpolate;

pub mod job;
pub use job::{EngineError, Job, JobBuilder, JobTrigger, Task};

pub mod metrics;
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, TaskOutcome, noop_metrics};

pub mod provider;
pub use provider::{ExecuteContext, Provider, ProviderError, ProviderRegistry, RegisterContext};

mod runner;
pub use runner::Runner;

mod state;
pub use state::{MapState, StateObject};

#[cfg(test)]
pub(crate) mod testkit;

pub mod prelude {
    pub use crate::error::CoreError;
    pub use crate::job::{EngineError, Job, JobTrigger};
    pub use crate::provider::{
        ExecuteContext, Provider, ProviderError, ProviderRegistry, RegisterContext,
    };
    pub use crate::runner::Runner;
    pub use crate::state::{MapState, StateObject};
}
