//! Provider contract: the pluggable capability behind each DSL keyword.
//!
//! A provider prototype is registered once in a [`ProviderRegistry`]. Jobs get
//! their own instances through [`Provider::new_instance`]; tasks of one job
//! that share an instance key share one instance, which lets a pair of tasks
//! (e.g. "listen" and "respond") keep state between them.
mod error;
pub use error::ProviderError;

mod registry;
pub use registry::ProviderRegistry;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use drover_model::RawProperties;

use crate::{
    job::{Job, JobTrigger, Task},
    state::StateObject,
};

/// Capability implemented by every task provider.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Stable identifier matched against the DSL block header.
    fn name(&self) -> &'static str;

    /// Create a fresh instance for a new job.
    fn new_instance(&self) -> Arc<dyn Provider>;

    /// Returns `true` if the provider re-runs its job on its own (timers,
    /// listeners). Jobs whose entry task is not an event source run once right
    /// after dispatch.
    fn is_event_source(&self) -> bool {
        false
    }

    /// Validate settings before the first execution.
    ///
    /// Called once per task bound to this instance. Event sources keep the
    /// [`JobTrigger`] to start the chain later.
    async fn register(&self, ctx: RegisterContext<'_>) -> Result<(), ProviderError>;

    /// Run the task and return its state.
    async fn execute(&self, ctx: ExecuteContext<'_>) -> Result<Arc<dyn StateObject>, ProviderError>;

    /// Release resources at shutdown.
    async fn cleanup(&self) {}
}

/// Arguments of [`Provider::register`].
pub struct RegisterContext<'a> {
    pub(crate) job: &'a Job,
    pub(crate) task: &'a Task,
    pub(crate) trigger: JobTrigger,
}

impl<'a> RegisterContext<'a> {
    pub fn job(&self) -> &'a Job {
        self.job
    }

    pub fn task(&self) -> &'a Task {
        self.task
    }

    /// Raw, not yet interpolated properties of the task.
    pub fn properties(&self) -> &'a RawProperties {
        self.task.properties()
    }

    /// Handle that re-runs the job starting at this task.
    pub fn trigger(&self) -> JobTrigger {
        self.trigger.clone()
    }
}

impl fmt::Debug for RegisterContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterContext")
            .field("job", &self.job.name())
            .field("task", &self.task.title())
            .finish()
    }
}

/// Arguments of [`Provider::execute`].
pub struct ExecuteContext<'a> {
    pub(crate) job: &'a Job,
    pub(crate) task: &'a Task,
    pub(crate) properties: RawProperties,
}

impl<'a> ExecuteContext<'a> {
    pub fn job(&self) -> &'a Job {
        self.job
    }

    pub fn task(&self) -> &'a Task {
        self.task
    }

    /// Properties after `$(Title.Property)` references were substituted.
    pub fn properties(&self) -> &RawProperties {
        &self.properties
    }
}

impl fmt::Debug for ExecuteContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteContext")
            .field("job", &self.job.name())
            .field("task", &self.task.title())
            .field("properties", &self.properties.as_str())
            .finish()
    }
}
