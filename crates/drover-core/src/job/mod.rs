//! Runner-side job engine.
//!
//! A [`Job`] is an ordered chain of [`Task`]s, each bound to a provider
//! instance. [`Job::run`] walks the chain from the task bound to a given
//! instance to the end, rendering each task's properties against the state of
//! earlier tasks before executing it.
mod builder;
pub use builder::JobBuilder;

mod error;
pub use error::EngineError;

mod id;
pub use id::make_job_id;

use std::{
    fmt,
    sync::{Arc, Weak},
    time::Instant,
};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, trace};

use drover_model::RawProperties;

use crate::{
    interpolate::interpolate,
    metrics::{MetricsHandle, TaskOutcome},
    provider::{ExecuteContext, Provider, RegisterContext},
    state::StateObject,
};

/// One link of a job chain.
pub struct Task {
    index: usize,
    title: String,
    provider_name: String,
    instance_key: String,
    properties: RawProperties,
    provider: Arc<dyn Provider>,
    state: RwLock<Option<Arc<dyn StateObject>>>,
}

impl Task {
    pub(crate) fn new(
        index: usize,
        title: String,
        instance_key: String,
        properties: RawProperties,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            index,
            title,
            provider_name: provider.name().to_string(),
            instance_key,
            properties,
            provider,
            state: RwLock::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn instance_key(&self) -> &str {
        &self.instance_key
    }

    /// Properties as parsed, before interpolation.
    pub fn properties(&self) -> &RawProperties {
        &self.properties
    }

    /// The provider instance this task is bound to.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// State from the most recent successful execution.
    pub fn state(&self) -> Option<Arc<dyn StateObject>> {
        self.state.read().clone()
    }

    fn set_state(&self, state: Arc<dyn StateObject>) {
        *self.state.write() = Some(state);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("index", &self.index)
            .field("title", &self.title)
            .field("provider", &self.provider_name)
            .field("instance_key", &self.instance_key)
            .field("has_state", &self.state.read().is_some())
            .finish()
    }
}

/// A dispatched job on a runner.
pub struct Job {
    id: String,
    name: String,
    tasks: Vec<Task>,
    /// Serialises runs so chains of the same job never interleave.
    run_lock: Mutex<()>,
    metrics: MetricsHandle,
}

impl Job {
    pub(crate) fn new(id: String, name: String, tasks: Vec<Task>, metrics: MetricsHandle) -> Self {
        Self {
            id,
            name,
            tasks,
            run_lock: Mutex::new(()),
            metrics,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The event task the chain is entered at.
    pub fn entry(&self) -> Option<&Task> {
        self.tasks.first()
    }

    pub fn task(&self, title: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.title == title)
    }

    /// State of the task with the given title, if it has executed.
    pub fn state_of(&self, title: &str) -> Option<Arc<dyn StateObject>> {
        self.task(title).and_then(Task::state)
    }

    /// Substitute `$(Title.Property)` references using the current task states.
    pub fn interpolate(&self, input: &str) -> String {
        interpolate(input, |title, property| {
            self.state_of(title)?.get_property(property)
        })
    }

    /// Position of the first task bound to `provider`.
    pub fn position_of(&self, provider: &Arc<dyn Provider>) -> Option<usize> {
        self.tasks
            .iter()
            .position(|t| Arc::ptr_eq(&t.provider, provider))
    }

    /// Execute the chain from the first task bound to `from` through the end.
    pub async fn run(&self, from: &Arc<dyn Provider>) -> Result<(), EngineError> {
        let start = self
            .position_of(from)
            .ok_or_else(|| EngineError::NotInChain(self.name.clone()))?;
        self.run_from(start).await
    }

    /// Execute tasks `start..` in order.
    ///
    /// The first provider error stops the run; tasks after it keep the state of
    /// their previous execution.
    #[instrument(level = "debug", skip(self), fields(job = %self.id))]
    pub async fn run_from(&self, start: usize) -> Result<(), EngineError> {
        let _guard = self.run_lock.lock().await;

        for task in self.tasks.iter().skip(start) {
            let rendered = RawProperties::new(self.interpolate(task.properties.as_str()));
            trace!(task = %task.title, properties = %rendered, "executing task");

            let started = Instant::now();
            let ctx = ExecuteContext {
                job: self,
                task,
                properties: rendered,
            };
            let result = task.provider.execute(ctx).await;
            let elapsed = started.elapsed().as_millis() as u64;

            match result {
                Ok(state) => {
                    self.metrics.record_task_completed(
                        &task.provider_name,
                        TaskOutcome::Success,
                        elapsed,
                    );
                    task.set_state(state);
                    debug!(task = %task.title, provider = %task.provider_name, elapsed_ms = elapsed, "task completed");
                }
                Err(source) => {
                    self.metrics.record_task_completed(
                        &task.provider_name,
                        TaskOutcome::Failure,
                        elapsed,
                    );
                    error!(task = %task.title, provider = %task.provider_name, error = %source, "task failed; chain stopped");
                    return Err(EngineError::TaskFailed {
                        provider: task.provider_name.clone(),
                        title: task.title.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Call [`Provider::register`] for every task.
    pub(crate) async fn register(self: &Arc<Self>) -> Result<(), EngineError> {
        for task in &self.tasks {
            let ctx = RegisterContext {
                job: self.as_ref(),
                task,
                trigger: JobTrigger {
                    job: Arc::downgrade(self),
                    task: task.index,
                },
            };
            task.provider
                .register(ctx)
                .await
                .map_err(|source| EngineError::RegisterFailed {
                    provider: task.provider_name.clone(),
                    title: task.title.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Call [`Provider::cleanup`] once per distinct instance.
    pub(crate) async fn cleanup(&self) {
        let mut done: Vec<&Arc<dyn Provider>> = Vec::new();
        for task in &self.tasks {
            if done.iter().any(|p| Arc::ptr_eq(p, &task.provider)) {
                continue;
            }
            task.provider.cleanup().await;
            done.push(&task.provider);
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .finish()
    }
}

/// Handle an event provider keeps to re-run its job.
///
/// Holds the job weakly: once the runner drops the job, firing returns
/// [`EngineError::Released`].
#[derive(Debug, Clone)]
pub struct JobTrigger {
    job: Weak<Job>,
    task: usize,
}

impl JobTrigger {
    /// Run the job from the task this trigger was issued for.
    pub async fn fire(&self) -> Result<(), EngineError> {
        let job = self.job.upgrade().ok_or(EngineError::Released)?;
        job.run_from(self.task).await
    }

    /// Index of the task the trigger starts at.
    pub fn task_index(&self) -> usize {
        self.task
    }
}
