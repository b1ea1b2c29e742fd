//! Fake providers for the core unit tests.
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;

use drover_model::{JobDefinition, RawProperties, TaskRole, TaskSpec};

use crate::{
    job::JobTrigger,
    provider::{ExecuteContext, Provider, ProviderError, RegisterContext},
    state::{MapState, StateObject},
};

/// Everything a [`FakeProvider`] observed, shared by all of its instances.
#[derive(Default)]
pub(crate) struct Probe {
    /// `(title, rendered properties)` per execution.
    pub executions: Mutex<Vec<(String, String)>>,
    pub registrations: Mutex<Vec<String>>,
    pub triggers: Mutex<Vec<JobTrigger>>,
    pub instances: AtomicUsize,
    pub cleanups: AtomicUsize,
}

impl Probe {
    pub fn executed_titles(&self) -> Vec<String> {
        self.executions.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn instances(&self) -> usize {
        self.instances.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub(crate) struct FakeProvider {
    name: &'static str,
    event: bool,
    fail_title: Option<&'static str>,
    reject_title: Option<&'static str>,
    probe: Arc<Probe>,
}

impl FakeProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            event: false,
            fail_title: None,
            reject_title: None,
            probe: Arc::new(Probe::default()),
        }
    }

    pub fn event(mut self) -> Self {
        self.event = true;
        self
    }

    pub fn failing_on(mut self, title: &'static str) -> Self {
        self.fail_title = Some(title);
        self
    }

    pub fn rejecting(mut self, title: &'static str) -> Self {
        self.reject_title = Some(title);
        self
    }

    pub fn probe(&self) -> Arc<Probe> {
        self.probe.clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn new_instance(&self) -> Arc<dyn Provider> {
        self.probe.instances.fetch_add(1, Ordering::SeqCst);
        Arc::new(self.clone())
    }

    fn is_event_source(&self) -> bool {
        self.event
    }

    async fn register(&self, ctx: RegisterContext<'_>) -> Result<(), ProviderError> {
        let title = ctx.task().title().to_string();
        self.probe.registrations.lock().push(title.clone());
        if self.reject_title == Some(title.as_str()) {
            return Err(ProviderError::InvalidSettings(format!("{title} rejected")));
        }
        self.probe.triggers.lock().push(ctx.trigger());
        Ok(())
    }

    async fn execute(
        &self,
        ctx: ExecuteContext<'_>,
    ) -> Result<Arc<dyn StateObject>, ProviderError> {
        let title = ctx.task().title().to_string();
        self.probe
            .executions
            .lock()
            .push((title.clone(), ctx.properties().as_str().to_string()));
        if self.fail_title == Some(title.as_str()) {
            return Err(ProviderError::Execution("boom".into()));
        }
        Ok(Arc::new(
            MapState::new().with("X", "42").with("Title", title),
        ))
    }

    async fn cleanup(&self) {
        self.probe.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build a job definition from `(title, provider, properties)` triples.
pub(crate) fn job_def(name: &str, tasks: &[(&str, &str, &str)]) -> JobDefinition {
    JobDefinition {
        name: name.to_string(),
        tasks: tasks
            .iter()
            .enumerate()
            .map(|(index, (title, provider, props))| TaskSpec {
                index,
                title: title.to_string(),
                provider: provider.to_string(),
                instance_key: provider.to_string(),
                role: if index == 0 {
                    TaskRole::Event
                } else {
                    TaskRole::Action
                },
                properties: RawProperties::new(*props),
            })
            .collect(),
    }
}
