//! Helpers for the provider tests.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;

use drover_core::{
    ExecuteContext, MapState, Provider, ProviderError, ProviderRegistry, RegisterContext, Runner,
    StateObject,
};
use drover_model::{JobDefinition, RawProperties, TaskRole, TaskSpec};

pub(crate) type Seen = Arc<Mutex<Vec<String>>>;

/// Action provider that records its rendered properties.
#[derive(Clone)]
pub(crate) struct Recorder {
    seen: Seen,
}

impl Recorder {
    pub const NAME: &'static str = "recorder";

    /// Wait until `count` executions were recorded and return them.
    pub async fn wait_for(seen: &Seen, count: usize) -> Vec<String> {
        for _ in 0..500 {
            {
                let seen = seen.lock();
                if seen.len() >= count {
                    return seen.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} recorded executions, got {:?}", seen.lock());
    }
}

#[async_trait]
impl Provider for Recorder {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn new_instance(&self) -> Arc<dyn Provider> {
        Arc::new(self.clone())
    }

    async fn register(&self, _ctx: RegisterContext<'_>) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn execute(&self, ctx: ExecuteContext<'_>) -> Result<Arc<dyn StateObject>, ProviderError> {
        self.seen.lock().push(ctx.properties().as_str().to_string());
        Ok(Arc::new(MapState::new()))
    }
}

/// Registry holding only a [`Recorder`].
pub(crate) fn recorder_registry() -> (ProviderRegistry, Seen) {
    let seen = Seen::default();
    let mut registry = ProviderRegistry::new();
    registry
        .register(Arc::new(Recorder { seen: seen.clone() }))
        .unwrap();
    (registry, seen)
}

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

/// Dispatch one job to a fresh runner.
pub(crate) async fn dispatch(
    registry: ProviderRegistry,
    name: &str,
    tasks: &[(&str, &str, &str)],
) -> (Arc<Runner>, String) {
    let runner = Arc::new(Runner::new(registry));
    let id = runner.dispatch(&job_def(name, tasks)).await.unwrap();
    (runner, id)
}
