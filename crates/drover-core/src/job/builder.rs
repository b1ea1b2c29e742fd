use std::{collections::HashMap, sync::Arc};

use tracing::{debug, instrument};

use drover_model::JobDefinition;

use crate::{
    error::CoreError,
    job::{Job, Task, make_job_id},
    metrics::{MetricsHandle, noop_metrics},
    provider::{Provider, ProviderRegistry},
};

/// Turns a [`JobDefinition`] into a runnable [`Job`].
///
/// Every job gets fresh provider instances. Tasks with the same instance key
/// share one instance.
pub struct JobBuilder<'r> {
    registry: &'r ProviderRegistry,
    metrics: MetricsHandle,
}

impl<'r> JobBuilder<'r> {
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self {
            registry,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    #[instrument(level = "debug", skip(self, def), fields(job = %def.name, tasks = def.tasks.len()))]
    pub fn build(&self, def: &JobDefinition) -> Result<Job, CoreError> {
        def.validate()?;

        let mut instances: HashMap<&str, Arc<dyn Provider>> = HashMap::new();
        let mut tasks = Vec::with_capacity(def.tasks.len());

        for spec in &def.tasks {
            let provider = match instances.get(spec.instance_key.as_str()) {
                Some(bound) if bound.name() != spec.provider => {
                    return Err(CoreError::InstanceKeyConflict {
                        key: spec.instance_key.clone(),
                        bound: bound.name().to_string(),
                        requested: spec.provider.clone(),
                    });
                }
                Some(bound) => bound.clone(),
                None => {
                    let fresh = self.registry.instantiate(&spec.provider)?;
                    instances.insert(spec.instance_key.as_str(), fresh.clone());
                    fresh
                }
            };

            tasks.push(Task::new(
                spec.index,
                spec.title.clone(),
                spec.instance_key.clone(),
                spec.properties.clone(),
                provider,
            ));
        }

        let id = make_job_id(&def.name);
        debug!(id = %id, instances = instances.len(), "job built");
        Ok(Job::new(id, def.name.clone(), tasks, self.metrics.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakeProvider, job_def};
    use drover_model::ModelError;

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FakeProvider::new("ticker").event())).unwrap();
        registry.register(Arc::new(FakeProvider::new("localexec"))).unwrap();
        registry
    }

    #[test]
    fn tasks_sharing_a_key_share_an_instance() {
        let registry = registry();
        let def = job_def(
            "hello.job",
            &[
                ("T1", "ticker", "{}"),
                ("E1", "localexec", "{}"),
                ("E2", "localexec", "{}"),
            ],
        );

        let job = JobBuilder::new(&registry).build(&def).unwrap();

        assert!(job.id().starts_with("hello.job-"));
        assert_eq!(job.tasks().len(), 3);
        let e1 = job.task("E1").unwrap().provider();
        let e2 = job.task("E2").unwrap().provider();
        assert!(Arc::ptr_eq(e1, e2));
        assert!(!Arc::ptr_eq(job.entry().unwrap().provider(), e1));
    }

    #[test]
    fn each_build_gets_fresh_instances() {
        let registry = registry();
        let def = job_def("a.job", &[("T1", "ticker", "{}")]);
        let builder = JobBuilder::new(&registry);

        let first = builder.build(&def).unwrap();
        let second = builder.build(&def).unwrap();

        assert_ne!(first.id(), second.id());
        assert!(!Arc::ptr_eq(
            first.entry().unwrap().provider(),
            second.entry().unwrap().provider()
        ));
    }

    #[test]
    fn explicit_instance_keys_split_instances() {
        let registry = registry();
        let mut def = job_def(
            "split.job",
            &[("E1", "localexec", "{}"), ("E2", "localexec", "{}")],
        );
        def.tasks[1].instance_key = "other".into();

        let job = JobBuilder::new(&registry).build(&def).unwrap();
        assert!(!Arc::ptr_eq(
            job.task("E1").unwrap().provider(),
            job.task("E2").unwrap().provider()
        ));
        assert_eq!(job.task("E2").unwrap().instance_key(), "other");
    }

    #[test]
    fn conflicting_instance_key_is_rejected() {
        let registry = registry();
        let mut def = job_def(
            "conflict.job",
            &[("T1", "ticker", "{}"), ("E1", "localexec", "{}")],
        );
        def.tasks[1].instance_key = "ticker".into();

        match JobBuilder::new(&registry).build(&def) {
            Err(CoreError::InstanceKeyConflict {
                key,
                bound,
                requested,
            }) => {
                assert_eq!(key, "ticker");
                assert_eq!(bound, "ticker");
                assert_eq!(requested, "localexec");
            }
            other => panic!("expected InstanceKeyConflict, got {other:?}"),
        }
    }

    #[test]
    fn unknown_provider_and_invalid_definition() {
        let registry = registry();

        let def = job_def("x.job", &[("M1", "mongo", "{}")]);
        assert!(matches!(
            JobBuilder::new(&registry).build(&def),
            Err(CoreError::UnknownProvider(name)) if name == "mongo"
        ));

        let empty = job_def("empty.job", &[]);
        assert!(matches!(
            JobBuilder::new(&registry).build(&empty),
            Err(CoreError::Model(ModelError::EmptyJob(_)))
        ));
    }
}
