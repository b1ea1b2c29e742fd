//! Runner-side service: builds, registers and keeps dispatched jobs.
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use drover_model::JobDefinition;

use crate::{
    error::CoreError,
    job::{Job, JobBuilder},
    metrics::{MetricsHandle, noop_metrics},
    provider::ProviderRegistry,
};

/// Holds the provider registry and every job dispatched to this runner.
pub struct Runner {
    registry: ProviderRegistry,
    metrics: MetricsHandle,
    jobs: Mutex<Vec<Arc<Job>>>,
}

impl Runner {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            metrics: noop_metrics(),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Accept a job definition.
    ///
    /// Builds the job, registers every task, then keeps the job. When the entry
    /// provider is not an event source the chain runs once in the background.
    /// Returns the job id.
    #[instrument(level = "info", skip(self, def), fields(job = %def.name))]
    pub async fn dispatch(&self, def: &JobDefinition) -> Result<String, CoreError> {
        let job = Arc::new(
            JobBuilder::new(&self.registry)
                .with_metrics(self.metrics.clone())
                .build(def)?,
        );

        if let Err(e) = job.register().await {
            warn!(error = %e, "registration failed; releasing job");
            job.cleanup().await;
            return Err(e.into());
        }

        let id = job.id().to_string();
        let self_triggered = job
            .entry()
            .is_some_and(|task| task.provider().is_event_source());
        self.jobs.lock().push(job.clone());
        info!(id = %id, tasks = job.tasks().len(), "job accepted");

        if !self_triggered {
            tokio::spawn(async move {
                if let Err(e) = job.run_from(0).await {
                    error!(job = %job.id(), error = %e, "initial run failed");
                }
            });
        }
        Ok(id)
    }

    /// Names of the dispatched jobs, in dispatch order.
    pub fn jobs(&self) -> Vec<String> {
        self.jobs.lock().iter().map(|j| j.name().to_string()).collect()
    }

    /// Look up a dispatched job by id.
    pub fn job(&self, id: &str) -> Option<Arc<Job>> {
        self.jobs.lock().iter().find(|j| j.id() == id).cloned()
    }

    /// Release every job and call [`Provider::cleanup`](crate::Provider::cleanup) on its instances.
    pub async fn cleanup(&self) {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        for job in jobs {
            debug!(job = %job.id(), "cleaning up");
            job.cleanup().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        job::EngineError,
        testkit::{FakeProvider, Probe, job_def},
    };

    async fn wait_for_executions(probe: &Probe, count: usize) {
        for _ in 0..100 {
            if probe.executions.lock().len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {count} executions, got {:?}", probe.executed_titles());
    }

    #[tokio::test]
    async fn non_event_entry_runs_once_after_dispatch() {
        let exec = FakeProvider::new("localexec");
        let probe = exec.probe();
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(exec)).unwrap();
        let runner = Runner::new(registry);

        let def = job_def(
            "once.job",
            &[("E1", "localexec", "{}"), ("E2", "localexec", r#"{"In":"$(E1.X)"}"#)],
        );
        let id = runner.dispatch(&def).await.unwrap();

        wait_for_executions(&probe, 2).await;
        assert_eq!(probe.executed_titles(), vec!["E1", "E2"]);
        assert_eq!(probe.executions.lock()[1].1, r#"{"In":"42"}"#);
        assert_eq!(runner.jobs(), vec!["once.job"]);
        assert!(runner.job(&id).is_some());
    }

    #[tokio::test]
    async fn event_entry_waits_for_its_trigger() {
        let ticker = FakeProvider::new("ticker").event();
        let ticker_probe = ticker.probe();
        let exec = FakeProvider::new("localexec");
        let exec_probe = exec.probe();
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(ticker)).unwrap();
        registry.register(Arc::new(exec)).unwrap();
        let runner = Runner::new(registry);

        let def = job_def("tick.job", &[("T1", "ticker", "{}"), ("E1", "localexec", "{}")]);
        runner.dispatch(&def).await.unwrap();

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(exec_probe.executed_titles().is_empty());
        assert_eq!(*ticker_probe.registrations.lock(), vec!["T1"]);

        let trigger = ticker_probe.triggers.lock()[0].clone();
        trigger.fire().await.unwrap();
        assert_eq!(exec_probe.executed_titles(), vec!["E1"]);

        runner.cleanup().await;
        assert!(runner.jobs().is_empty());
        assert!(matches!(trigger.fire().await, Err(EngineError::Released)));
    }

    #[tokio::test]
    async fn rejected_registration_releases_the_job() {
        let exec = FakeProvider::new("localexec").rejecting("E2");
        let probe = exec.probe();
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(exec)).unwrap();
        let runner = Runner::new(registry);

        let def = job_def("bad.job", &[("E1", "localexec", "{}"), ("E2", "localexec", "{}")]);
        match runner.dispatch(&def).await {
            Err(CoreError::Engine(EngineError::RegisterFailed { title, .. })) => {
                assert_eq!(title, "E2")
            }
            other => panic!("expected RegisterFailed, got {other:?}"),
        }

        assert!(runner.jobs().is_empty());
        assert_eq!(probe.cleanups(), 1);
        assert!(probe.executed_titles().is_empty());
    }

    #[tokio::test]
    async fn cleanup_reaches_every_job() {
        let exec = FakeProvider::new("localexec");
        let probe = exec.probe();
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(exec)).unwrap();
        let runner = Runner::new(registry);

        for name in ["a.job", "b.job"] {
            runner
                .dispatch(&job_def(name, &[("E1", "localexec", "{}")]))
                .await
                .unwrap();
        }
        wait_for_executions(&probe, 2).await;

        runner.cleanup().await;
        assert_eq!(probe.cleanups(), 2);
        assert_eq!(runner.registry().names(), vec!["localexec"]);
    }
}
