use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use drover_core::{ExecuteContext, MapState, Provider, ProviderError, RegisterContext, StateObject};

use crate::{process::run_process, settings::ExecSettings};

pub const LOCALEXEC: &str = "localexec";

/// Runs a process on the runner host.
///
/// Properties: `File` (required) and `Args` (list or scalar). State: `Stdout`,
/// `Stderr`, `Output` (same as `Stdout`) and `ExitCode`. A non-zero exit fails
/// the task.
#[derive(Debug, Clone)]
pub struct LocalExecProvider {
    cancel: CancellationToken,
}

impl LocalExecProvider {
    /// `cancel` kills running processes on shutdown.
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

#[async_trait]
impl Provider for LocalExecProvider {
    fn name(&self) -> &'static str {
        LOCALEXEC
    }

    fn new_instance(&self) -> Arc<dyn Provider> {
        Arc::new(Self::new(self.cancel.child_token()))
    }

    async fn register(&self, ctx: RegisterContext<'_>) -> Result<(), ProviderError> {
        ExecSettings::parse(LOCALEXEC, ctx.properties())?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, ctx), fields(task = %ctx.task().title()))]
    async fn execute(&self, ctx: ExecuteContext<'_>) -> Result<Arc<dyn StateObject>, ProviderError> {
        let request = ExecSettings::parse(LOCALEXEC, ctx.properties())?.into_request();
        let output = run_process(&request, &self.cancel)
            .await?
            .into_success(&request.file)?;

        let stdout = output.stdout_lossy();
        debug!(file = %request.file, bytes = output.stdout.len(), "process finished");
        Ok(Arc::new(
            MapState::new()
                .with("Stdout", stdout.clone())
                .with("Output", stdout)
                .with("Stderr", output.stderr_lossy())
                .with("ExitCode", output.code.unwrap_or_default().to_string()),
        ))
    }

    async fn cleanup(&self) {
        self.cancel.cancel();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testkit::{Recorder, dispatch, recorder_registry};
    use drover_core::EngineError;

    #[tokio::test]
    async fn output_flows_into_the_next_task() {
        let (mut registry, seen) = recorder_registry();
        registry
            .register(Arc::new(LocalExecProvider::new(CancellationToken::new())))
            .unwrap();

        let (runner, id) = dispatch(
            registry,
            "echo.job",
            &[
                ("E1", LOCALEXEC, r#"{"File":"/bin/echo","Args":["hi"]}"#),
                ("R1", Recorder::NAME, r#"{"Got":"$(E1.Output)","Code":"$(E1.ExitCode)"}"#),
            ],
        )
        .await;

        let rendered = Recorder::wait_for(&seen, 1).await;
        assert_eq!(rendered[0], r#"{"Got":"hi\n","Code":"0"}"#);

        let job = runner.job(&id).unwrap();
        let state = job.state_of("E1").unwrap();
        assert_eq!(state.get_property("Stdout").as_deref(), Some("hi\n"));
        assert_eq!(state.get_property("Stderr").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn failing_process_stops_the_chain() {
        let (mut registry, seen) = recorder_registry();
        registry
            .register(Arc::new(LocalExecProvider::new(CancellationToken::new())))
            .unwrap();

        let (runner, id) = dispatch(
            registry,
            "fail.job",
            &[
                ("E1", LOCALEXEC, r#"{"File":"/bin/sh","Args":["-c","exit 2"]}"#),
                ("R1", Recorder::NAME, "{}"),
            ],
        )
        .await;

        let job = runner.job(&id).unwrap();
        let entry = job.entry().unwrap().provider().clone();
        match job.run(&entry).await {
            Err(EngineError::TaskFailed { provider, title, .. }) => {
                assert_eq!(provider, LOCALEXEC);
                assert_eq!(title, "E1");
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_rejected_at_dispatch() {
        let (mut registry, _seen) = recorder_registry();
        registry
            .register(Arc::new(LocalExecProvider::new(CancellationToken::new())))
            .unwrap();
        let runner = drover_core::Runner::new(registry);

        let def = crate::testkit::job_def("bad.job", &[("E1", LOCALEXEC, r#"{"Args":["x"]}"#)]);
        assert!(runner.dispatch(&def).await.is_err());
        assert!(runner.jobs().is_empty());
    }
}
