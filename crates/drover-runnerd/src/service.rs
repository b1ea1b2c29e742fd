use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use drover_core::Runner;
use drover_exec::run_process;
use drover_model::{ExecRequest, JobDefinition};
use drover_rpc::{HandlerError, RpcHandler};

/// Serves dispatcher calls with a local [`Runner`].
pub struct RunnerService {
    runner: Arc<Runner>,
}

impl RunnerService {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl RpcHandler for RunnerService {
    #[instrument(level = "info", skip(self, job), fields(job = %job.name))]
    async fn dispatch(&self, job: JobDefinition) -> Result<(), HandlerError> {
        match self.runner.dispatch(&job).await {
            Ok(id) => {
                info!(%id, tasks = job.tasks.len(), "job accepted");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "job rejected");
                Err(HandlerError::new(e.to_string()))
            }
        }
    }

    #[instrument(level = "debug", skip(self, request, cancel), fields(file = %request.file))]
    async fn execute(
        &self,
        request: ExecRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, HandlerError> {
        let output = run_process(&request, &cancel)
            .await
            .and_then(|output| output.into_success(&request.file))
            .map_err(|e| HandlerError::new(e.to_string()))?;
        Ok(output.stdout)
    }
}
