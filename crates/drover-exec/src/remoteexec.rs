use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use drover_core::{ExecuteContext, MapState, Provider, ProviderError, RegisterContext, StateObject};
use drover_rpc::RpcClient;

use crate::settings::ExecSettings;

pub const REMOTEEXEC: &str = "remoteexec";

/// Runs a process on another runner through the `Execute` call.
///
/// Properties: `File` and `Args`, as for `localexec`. State: `Output`.
/// Without a configured client every task using it is rejected at dispatch.
#[derive(Clone, Default)]
pub struct RemoteExecProvider {
    client: Option<Arc<RpcClient>>,
}

impl RemoteExecProvider {
    pub fn new(client: Option<Arc<RpcClient>>) -> Self {
        Self { client }
    }

    fn client(&self) -> Result<&Arc<RpcClient>, ProviderError> {
        self.client.as_ref().ok_or_else(|| {
            ProviderError::InvalidSettings("remoteexec has no endpoint configured".into())
        })
    }
}

#[async_trait]
impl Provider for RemoteExecProvider {
    fn name(&self) -> &'static str {
        REMOTEEXEC
    }

    fn new_instance(&self) -> Arc<dyn Provider> {
        Arc::new(self.clone())
    }

    async fn register(&self, ctx: RegisterContext<'_>) -> Result<(), ProviderError> {
        self.client()?;
        ExecSettings::parse(REMOTEEXEC, ctx.properties())?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, ctx), fields(task = %ctx.task().title()))]
    async fn execute(&self, ctx: ExecuteContext<'_>) -> Result<Arc<dyn StateObject>, ProviderError> {
        let client = self.client()?;
        let request = ExecSettings::parse(REMOTEEXEC, ctx.properties())?.into_request();

        let bytes = client
            .execute(&request)
            .await
            .map_err(|e| ProviderError::Execution(format!("{}: {e}", client.endpoint())))?;
        debug!(endpoint = %client.endpoint(), bytes = bytes.len(), "remote process finished");

        Ok(Arc::new(MapState::new().with(
            "Output",
            String::from_utf8_lossy(&bytes).into_owned(),
        )))
    }
}
