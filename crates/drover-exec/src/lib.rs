//! Built-in providers and the process executor behind the `Execute` call.
mod error;
pub use error::ExecError;

mod localexec;
pub use localexec::{LOCALEXEC, LocalExecProvider};

mod process;
pub use process::{ProcessOutput, run_process};

mod remoteexec;
pub use remoteexec::{REMOTEEXEC, RemoteExecProvider};

mod settings;

mod ticker;
pub use ticker::{Period, TICKER, TickerProvider};

#[cfg(test)]
pub(crate) mod testkit;

use std::sync::Arc;

use drover_core::{CoreError, ProviderRegistry};
use drover_rpc::RpcClient;
use tokio_util::sync::CancellationToken;

/// Register `ticker`, `localexec` and `remoteexec`.
///
/// `shutdown` stops timers and kills running processes. `remote` is the client
/// `remoteexec` sends its calls through; without it the provider is still
/// registered but rejects every task.
pub fn register_builtin_providers(
    registry: &mut ProviderRegistry,
    shutdown: &CancellationToken,
    remote: Option<Arc<RpcClient>>,
) -> Result<(), CoreError> {
    registry.register(Arc::new(TickerProvider::new(shutdown.child_token())))?;
    registry.register(Arc::new(LocalExecProvider::new(shutdown.child_token())))?;
    registry.register(Arc::new(RemoteExecProvider::new(remote)))?;
    Ok(())
}
