mod config;
mod service;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use drover_core::{ProviderRegistry, Runner};
use drover_exec::register_builtin_providers;
use drover_observe::{LoggerTimeZone, init_local_offset, init_logger};
use drover_rpc::{HealthPolicy, RpcClient, RpcServer, TcpDialer};

use crate::{config::RunnerConfig, service::RunnerService};

/// Executes the jobs a dispatcher sends to it.
#[derive(Debug, Parser)]
#[command(name = "drover-runnerd", version)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long, default_value = "runnerd.json")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = RunnerConfig::load(&cli.config)?;

    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?
        .block_on(run(cfg))
}

async fn run(cfg: RunnerConfig) -> anyhow::Result<()> {
    // 1) logger
    let _log_guard = init_logger(&cfg.logger)?;
    info!(listen = %cfg.listen_addr, "logger initialized");

    // 2) remoteexec peer
    let shutdown = CancellationToken::new();
    let remote = match &cfg.remote_exec {
        Some(peer) => {
            let dialer = Arc::new(TcpDialer::new(peer.endpoint.clone(), cfg.auth_token.clone()));
            let client = RpcClient::connect(dialer, peer.pool, HealthPolicy::default())
                .await
                .with_context(|| format!("failed to open remoteexec pool to {}", peer.endpoint))?;
            Some(client)
        }
        None => None,
    };

    // 3) providers + runner
    let mut registry = ProviderRegistry::new();
    register_builtin_providers(&mut registry, &shutdown, remote.clone())?;
    info!(providers = ?registry.names(), "providers registered");
    let runner = Arc::new(Runner::new(registry));

    // 4) rpc server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind rpc listener on {}", cfg.listen_addr))?;
    let server = Arc::new(RpcServer::new(
        Arc::new(RunnerService::new(runner.clone())),
        cfg.auth_token.clone(),
    ));
    let acceptor = tokio::spawn(server.serve(listener, shutdown.clone()));

    // 5) wait for ctrl-c
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    shutdown.cancel();

    match acceptor.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "rpc listener stopped with error"),
        Err(e) => warn!(error = %e, "rpc listener task failed"),
    }
    runner.cleanup().await;
    if let Some(client) = remote {
        client.close().await;
    }
    Ok(())
}
