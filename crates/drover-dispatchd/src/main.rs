mod config;
mod http;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use drover_core::MetricsHandle;
use drover_dsl::scan_directory;
use drover_observe::{LoggerTimeZone, init_local_offset, init_logger};
use drover_prometheus::PrometheusMetrics;
use drover_rpc::{DispatchManager, RpcClient, TcpDialer};

use crate::{config::DispatchConfig, http::StatusApi};

/// Parses job files and distributes them over a fleet of runners.
#[derive(Debug, Parser)]
#[command(name = "drover-dispatchd", version)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long, default_value = "dispatchd.json")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = DispatchConfig::load(&cli.config)?;

    // Offset detection only works before the runtime starts its threads.
    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?
        .block_on(run(cfg))
}

async fn run(cfg: DispatchConfig) -> anyhow::Result<()> {
    // 1) logger
    let _log_guard = init_logger(&cfg.logger)?;
    info!(runners = cfg.runners.len(), "logger initialized");

    // 2) metrics
    let metrics = PrometheusMetrics::new()?;
    let handle: MetricsHandle = Arc::new(metrics.clone());

    // 3) runner clients
    let policy = cfg.health.policy();
    let mut clients = Vec::with_capacity(cfg.runners.len());
    for endpoint in &cfg.runners {
        let dialer = Arc::new(TcpDialer::new(endpoint.clone(), cfg.auth_token.clone()));
        match RpcClient::connect(dialer, cfg.pool, policy).await {
            Ok(client) => clients.push(client),
            Err(e) => warn!(%endpoint, error = %e, "runner skipped"),
        }
    }
    if clients.is_empty() {
        anyhow::bail!("no runner client could be created");
    }
    let manager = Arc::new(DispatchManager::new(clients).with_metrics(handle));

    // 4) job files
    let report = scan_directory(&cfg.jobs_dir, &cfg.providers)
        .with_context(|| format!("failed to scan {}", cfg.jobs_dir.display()))?;
    for failure in &report.failures {
        error!(path = %failure.path.display(), error = %failure.error, "job file rejected");
    }
    info!(jobs = report.jobs.len(), rejected = report.failures.len(), "job files parsed");

    // 5) dispatch
    for (job, outcome) in manager.dispatch_all(report.jobs).await {
        if let Err(e) = outcome {
            warn!(%job, error = %e, "job parked until a runner is ready");
        }
    }

    // 6) health sweep
    let shutdown = CancellationToken::new();
    let sweep = manager
        .clone()
        .spawn_health_sweep(cfg.sweep_interval(), shutdown.clone());

    // 7) status API
    let http = match cfg.http_addr {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind http listener on {addr}"))?;
            info!(%addr, "status api listening");
            let app = StatusApi::new(manager.clone(), metrics).router();
            let stop = shutdown.clone();
            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(stop.cancelled_owned())
                    .await
            }))
        }
        None => None,
    };

    // 8) wait for ctrl-c
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    shutdown.cancel();

    if let Err(e) = sweep.await {
        warn!(error = %e, "health sweep task failed");
    }
    if let Some(http) = http {
        match http.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "status api stopped with error"),
            Err(e) => warn!(error = %e, "status api task failed"),
        }
    }
    manager.close().await;
    Ok(())
}
