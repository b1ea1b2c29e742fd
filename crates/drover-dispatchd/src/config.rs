use std::{fs, net::SocketAddr, path::{Path, PathBuf}, time::Duration};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use drover_observe::LoggerConfig;
use drover_rpc::{HealthPolicy, PoolConfig};

/// Dispatcher configuration, read once from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Runner endpoints (`host:port`), in rotation order.
    pub runners: Vec<String>,
    /// Shared token sent in every connection's `Hello`.
    pub auth_token: String,
    /// Connection pool per runner.
    pub pool: PoolConfig,
    pub health: HealthConfig,
    /// Period of the eviction / re-dispatch pass.
    pub sweep_interval_ms: u64,
    /// Directory scanned for `*.job` files at startup.
    pub jobs_dir: PathBuf,
    /// Provider names jobs may reference.
    pub providers: Vec<String>,
    /// Status API address; no HTTP listener when absent.
    pub http_addr: Option<SocketAddr>,
    pub logger: LoggerConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            runners: Vec::new(),
            auth_token: String::new(),
            pool: PoolConfig::default(),
            health: HealthConfig::default(),
            sweep_interval_ms: 1_000,
            jobs_dir: PathBuf::from("jobs"),
            providers: ["ticker", "localexec", "remoteexec"]
                .into_iter()
                .map(String::from)
                .collect(),
            http_addr: None,
            logger: LoggerConfig::default(),
        }
    }
}

/// Heartbeat settings, mapped onto [`HealthPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_ms: u64,
    pub stale_after_ms: u64,
    pub max_errors: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        let policy = HealthPolicy::default();
        Self {
            interval_ms: policy.interval.as_millis() as u64,
            stale_after_ms: policy.stale_after.as_millis() as u64,
            max_errors: policy.max_errors,
        }
    }
}

impl HealthConfig {
    pub fn policy(&self) -> HealthPolicy {
        HealthPolicy {
            interval: Duration::from_millis(self.interval_ms),
            stale_after: Duration::from_millis(self.stale_after_ms),
            max_errors: self.max_errors,
        }
    }
}

impl DispatchConfig {
    /// Read and validate the config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runners.is_empty() {
            bail!("no runners configured");
        }
        if self.auth_token.is_empty() {
            bail!("auth_token must be set");
        }
        self.pool.validate()?;
        if self.health.interval_ms == 0 || self.sweep_interval_ms == 0 {
            bail!("health.interval_ms and sweep_interval_ms must be positive");
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
