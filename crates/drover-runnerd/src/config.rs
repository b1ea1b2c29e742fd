use std::{fs, path::Path};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use drover_observe::LoggerConfig;
use drover_rpc::PoolConfig;

/// Runner configuration, read once from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Address the RPC listener binds (`host:port`).
    pub listen_addr: String,
    /// Token every dispatcher must present in `Hello`.
    pub auth_token: String,
    /// Peer runner used by the `remoteexec` provider.
    pub remote_exec: Option<RemoteExecConfig>,
    pub logger: LoggerConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8103".to_string(),
            auth_token: String::new(),
            remote_exec: None,
            logger: LoggerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteExecConfig {
    pub endpoint: String,
    #[serde(default = "RemoteExecConfig::default_pool")]
    pub pool: PoolConfig,
}

impl RemoteExecConfig {
    fn default_pool() -> PoolConfig {
        PoolConfig { min: 1, max: 2 }
    }
}

impl RunnerConfig {
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
        if self.auth_token.is_empty() {
            bail!("auth_token must be set");
        }
        if let Some(remote) = &self.remote_exec {
            if remote.endpoint.trim().is_empty() {
                bail!("remote_exec.endpoint must be set");
            }
            remote.pool.validate()?;
        }
        Ok(())
    }
}
