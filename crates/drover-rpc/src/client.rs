//! Client for one runner endpoint.
use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use drover_model::{ExecRequest, JobDefinition};

use crate::{
    error::{PoolError, RpcError},
    manager::RunnerClient,
    message::{PING, PONG, Request, Response},
    pool::{ConnectionPool, PoolConfig},
    transport::Dialer,
    wire,
};

/// Attempts per call when the stream ends unexpectedly.
pub const CALL_ATTEMPTS: usize = 3;

/// Liveness rules for a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Heartbeat period.
    pub interval: Duration,
    /// A runner without a good heartbeat for this long is not ready.
    pub stale_after: Duration,
    /// A runner with more consecutive heartbeat failures than this is not ready.
    pub max_errors: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            stale_after: Duration::from_secs(5),
            max_errors: 5,
        }
    }
}

#[derive(Debug)]
struct Health {
    errors: u32,
    last_pong: Instant,
}

/// Point-in-time view of a client's health counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub errors: u32,
    pub since_last_pong: Duration,
}

/// Pooled, health-tracked client for one runner.
pub struct RpcClient {
    pool: Arc<ConnectionPool>,
    policy: HealthPolicy,
    health: Mutex<Health>,
    cancel: CancellationToken,
}

impl RpcClient {
    /// Open the connection pool and start the heartbeat.
    #[instrument(level = "info", skip(dialer, pool, policy), fields(endpoint = %dialer.endpoint()))]
    pub async fn connect(
        dialer: Arc<dyn Dialer>,
        pool: PoolConfig,
        policy: HealthPolicy,
    ) -> Result<Arc<Self>, PoolError> {
        let pool = ConnectionPool::connect(dialer, pool).await?;
        let client = Arc::new(Self {
            pool,
            policy,
            health: Mutex::new(Health {
                errors: 0,
                last_pong: Instant::now(),
            }),
            cancel: CancellationToken::new(),
        });
        tokio::spawn(heartbeat(
            Arc::downgrade(&client),
            policy.interval,
            client.cancel.clone(),
        ));
        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        self.pool.endpoint()
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Send one request and return the reply.
    ///
    /// An unexpected end of stream is retried on a fresh connection, up to
    /// [`CALL_ATTEMPTS`] in total. Every connection serves one exchange and is
    /// dropped afterwards; pool maintenance dials replacements. `Error {message}`
    /// replies become [`RpcError::Remote`].
    pub async fn call(&self, request: &Request) -> Result<Response, RpcError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.exchange(request).await {
                Ok(Response::Error { message }) => return Err(RpcError::Remote(message)),
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < CALL_ATTEMPTS => {
                    debug!(endpoint = %self.endpoint(), method = request.method(), attempt, error = %e, "retrying call");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn exchange(&self, request: &Request) -> Result<Response, RpcError> {
        let mut conn = self.pool.pop().await?;
        wire::send(&mut conn, request).await?;
        Ok(wire::recv(&mut conn).await?)
    }

    pub async fn ping(&self, payload: &str) -> Result<String, RpcError> {
        let request = Request::Ping {
            payload: payload.to_string(),
        };
        match self.call(&request).await? {
            Response::Pong { payload } => Ok(payload),
            other => Err(unexpected("pong", &other)),
        }
    }

    #[instrument(level = "debug", skip(self, job), fields(endpoint = %self.endpoint(), job = %job.name))]
    pub async fn dispatch(&self, job: &JobDefinition) -> Result<(), RpcError> {
        let request = Request::Dispatch { job: job.clone() };
        match self.call(&request).await? {
            Response::Ack => Ok(()),
            other => Err(unexpected("ack", &other)),
        }
    }

    pub async fn execute(&self, request: &ExecRequest) -> Result<Vec<u8>, RpcError> {
        let request = Request::Execute {
            request: request.clone(),
        };
        match self.call(&request).await? {
            Response::Output { bytes } => Ok(bytes),
            other => Err(unexpected("output", &other)),
        }
    }

    /// Send one heartbeat and update the health counters.
    ///
    /// Returns `true` when the runner answered `"Pong!"`.
    pub async fn heartbeat_once(&self) -> bool {
        let outcome = self.ping(PING).await;
        let mut health = self.health.lock();
        match outcome {
            Ok(payload) if payload == PONG => {
                health.errors = 0;
                health.last_pong = Instant::now();
                true
            }
            Ok(payload) => {
                health.errors += 1;
                trace!(endpoint = %self.endpoint(), %payload, errors = health.errors, "unexpected heartbeat reply");
                false
            }
            Err(e) => {
                health.errors += 1;
                trace!(endpoint = %self.endpoint(), error = %e, errors = health.errors, "heartbeat failed");
                false
            }
        }
    }

    /// `true` while heartbeats are recent and failures do not exceed the limit.
    pub fn ready(&self) -> bool {
        let health = self.health.lock();
        health.errors <= self.policy.max_errors && health.last_pong.elapsed() < self.policy.stale_after
    }

    pub fn health(&self) -> HealthSnapshot {
        let health = self.health.lock();
        HealthSnapshot {
            errors: health.errors,
            since_last_pong: health.last_pong.elapsed(),
        }
    }

    /// Stop the heartbeat and close the pool.
    pub async fn close(&self) {
        self.cancel.cancel();
        self.pool.close().await;
        debug!(endpoint = %self.endpoint(), "client closed");
    }
}

fn unexpected(expected: &'static str, got: &Response) -> RpcError {
    RpcError::Unexpected {
        expected,
        got: got.describe(),
    }
}

async fn heartbeat(client: Weak<RpcClient>, period: Duration, cancel: CancellationToken) {
    let mut tick = tokio::time::interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {}
        }
        let Some(client) = client.upgrade() else {
            return;
        };
        let was_ready = client.ready();
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = client.heartbeat_once() => {}
        }
        let ready = client.ready();
        if was_ready && !ready {
            warn!(endpoint = %client.endpoint(), "runner is no longer ready");
        } else if !was_ready && ready {
            debug!(endpoint = %client.endpoint(), "runner is ready again");
        }
    }
}

#[async_trait]
impl RunnerClient for RpcClient {
    fn endpoint(&self) -> &str {
        RpcClient::endpoint(self)
    }

    fn ready(&self) -> bool {
        RpcClient::ready(self)
    }

    async fn dispatch(&self, job: &JobDefinition) -> Result<(), RpcError> {
        RpcClient::dispatch(self, job).await
    }

    async fn close(&self) {
        RpcClient::close(self).await
    }
}
