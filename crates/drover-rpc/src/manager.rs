//! Health-aware round-robin dispatch over a fleet of runners.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use drover_core::{MetricsHandle, noop_metrics};
use drover_model::JobDefinition;

use crate::error::{DispatchError, RpcError};

/// Consecutive unready clients skipped before selection gives up and returns
/// the next one regardless.
pub const MAX_SKIPS: usize = 3;

/// What the manager needs from a runner client.
#[async_trait]
pub trait RunnerClient: Send + Sync + 'static {
    fn endpoint(&self) -> &str;

    fn ready(&self) -> bool;

    async fn dispatch(&self, job: &JobDefinition) -> Result<(), RpcError>;

    async fn close(&self);
}

struct State<C> {
    clients: Vec<Arc<C>>,
    /// Clients eligible for selection, in rotation order.
    ready: Vec<Arc<C>>,
    /// Jobs per client, indexed like `clients`.
    assignments: Vec<Vec<JobDefinition>>,
    /// Jobs that could not be placed on any runner.
    orphans: Vec<JobDefinition>,
    cursor: usize,
}

impl<C> State<C> {
    fn index_of(&self, client: &Arc<C>) -> Option<usize> {
        self.clients.iter().position(|c| Arc::ptr_eq(c, client))
    }

    fn is_admitted(&self, client: &Arc<C>) -> bool {
        self.ready.iter().any(|c| Arc::ptr_eq(c, client))
    }
}

/// Per-runner row of [`DispatchManager::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerStatus {
    pub endpoint: String,
    pub ready: bool,
    /// Whether the runner is in the selection rotation.
    pub admitted: bool,
    pub jobs: Vec<String>,
}

/// Result of one [`DispatchManager::sweep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Runners taken out of rotation.
    pub evicted: usize,
    /// Runners put back into rotation.
    pub readmitted: usize,
    /// Jobs re-dispatched elsewhere, orphans included. Rejected jobs are
    /// neither placed nor orphaned.
    pub placed: usize,
    /// Jobs still without a runner.
    pub orphans: usize,
}

/// Distributes jobs over runner clients and moves them off unhealthy runners.
///
/// All bookkeeping sits behind one lock that is never held across a network call.
pub struct DispatchManager<C> {
    state: Mutex<State<C>>,
    metrics: MetricsHandle,
}

impl<C: RunnerClient> DispatchManager<C> {
    /// Every client starts in the rotation.
    pub fn new(clients: Vec<Arc<C>>) -> Self {
        let assignments = clients.iter().map(|_| Vec::new()).collect();
        Self {
            state: Mutex::new(State {
                ready: clients.clone(),
                clients,
                assignments,
                orphans: Vec::new(),
                cursor: 0,
            }),
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn clients(&self) -> Vec<Arc<C>> {
        self.state.lock().clients.clone()
    }

    /// Next client in rotation.
    ///
    /// Unready clients are skipped; after [`MAX_SKIPS`] consecutive skips the
    /// next client is returned regardless. `None` when the rotation is empty.
    pub fn next_client(&self) -> Option<Arc<C>> {
        let mut state = self.state.lock();
        if state.ready.is_empty() {
            return None;
        }
        let mut skips = 0;
        loop {
            let client = state.ready[state.cursor % state.ready.len()].clone();
            state.cursor = state.cursor.wrapping_add(1);
            if client.ready() || skips >= MAX_SKIPS {
                return Some(client);
            }
            skips += 1;
        }
    }

    /// Send `job` to the next client and record the assignment.
    ///
    /// Returns the endpoint that accepted the job.
    #[instrument(level = "info", skip(self, job), fields(job = %job.name))]
    pub async fn dispatch_job(&self, job: JobDefinition) -> Result<String, DispatchError> {
        let client = self.next_client().ok_or(DispatchError::NoReadyClient)?;
        let endpoint = client.endpoint().to_string();

        if let Err(source) = client.dispatch(&job).await {
            warn!(%endpoint, error = %source, "dispatch failed");
            self.metrics.record_dispatch_failed(&endpoint);
            return Err(DispatchError::Rpc { endpoint, source });
        }

        {
            let mut state = self.state.lock();
            if let Some(idx) = state.index_of(&client) {
                state.assignments[idx].push(job);
            }
        }
        self.metrics.record_job_dispatched(&endpoint);
        info!(%endpoint, "job dispatched");
        Ok(endpoint)
    }

    /// Dispatch every job; one failure never stops the rest.
    ///
    /// Jobs that found no ready runner, or lost the connection mid-call, are
    /// kept as orphans for the next sweep. Rejected jobs are only reported.
    pub async fn dispatch_all(
        &self,
        jobs: Vec<JobDefinition>,
    ) -> Vec<(String, Result<String, DispatchError>)> {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let name = job.name.clone();
            let result = self.dispatch_job(job.clone()).await;
            if let Err(e) = &result {
                self.park(job, e);
            }
            outcomes.push((name, result));
        }
        outcomes
    }

    /// Keep `job` for the next sweep when `err` may clear up on its own.
    fn park(&self, job: JobDefinition, err: &DispatchError) {
        if err.is_retryable() {
            debug!(job = %job.name, error = %err, "job parked");
            self.state.lock().orphans.push(job);
        } else {
            warn!(job = %job.name, error = %err, "job dropped");
        }
    }

    /// Take `client` out of rotation and re-dispatch its jobs.
    ///
    /// No-op for a ready client. Jobs that fail to re-dispatch become orphans
    /// unless the new runner rejected them. Returns the number of jobs taken
    /// from the client.
    #[instrument(level = "info", skip(self, client), fields(endpoint = %client.endpoint()))]
    pub async fn move_jobs(&self, client: &Arc<C>) -> usize {
        if client.ready() {
            return 0;
        }
        let jobs = self.evict(client);
        let count = jobs.len();
        self.place(jobs).await;
        count
    }

    /// Remove `client` from rotation and take its assignments.
    fn evict(&self, client: &Arc<C>) -> Vec<JobDefinition> {
        let jobs = {
            let mut state = self.state.lock();
            state.ready.retain(|c| !Arc::ptr_eq(c, client));
            match state.index_of(client) {
                Some(idx) => std::mem::take(&mut state.assignments[idx]),
                None => Vec::new(),
            }
        };
        self.metrics.record_jobs_moved(client.endpoint(), jobs.len());
        if !jobs.is_empty() {
            warn!(endpoint = %client.endpoint(), count = jobs.len(), "moving jobs off unready runner");
        }
        jobs
    }

    /// Dispatch `jobs` one by one and return how many found a runner.
    async fn place(&self, jobs: Vec<JobDefinition>) -> usize {
        let mut placed = 0;
        for job in jobs {
            match self.dispatch_job(job.clone()).await {
                Ok(_) => placed += 1,
                Err(e) => self.park(job, &e),
            }
        }
        placed
    }

    /// One health pass: evict unready runners, readmit recovered ones, retry orphans.
    ///
    /// Orphans left by earlier passes are retried once; jobs orphaned by this
    /// pass wait for the next one.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let (to_evict, to_readmit, orphans) = {
            let mut state = self.state.lock();
            let mut evict = Vec::new();
            let mut readmit = Vec::new();
            for client in &state.clients {
                let ready = client.ready();
                self.metrics.record_client_ready(client.endpoint(), ready);
                match (state.is_admitted(client), ready) {
                    (true, false) => evict.push(client.clone()),
                    (false, true) => readmit.push(client.clone()),
                    _ => {}
                }
            }
            (evict, readmit, std::mem::take(&mut state.orphans))
        };

        if !to_readmit.is_empty() {
            let mut state = self.state.lock();
            for client in to_readmit {
                if !state.is_admitted(&client) {
                    info!(endpoint = %client.endpoint(), "runner readmitted");
                    state.ready.push(client);
                    report.readmitted += 1;
                }
            }
        }

        for client in to_evict {
            if client.ready() {
                continue;
            }
            let jobs = self.evict(&client);
            report.placed += self.place(jobs).await;
            report.evicted += 1;
        }

        report.placed += self.place(orphans).await;
        report.orphans = self.state.lock().orphans.len();
        report
    }

    /// Run [`sweep`](Self::sweep) every `period` until `cancel` fires.
    pub fn spawn_health_sweep(self: Arc<Self>, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("health sweep stopped");
                        return;
                    }
                    _ = tick.tick() => {}
                }
                let report = self.sweep().await;
                if report != SweepReport::default() {
                    debug!(?report, "health sweep");
                }
            }
        })
    }

    /// Endpoint, readiness and job names per client.
    pub fn snapshot(&self) -> Vec<RunnerStatus> {
        let state = self.state.lock();
        state
            .clients
            .iter()
            .zip(&state.assignments)
            .map(|(client, jobs)| RunnerStatus {
                endpoint: client.endpoint().to_string(),
                ready: client.ready(),
                admitted: state.is_admitted(client),
                jobs: jobs.iter().map(|j| j.name.clone()).collect(),
            })
            .collect()
    }

    /// Names of jobs waiting for a runner.
    pub fn orphans(&self) -> Vec<String> {
        self.state.lock().orphans.iter().map(|j| j.name.clone()).collect()
    }

    /// Close every client.
    pub async fn close(&self) {
        for client in self.clients() {
            client.close().await;
        }
    }
}
