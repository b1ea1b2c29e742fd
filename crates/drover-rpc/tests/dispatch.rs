//! Dispatcher to runner over the in-process transport.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use drover_model::{ExecRequest, JobDefinition};
use drover_rpc::{
    DispatchManager, HandlerError, HealthPolicy, LocalDialer, PoolConfig, RpcClient, RpcHandler,
    RpcServer,
};

const PROVIDERS: &[&str] = &["ticker", "localexec"];

const HELLO: &str = "\
ticker T1 {
    Interval: 5
    Period: Second
}
localexec T2 {
    File: /bin/echo
    Args: [hi]
}
";

/// Runner stand-in that keeps every job it receives.
#[derive(Default)]
struct Inbox {
    jobs: Mutex<Vec<JobDefinition>>,
}

impl Inbox {
    fn names(&self) -> Vec<String> {
        self.jobs.lock().iter().map(|j| j.name.clone()).collect()
    }
}

#[async_trait]
impl RpcHandler for Inbox {
    async fn dispatch(&self, job: JobDefinition) -> Result<(), HandlerError> {
        job.validate().map_err(|e| HandlerError::new(e.to_string()))?;
        self.jobs.lock().push(job);
        Ok(())
    }

    async fn execute(
        &self,
        request: ExecRequest,
        _cancel: CancellationToken,
    ) -> Result<Vec<u8>, HandlerError> {
        Ok(request.args.join(" ").into_bytes())
    }
}

struct Runner {
    inbox: Arc<Inbox>,
    client: Arc<RpcClient>,
    cancel: CancellationToken,
}

async fn runner(endpoint: &str) -> Runner {
    let inbox = Arc::new(Inbox::default());
    let cancel = CancellationToken::new();
    let server = Arc::new(RpcServer::new(inbox.clone(), "fleet-token"));
    let dialer = Arc::new(LocalDialer::new(endpoint, "fleet-token", server, cancel.clone()));
    let client = RpcClient::connect(dialer, PoolConfig { min: 1, max: 2 }, HealthPolicy::default())
        .await
        .unwrap();
    Runner {
        inbox,
        client,
        cancel,
    }
}

#[tokio::test(start_paused = true)]
async fn parsed_job_reaches_the_runner_once() {
    let job = drover_dsl::parse_job("hello.job", HELLO, PROVIDERS).unwrap();
    let titles: Vec<&str> = job.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["T1", "T2"]);

    let r = runner("runner-1").await;
    assert!(r.client.ready());
    let mgr = DispatchManager::new(vec![r.client.clone()]);

    let outcomes = mgr.dispatch_all(vec![job.clone()]).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].1.as_ref().unwrap(), "runner-1");

    assert_eq!(*r.inbox.jobs.lock(), vec![job]);
    let snapshot = mgr.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].jobs, vec!["hello.job"]);

    mgr.close().await;
}

#[tokio::test(start_paused = true)]
async fn execute_returns_runner_output() {
    let r = runner("runner-1").await;
    let out = r
        .client
        .execute(&ExecRequest::new("/bin/echo", ["hello", "world"]))
        .await
        .unwrap();
    assert_eq!(out, b"hello world");
    r.client.close().await;
}

#[tokio::test(start_paused = true)]
async fn jobs_move_off_a_runner_that_goes_silent() {
    let a = runner("runner-a").await;
    let b = runner("runner-b").await;
    let mgr = Arc::new(DispatchManager::new(vec![a.client.clone(), b.client.clone()]));

    let jobs: Vec<JobDefinition> = ["one.job", "two.job"]
        .into_iter()
        .map(|name| drover_dsl::parse_job(name, HELLO, PROVIDERS).unwrap())
        .collect();
    for outcome in mgr.dispatch_all(jobs).await {
        outcome.1.unwrap();
    }
    assert_eq!(a.inbox.names(), vec!["one.job"]);
    assert_eq!(b.inbox.names(), vec!["two.job"]);

    let sweep_cancel = CancellationToken::new();
    let sweep = mgr
        .clone()
        .spawn_health_sweep(Duration::from_millis(500), sweep_cancel.clone());

    // Runner b stops serving; its heartbeats stop succeeding.
    b.cancel.cancel();
    tokio::time::sleep(Duration::from_secs(8)).await;

    assert!(a.client.ready());
    assert!(!b.client.ready());
    assert_eq!(a.inbox.names(), vec!["one.job", "two.job"]);

    let snapshot = mgr.snapshot();
    assert_eq!(snapshot[0].jobs, vec!["one.job", "two.job"]);
    assert!(!snapshot[1].admitted);
    assert!(snapshot[1].jobs.is_empty());
    assert!(mgr.orphans().is_empty());

    sweep_cancel.cancel();
    sweep.await.unwrap();
    a.client.close().await;
    b.client.close().await;
}
