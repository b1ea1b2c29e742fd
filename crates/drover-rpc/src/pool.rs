//! Fixed-capacity pool of live connections to one endpoint.
use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::{
    error::PoolError,
    transport::{Connection, Dialer},
};

/// How often maintenance checks the minimum watermark.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_millis(10);

/// Pool size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maintenance dials while fewer connections are queued.
    pub min: usize,
    /// Capacity; the pool is filled to this size on start.
    pub max: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { min: 2, max: 4 }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.min < 1 || self.min > self.max {
            return Err(PoolError::InvalidSize {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Bounded queue of authenticated connections.
///
/// The queue never holds more than `max` connections; a connection pushed into
/// a full pool is dropped. A background task dials one connection every
/// [`MAINTENANCE_INTERVAL`] while the queue is below `min`.
pub struct ConnectionPool {
    dialer: Arc<dyn Dialer>,
    config: PoolConfig,
    tx: mpsc::Sender<Connection>,
    rx: Mutex<mpsc::Receiver<Connection>>,
    cancel: CancellationToken,
}

impl ConnectionPool {
    /// Create the pool, fill it to capacity and start maintenance.
    ///
    /// Dial failures during the initial fill are logged; maintenance catches up
    /// once the endpoint is reachable.
    #[instrument(level = "debug", skip(dialer), fields(endpoint = %dialer.endpoint()))]
    pub async fn connect(dialer: Arc<dyn Dialer>, config: PoolConfig) -> Result<Arc<Self>, PoolError> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.max);
        let pool = Arc::new(Self {
            dialer,
            config,
            tx,
            rx: Mutex::new(rx),
            cancel: CancellationToken::new(),
        });

        for _ in 0..config.max {
            match pool.dialer.dial().await {
                Ok(conn) => pool.push(conn),
                Err(e) => {
                    warn!(endpoint = %pool.endpoint(), error = %e, "initial dial failed");
                    break;
                }
            }
        }
        debug!(len = pool.len(), "pool filled");

        tokio::spawn(maintain(Arc::downgrade(&pool), pool.cancel.clone()));
        Ok(pool)
    }

    pub fn endpoint(&self) -> &str {
        self.dialer.endpoint()
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Number of queued connections.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Take a connection, waiting until one is queued.
    ///
    /// There is no timeout; only [`close`](Self::close) releases a waiting caller.
    pub async fn pop(&self) -> Result<Connection, PoolError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PoolError::Closed),
            conn = async { self.rx.lock().await.recv().await } => conn.ok_or(PoolError::Closed),
        }
    }

    /// Return a connection; it is dropped when the pool is full or closed.
    pub fn push(&self, conn: Connection) {
        if self.is_closed() {
            return;
        }
        if self.tx.try_send(conn).is_err() {
            trace!(endpoint = %self.endpoint(), "pool full; connection dropped");
        }
    }

    /// Stop maintenance, release waiting callers and drop queued connections.
    pub async fn close(&self) {
        self.cancel.cancel();
        let mut rx = self.rx.lock().await;
        rx.close();
        let mut dropped = 0usize;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        debug!(endpoint = %self.endpoint(), dropped, "pool closed");
    }
}

async fn maintain(pool: Weak<ConnectionPool>, cancel: CancellationToken) {
    let mut tick = tokio::time::interval(MAINTENANCE_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {}
        }
        let Some(pool) = pool.upgrade() else {
            return;
        };
        if pool.len() >= pool.config.min {
            continue;
        }
        match pool.dialer.dial().await {
            Ok(conn) => {
                pool.push(conn);
                trace!(endpoint = %pool.endpoint(), len = pool.len(), "pool replenished");
            }
            Err(e) => trace!(endpoint = %pool.endpoint(), error = %e, "maintenance dial failed"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ProtocolError, RpcError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::io::DuplexStream;

    /// Dialer handing out memory pipes; the far ends are kept open.
    #[derive(Default)]
    pub(crate) struct PipeDialer {
        pub dials: AtomicUsize,
        pub down: AtomicBool,
        peers: parking_lot::Mutex<Vec<DuplexStream>>,
    }

    #[async_trait]
    impl Dialer for PipeDialer {
        fn endpoint(&self) -> &str {
            "pipe"
        }

        async fn dial(&self) -> Result<Connection, RpcError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ProtocolError::Io(std::io::ErrorKind::ConnectionRefused.into()).into());
            }
            self.dials.fetch_add(1, Ordering::SeqCst);
            let (a, b) = tokio::io::duplex(64);
            self.peers.lock().push(b);
            Ok(Box::new(a))
        }
    }

    fn config(min: usize, max: usize) -> PoolConfig {
        PoolConfig { min, max }
    }

    #[tokio::test(start_paused = true)]
    async fn fills_to_capacity_on_connect() {
        let dialer = Arc::new(PipeDialer::default());
        let pool = ConnectionPool::connect(dialer.clone(), config(1, 3)).await.unwrap();

        assert_eq!(pool.len(), 3);
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 3);
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn length_never_exceeds_capacity() {
        let dialer = Arc::new(PipeDialer::default());
        let pool = ConnectionPool::connect(dialer.clone(), config(1, 2)).await.unwrap();

        let a = pool.pop().await.unwrap();
        assert_eq!(pool.len(), 1);
        pool.push(a);
        assert_eq!(pool.len(), 2);

        let extra = dialer.dial().await.unwrap();
        pool.push(extra);
        assert_eq!(pool.len(), 2);
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn maintenance_restores_the_minimum() {
        let dialer = Arc::new(PipeDialer::default());
        let pool = ConnectionPool::connect(dialer.clone(), config(2, 4)).await.unwrap();

        let mut held = Vec::new();
        for _ in 0..4 {
            held.push(pool.pop().await.unwrap());
        }
        assert!(pool.is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.len(), 2);
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_initial_dials_are_recovered_by_maintenance() {
        let dialer = Arc::new(PipeDialer::default());
        dialer.down.store(true, Ordering::SeqCst);
        let pool = ConnectionPool::connect(dialer.clone(), config(1, 2)).await.unwrap();
        assert_eq!(pool.len(), 0);

        dialer.down.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.len(), 1);
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_releases_waiters_and_rejects_pushes() {
        let dialer = Arc::new(PipeDialer::default());
        dialer.down.store(true, Ordering::SeqCst);
        let pool = ConnectionPool::connect(dialer.clone(), config(1, 1)).await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.pop().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;

        pool.close().await;
        assert_eq!(waiter.await.unwrap(), Err(PoolError::Closed));

        dialer.down.store(false, Ordering::SeqCst);
        pool.push(dialer.dial().await.unwrap());
        assert_eq!(pool.len(), 0);
        assert!(matches!(pool.pop().await, Err(PoolError::Closed)));
    }

    #[tokio::test]
    async fn invalid_sizes_are_rejected() {
        let dialer: Arc<dyn Dialer> = Arc::new(PipeDialer::default());
        assert_eq!(
            ConnectionPool::connect(dialer.clone(), config(0, 2)).await.err(),
            Some(PoolError::InvalidSize { min: 0, max: 2 })
        );
        assert_eq!(
            ConnectionPool::connect(dialer, config(3, 2)).await.err(),
            Some(PoolError::InvalidSize { min: 3, max: 2 })
        );
    }
}
