//! Dispatcher/runner transport.
//!
//! Frames are length-prefixed JSON ([`wire`]). The dispatcher side keeps one
//! [`RpcClient`] per runner, each backed by a [`ConnectionPool`] and a
//! heartbeat, and spreads jobs over them with a [`DispatchManager`]. The runner
//! side answers with an [`RpcServer`] around an [`RpcHandler`].
mod client;
pub use client::{CALL_ATTEMPTS, HealthPolicy, HealthSnapshot, RpcClient};

mod error;
pub use error::{DispatchError, HandlerError, PoolError, ProtocolError, RpcError};

mod manager;
pub use manager::{DispatchManager, MAX_SKIPS, RunnerClient, RunnerStatus, SweepReport};

pub mod message;
pub use message::{Request, Response};

mod pool;
pub use pool::{ConnectionPool, MAINTENANCE_INTERVAL, PoolConfig};

mod server;
pub use server::{RpcHandler, RpcServer};

pub mod transport;
pub use transport::{Connection, Dialer, LocalDialer, TcpDialer};

pub mod wire;
