use std::io;

use thiserror::Error;

/// Framing and encoding failures on one connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}

impl ProtocolError {
    /// Returns `true` if the peer closed or dropped the stream mid-exchange.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            )
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("invalid pool size: min={min}, max={max} (need 1 <= min <= max)")]
    InvalidSize { min: usize, max: usize },

    #[error("connection pool is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("unexpected response: expected {expected}, got {got}")]
    Unexpected { expected: &'static str, got: String },
}

impl RpcError {
    /// Whether the call is worth another attempt on a fresh connection.
    ///
    /// Only an unexpected end of stream qualifies; remote rejections and
    /// malformed replies are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Protocol(e) if e.is_disconnect())
    }
}

/// Failure reported by an [`RpcHandler`](crate::RpcHandler); sent back as
/// `Error {message}`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no runner is ready to take the job")]
    NoReadyClient,

    #[error("dispatch to {endpoint} failed: {source}")]
    Rpc {
        endpoint: String,
        #[source]
        source: RpcError,
    },
}

impl DispatchError {
    /// Whether the job may be placed by a later sweep.
    ///
    /// True when no runner was available or the stream dropped mid-call. A
    /// runner that rejected the job would reject it again.
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::NoReadyClient => true,
            DispatchError::Rpc { source, .. } => source.is_transient(),
        }
    }
}
