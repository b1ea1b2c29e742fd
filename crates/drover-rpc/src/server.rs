//! Runner-side RPC endpoint.
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use drover_model::{ExecRequest, JobDefinition};

use crate::{
    error::{HandlerError, ProtocolError},
    message::{PING, PONG, Request, Response},
    wire,
};

/// Application side of the runner protocol.
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    /// Accept one job.
    async fn dispatch(&self, job: JobDefinition) -> Result<(), HandlerError>;

    /// Run a process and return its stdout. `cancel` fires on runner shutdown.
    async fn execute(
        &self,
        request: ExecRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, HandlerError>;
}

/// Serves the runner protocol for one handler.
pub struct RpcServer {
    handler: Arc<dyn RpcHandler>,
    token: String,
    active: AtomicUsize,
}

impl RpcServer {
    pub fn new(handler: Arc<dyn RpcHandler>, token: impl Into<String>) -> Self {
        Self {
            handler,
            token: token.into(),
            active: AtomicUsize::new(0),
        }
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Accept connections until `cancel` fires; one task per connection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, cancel: CancellationToken) -> io::Result<()> {
        info!(addr = ?listener.local_addr().ok(), "accepting runner connections");
        loop {
            let (stream, peer) = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("acceptor stopped");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };
            if let Err(e) = stream.set_nodelay(true) {
                trace!(%peer, error = %e, "set_nodelay failed");
            }

            let server = self.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                debug!(%peer, "connection accepted");
                if let Err(e) = server.serve_connection(stream, cancel).await {
                    debug!(%peer, error = %e, "connection closed with error");
                } else {
                    debug!(%peer, "connection closed");
                }
            });
        }
    }

    /// Serve one connection: handshake, then requests until EOF or cancel.
    #[instrument(level = "trace", skip_all)]
    pub async fn serve_connection<S>(
        self: Arc<Self>,
        mut stream: S,
        cancel: CancellationToken,
    ) -> Result<(), ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        self.active.fetch_add(1, Ordering::Relaxed);
        let result = self.session(&mut stream, &cancel).await;
        self.active.fetch_sub(1, Ordering::Relaxed);
        match result {
            Err(e) if e.is_disconnect() => Ok(()),
            other => other,
        }
    }

    async fn session<S>(&self, stream: &mut S, cancel: &CancellationToken) -> Result<(), ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        match wire::recv::<_, Request>(stream).await? {
            Request::Hello { token } if token == self.token => {
                wire::send(stream, &Response::Welcome).await?;
            }
            Request::Hello { .. } => {
                warn!("rejected connection with a bad token");
                return wire::send(stream, &Response::error("authentication failed")).await;
            }
            other => {
                warn!(method = other.method(), "request before handshake");
                return wire::send(stream, &Response::error("handshake required")).await;
            }
        }

        loop {
            let request = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                request = wire::recv::<_, Request>(stream) => request?,
            };
            let response = self.handle(request, cancel).await;
            wire::send(stream, &response).await?;
        }
    }

    async fn handle(&self, request: Request, cancel: &CancellationToken) -> Response {
        match request {
            Request::Hello { .. } => Response::Welcome,
            Request::Ping { payload } => Response::Pong {
                payload: if payload == PING {
                    PONG.to_string()
                } else {
                    String::new()
                },
            },
            Request::Dispatch { job } => {
                info!(job = %job.name, "dispatch received");
                match self.handler.dispatch(job).await {
                    Ok(()) => Response::Ack,
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Request::Execute { request } => {
                info!(file = %request.file, "execute received");
                match self.handler.execute(request, cancel.child_token()).await {
                    Ok(bytes) => Response::Output { bytes },
                    Err(e) => Response::error(e.to_string()),
                }
            }
        }
    }
}
