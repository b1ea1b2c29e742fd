//! Connections to a runner endpoint.
//!
//! A [`Dialer`] opens one authenticated connection. [`TcpDialer`] talks to a
//! remote runner; [`LocalDialer`] connects to an in-process [`RpcServer`] over a
//! memory pipe.
use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    error::{ProtocolError, RpcError},
    message::{Request, Response},
    server::RpcServer,
    wire,
};

/// Byte stream usable as a connection.
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// An open, authenticated connection.
pub type Connection = Box<dyn Stream>;

/// Opens connections to one endpoint.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Address the dialer connects to, used as the client identity.
    fn endpoint(&self) -> &str;

    /// Open and authenticate a new connection.
    async fn dial(&self) -> Result<Connection, RpcError>;
}

/// Send `Hello` and wait for `Welcome`.
pub async fn handshake(conn: &mut Connection, token: &str) -> Result<(), RpcError> {
    wire::send(
        conn,
        &Request::Hello {
            token: token.to_string(),
        },
    )
    .await?;
    match wire::recv::<_, Response>(conn).await? {
        Response::Welcome => Ok(()),
        Response::Error { message } => Err(RpcError::Auth(message)),
        other => Err(RpcError::Unexpected {
            expected: "welcome",
            got: other.describe(),
        }),
    }
}

/// Dials a runner over TCP.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    endpoint: String,
    token: String,
}

impl TcpDialer {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn dial(&self) -> Result<Connection, RpcError> {
        let stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(ProtocolError::from)?;
        stream.set_nodelay(true).map_err(ProtocolError::from)?;
        trace!(endpoint = %self.endpoint, "tcp connected");

        let mut conn: Connection = Box::new(stream);
        handshake(&mut conn, &self.token).await?;
        Ok(conn)
    }
}

/// Buffer size of each in-process pipe.
const LOCAL_PIPE_CAPACITY: usize = 64 * 1024;

/// Connects to an in-process [`RpcServer`].
///
/// Each dial spawns a server task on the other end of a memory pipe, so the
/// full protocol runs, handshake included.
#[derive(Clone)]
pub struct LocalDialer {
    endpoint: String,
    token: String,
    server: Arc<RpcServer>,
    cancel: CancellationToken,
}

impl LocalDialer {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        server: Arc<RpcServer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            server,
            cancel,
        }
    }
}

#[async_trait]
impl Dialer for LocalDialer {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn dial(&self) -> Result<Connection, RpcError> {
        if self.cancel.is_cancelled() {
            return Err(ProtocolError::Io(std::io::ErrorKind::ConnectionRefused.into()).into());
        }
        let (client, server_side) = tokio::io::duplex(LOCAL_PIPE_CAPACITY);
        let server = self.server.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let _ = server.serve_connection(server_side, cancel).await;
        });

        let mut conn: Connection = Box::new(client);
        handshake(&mut conn, &self.token).await?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::HandlerError, server::RpcHandler};
    use drover_model::{ExecRequest, JobDefinition};

    struct Idle;

    #[async_trait]
    impl RpcHandler for Idle {
        async fn dispatch(&self, _job: JobDefinition) -> Result<(), HandlerError> {
            Ok(())
        }

        async fn execute(
            &self,
            _request: ExecRequest,
            _cancel: CancellationToken,
        ) -> Result<Vec<u8>, HandlerError> {
            Ok(Vec::new())
        }
    }

    fn server() -> Arc<RpcServer> {
        Arc::new(RpcServer::new(Arc::new(Idle), "secret"))
    }

    #[tokio::test]
    async fn local_dial_completes_the_handshake() {
        let dialer = LocalDialer::new("local", "secret", server(), CancellationToken::new());
        let mut conn = dialer.dial().await.unwrap();

        wire::send(&mut conn, &Request::Ping { payload: "Ping!".into() })
            .await
            .unwrap();
        let reply: Response = wire::recv(&mut conn).await.unwrap();
        assert_eq!(reply, Response::Pong { payload: "Pong!".into() });
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let dialer = LocalDialer::new("local", "guess", server(), CancellationToken::new());
        match dialer.dial().await {
            Err(RpcError::Auth(_)) => {}
            Err(other) => panic!("expected Auth, got {other:?}"),
            Ok(_) => panic!("expected Auth, got a connection"),
        }
    }

    #[tokio::test]
    async fn cancelled_local_dialer_refuses() {
        let cancel = CancellationToken::new();
        let dialer = LocalDialer::new("local", "secret", server(), cancel.clone());
        cancel.cancel();
        assert!(dialer.dial().await.is_err());
    }

    #[tokio::test]
    async fn tcp_dial_reaches_a_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let cancel = CancellationToken::new();
        tokio::spawn(server().serve(listener, cancel.clone()));

        let dialer = TcpDialer::new(addr.clone(), "secret");
        assert_eq!(dialer.endpoint(), addr);
        let mut conn = dialer.dial().await.unwrap();
        wire::send(&mut conn, &Request::Ping { payload: "Ping!".into() })
            .await
            .unwrap();
        assert!(matches!(
            wire::recv::<_, Response>(&mut conn).await.unwrap(),
            Response::Pong { .. }
        ));
        cancel.cancel();
    }
}
