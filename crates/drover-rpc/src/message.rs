use serde::{Deserialize, Serialize};

use drover_model::{ExecRequest, JobDefinition};

/// Liveness probe payload sent by the heartbeat.
pub const PING: &str = "Ping!";
/// Reply a healthy runner gives to [`PING`].
pub const PONG: &str = "Pong!";

/// Dispatcher to runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Request {
    /// First frame on every connection.
    Hello { token: String },

    Ping { payload: String },

    /// Build and register one job on the runner.
    Dispatch { job: JobDefinition },

    /// Run a process on the runner and return its stdout.
    Execute { request: ExecRequest },
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::Hello { .. } => "hello",
            Request::Ping { .. } => "ping",
            Request::Dispatch { .. } => "dispatch",
            Request::Execute { .. } => "execute",
        }
    }
}

/// Runner to dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Response {
    /// Handshake accepted.
    Welcome,

    Pong { payload: String },

    /// Job accepted.
    Ack,

    /// Captured process output.
    Output { bytes: Vec<u8> },

    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    /// Short description for logs and [`RpcError::Unexpected`](crate::RpcError::Unexpected).
    pub fn describe(&self) -> String {
        match self {
            Response::Welcome => "welcome".into(),
            Response::Pong { payload } => format!("pong({payload})"),
            Response::Ack => "ack".into(),
            Response::Output { bytes } => format!("output({} bytes)", bytes.len()),
            Response::Error { message } => format!("error({message})"),
        }
    }
}
