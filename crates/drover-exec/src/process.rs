use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use drover_model::ExecRequest;

use crate::error::ExecError;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Turn a non-zero exit into [`ExecError::NonZeroExit`].
    pub fn into_success(self, file: &str) -> Result<Self, ExecError> {
        if self.success() {
            return Ok(self);
        }
        Err(ExecError::NonZeroExit {
            file: file.to_string(),
            code: self.code,
            stderr: self.stderr_lossy().trim_end().to_string(),
        })
    }
}

/// Run `request` to completion and capture its output.
///
/// The child is killed when `cancel` fires before it exits.
pub async fn run_process(
    request: &ExecRequest,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, ExecError> {
    trace!(file = %request.file, args = ?request.args, "spawning process");

    let child = Command::new(&request.file)
        .args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecError::Spawn {
            file: request.file.clone(),
            source,
        })?;

    tokio::select! {
        res = child.wait_with_output() => {
            let output = res?;
            debug!(file = %request.file, code = ?output.status.code(), "process exited");
            Ok(ProcessOutput {
                code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
        _ = cancel.cancelled() => {
            debug!(file = %request.file, "cancellation requested; killing process");
            Err(ExecError::Cancelled { file: request.file.clone() })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let req = ExecRequest::new("/bin/echo", ["hi"]);
        let out = run_process(&req, &CancellationToken::new()).await.unwrap();

        assert!(out.success());
        assert_eq!(out.stdout_lossy(), "hi\n");
        assert!(out.stderr.is_empty());
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let req = ExecRequest::new("/bin/sh", ["-c", "echo oops >&2; exit 3"]);
        let out = run_process(&req, &CancellationToken::new()).await.unwrap();
        assert_eq!(out.code, Some(3));

        match out.into_success("/bin/sh") {
            Err(ExecError::NonZeroExit { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let req = ExecRequest::new("/definitely/not/here", Vec::<String>::new());
        assert!(matches!(
            run_process(&req, &CancellationToken::new()).await,
            Err(ExecError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let req = ExecRequest::new("/bin/sleep", ["30"]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        assert!(matches!(
            run_process(&req, &cancel).await,
            Err(ExecError::Cancelled { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
