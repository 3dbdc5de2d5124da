//! Stdio transport through a local xCAT client program

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{check_reply_size, encode_request, with_timeout, Dispatcher, XcatResponse};
use crate::error::{Error, Result};
use crate::types::CommandRequest;

pub struct ProcessDispatcher {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    max_reply_bytes: Option<usize>,
}

impl ProcessDispatcher {
    pub fn new(program: PathBuf, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
            max_reply_bytes: None,
        }
    }

    pub fn with_max_reply_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_reply_bytes = limit;
        self
    }

    async fn exchange(&self, payload: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Dispatch(format!("cannot start {}: {}", self.program.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A client that exits without reading is reported through its status
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Dispatch(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        check_reply_size(output.stdout.len(), self.max_reply_bytes)?;

        String::from_utf8(output.stdout)
            .map_err(|e| Error::InvalidResponse(format!("reply is not UTF-8: {}", e)))
    }
}

#[async_trait]
impl Dispatcher for ProcessDispatcher {
    async fn dispatch(&self, req: &CommandRequest) -> Result<XcatResponse> {
        tracing::debug!(
            "Dispatching {} via {} (target: {:?}, {} args)",
            req.command,
            self.program.display(),
            req.noderange,
            req.args.len()
        );

        let payload = encode_request(req);
        let stream = with_timeout(self.timeout, self.exchange(&payload)).await?;
        XcatResponse::parse(&stream)
    }
}
