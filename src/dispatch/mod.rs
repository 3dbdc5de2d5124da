//! Dispatcher client: hands commands to xcatd and collects its XML reply

mod process;
mod request;
mod response;
mod socket;

pub use process::ProcessDispatcher;
pub use request::encode_request;
pub use response::{Element, XcatResponse};
pub use socket::SocketDispatcher;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Config, DispatcherConfig};
use crate::error::{Error, Result};
use crate::types::CommandRequest;

/// Executes one command and returns the dispatcher's reply
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, req: &CommandRequest) -> Result<XcatResponse>;
}

/// Build the dispatcher selected by the config
pub fn from_config(config: &Config) -> Arc<dyn Dispatcher> {
    match &config.dispatcher {
        DispatcherConfig::Socket { host, port } => Arc::new(
            SocketDispatcher::new(format!("{}:{}", host, port), config.timeout())
                .with_max_reply_bytes(config.max_reply_bytes),
        ),
        DispatcherConfig::Process { program, args } => Arc::new(
            ProcessDispatcher::new(program.clone(), args.clone(), config.timeout())
                .with_max_reply_bytes(config.max_reply_bytes),
        ),
    }
}

async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(limit))?
}

fn check_reply_size(len: usize, limit: Option<usize>) -> Result<()> {
    match limit {
        Some(max) if len > max => Err(Error::ReplyTooLarge(max)),
        _ => Ok(()),
    }
}
