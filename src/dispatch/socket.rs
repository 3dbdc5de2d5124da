//! TCP transport to the xcatd listener

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::response::DoneScanner;
use super::{check_reply_size, encode_request, with_timeout, Dispatcher, XcatResponse};
use crate::error::{Error, Result};
use crate::types::CommandRequest;

const READ_CHUNK: usize = 8192;

pub struct SocketDispatcher {
    addr: String,
    timeout: Duration,
    max_reply_bytes: Option<usize>,
}

impl SocketDispatcher {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            max_reply_bytes: None,
        }
    }

    pub fn with_max_reply_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_reply_bytes = limit;
        self
    }

    async fn exchange(&self, payload: &str) -> Result<String> {
        let mut stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            Error::Dispatch(format!("cannot connect to xcatd at {}: {}", self.addr, e))
        })?;

        stream.write_all(payload.as_bytes()).await?;
        stream.flush().await?;

        let mut raw = Vec::new();
        let mut buf = vec![0u8; READ_CHUNK];
        let mut scanner = DoneScanner::default();
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            check_reply_size(raw.len(), self.max_reply_bytes)?;
            if scanner.feed(&raw) {
                break;
            }
        }

        String::from_utf8(raw)
            .map_err(|e| Error::InvalidResponse(format!("reply is not UTF-8: {}", e)))
    }
}

#[async_trait]
impl Dispatcher for SocketDispatcher {
    async fn dispatch(&self, req: &CommandRequest) -> Result<XcatResponse> {
        tracing::debug!(
            "Dispatching {} to {} (target: {:?}, {} args)",
            req.command,
            self.addr,
            req.noderange,
            req.args.len()
        );

        let payload = encode_request(req);
        let stream = with_timeout(self.timeout, self.exchange(&payload)).await?;
        XcatResponse::parse(&stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Accept one connection, capture the request and answer with `chunks`,
    /// pausing between them
    async fn fake_xcatd(
        chunks: Vec<String>,
        pause: Duration,
        close: bool,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            for (i, chunk) in chunks.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(pause).await;
                }
                if socket.write_all(chunk.as_bytes()).await.is_err() {
                    break;
                }
            }
            if !close {
                // Hold the connection open; the client must stop on serverdone
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        (addr, handle)
    }

    fn one(reply: &str) -> Vec<String> {
        vec![reply.to_string()]
    }

    #[tokio::test]
    async fn test_stops_at_serverdone() {
        let (addr, handle) = fake_xcatd(
            one("<xcatresponse><data>node1: on</data></xcatresponse>\
                 <xcatresponse><serverdone></serverdone></xcatresponse>"),
            Duration::ZERO,
            false,
        )
        .await;

        let dispatcher = SocketDispatcher::new(addr, Duration::from_secs(2));
        let req = CommandRequest::new("rpower").with_noderange("node1").with_args("stat");
        let rsp = dispatcher.dispatch(&req).await.unwrap();

        let responses: Vec<_> = rsp.responses().collect();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].text_at(&["data"]), "node1: on");

        handle.abort();
    }

    #[tokio::test]
    async fn test_serverdone_in_output_text() {
        let (addr, handle) = fake_xcatd(
            vec![
                "<xcatresponse><data>log: serverdone received</data></xcatresponse>".to_string(),
                "<xcatresponse><data>second line</data></xcatresponse>\
                 <xcatresponse><serverdone/></xcatresponse>"
                    .to_string(),
            ],
            Duration::from_millis(200),
            false,
        )
        .await;

        let dispatcher = SocketDispatcher::new(addr, Duration::from_secs(2));
        let rsp = dispatcher
            .dispatch(&CommandRequest::new("xdsh").with_noderange("node1").with_args("tail /var/log/messages"))
            .await
            .unwrap();

        let texts: Vec<_> = rsp.responses().map(|r| r.text_at(&["data"])).collect();
        assert_eq!(texts, vec!["log: serverdone received", "second line"]);

        handle.abort();
    }

    #[tokio::test]
    async fn test_reply_larger_than_read_chunk() {
        let line = "<xcatresponse><data>node: 0123456789abcdef</data></xcatresponse>";
        let count = 4 * READ_CHUNK / line.len() + 1;
        let mut body = line.repeat(count);
        body.push_str("<xcatresponse><serverdone></serverdone></xcatresponse>");

        // Split right inside the closing tag
        let split = body.len() - 7;
        let (addr, handle) = fake_xcatd(
            vec![body[..split].to_string(), body[split..].to_string()],
            Duration::from_millis(50),
            false,
        )
        .await;

        let dispatcher = SocketDispatcher::new(addr, Duration::from_secs(2));
        let rsp = dispatcher.dispatch(&CommandRequest::new("rinv")).await.unwrap();

        assert_eq!(rsp.responses().count(), count);
        handle.abort();
    }

    #[tokio::test]
    async fn test_reply_size_limit() {
        let body = "<xcatresponse><data>x</data></xcatresponse>".repeat(100);
        let (addr, handle) = fake_xcatd(one(&body), Duration::ZERO, false).await;

        let dispatcher =
            SocketDispatcher::new(addr, Duration::from_secs(2)).with_max_reply_bytes(Some(256));
        let err = dispatcher.dispatch(&CommandRequest::new("rinv")).await.unwrap_err();

        assert!(matches!(err, Error::ReplyTooLarge(256)));
        handle.abort();
    }

    #[tokio::test]
    async fn test_reads_until_close() {
        let (addr, handle) = fake_xcatd(
            one("<xcatresponse><info>done</info></xcatresponse>"),
            Duration::ZERO,
            true,
        )
        .await;

        let dispatcher = SocketDispatcher::new(addr, Duration::from_secs(2));
        let rsp = dispatcher
            .dispatch(&CommandRequest::new("lsdef").with_args("-t;osimage"))
            .await
            .unwrap();

        assert_eq!(rsp.responses().count(), 1);

        let request = handle.await.unwrap();
        assert_eq!(
            request,
            "<xcatrequest><command>lsdef</command><arg>-t</arg><arg>osimage</arg></xcatrequest>"
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let (addr, handle) =
            fake_xcatd(one("<xcatresponse><data>partial</data>"), Duration::ZERO, false).await;

        let dispatcher = SocketDispatcher::new(addr, Duration::from_millis(200));
        let err = dispatcher
            .dispatch(&CommandRequest::new("rinv"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(200)));
        assert_eq!(err.to_string(), "Dispatcher timed out after 200ms");
        handle.abort();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let dispatcher = SocketDispatcher::new(addr, Duration::from_secs(2));
        let err = dispatcher
            .dispatch(&CommandRequest::new("nodels"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Dispatch(_)));
    }
}
