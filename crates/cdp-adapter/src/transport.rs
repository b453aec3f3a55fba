//! Request/response channel to the browser's DevTools endpoint.
//!
//! The form workflow only issues commands and reads their answers; protocol
//! events are drained and dropped.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide_types::{CallId, Message, Response};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::launch::{self, CdpConfig};

/// Where a command is delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandTarget {
    Browser,
    /// Flattened session of one attached page.
    Session(String),
}

#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError>;

    /// Drops the connection; later commands fail with `CdpIo`.
    async fn close(&self) {}
}

type Reply = oneshot::Sender<Result<Value, AdapterError>>;

struct Request {
    target: CommandTarget,
    method: String,
    params: Value,
    reply: Reply,
}

/// Transport over a real Chrome, connected on the first command.
pub struct ChromiumTransport {
    cfg: CdpConfig,
    link: OnceCell<Link>,
}

impl ChromiumTransport {
    pub fn new(cfg: CdpConfig) -> Self {
        Self {
            cfg,
            link: OnceCell::new(),
        }
    }

    async fn link(&self) -> Result<&Link, AdapterError> {
        self.link.get_or_try_init(|| Link::open(&self.cfg)).await
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let deadline = Duration::from_millis(self.cfg.default_deadline_ms);
        self.link().await?.call(target, method, params, deadline).await
    }

    async fn close(&self) {
        if let Some(link) = self.link.get() {
            link.close().await;
        }
    }
}

struct Link {
    requests: mpsc::Sender<Request>,
    pump: JoinHandle<()>,
    /// Set when Chrome was launched by us rather than attached to.
    child: Mutex<Option<Child>>,
}

impl Link {
    async fn open(cfg: &CdpConfig) -> Result<Self, AdapterError> {
        let (child, url) = launch::endpoint(cfg).await?;
        let conn = Connection::<CdpEventMessage>::connect(&url)
            .await
            .map_err(|err| AdapterError::io(format!("connecting to {url}: {err}")))?;
        let (requests, inbox) = mpsc::channel(64);
        Ok(Self {
            requests,
            pump: tokio::spawn(pump(conn, inbox)),
            child: Mutex::new(child),
        })
    }

    async fn call(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, AdapterError> {
        let (reply, answer) = oneshot::channel();
        let request = Request {
            target,
            method: method.to_string(),
            params,
            reply,
        };
        self.requests
            .send(request)
            .await
            .map_err(|_| AdapterError::io("browser connection is closed"))?;
        match timeout(deadline, answer).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AdapterError::io("browser connection is closed")),
            Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout).with_hint(format!(
                "{method} unanswered after {}ms",
                deadline.as_millis()
            ))),
        }
    }

    async fn close(&self) {
        self.pump.abort();
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                warn!(target: "cdp-transport", ?err, "failed to stop chrome");
            }
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Moves requests onto the socket and answers from it until either side closes.
async fn pump(mut conn: Connection<CdpEventMessage>, mut inbox: mpsc::Receiver<Request>) {
    let mut pending: HashMap<CallId, Reply> = HashMap::new();
    let reason = loop {
        tokio::select! {
            request = inbox.recv() => match request {
                Some(request) => submit(&mut conn, request, &mut pending),
                None => break "transport dropped".to_string(),
            },
            message = conn.next() => match message {
                Some(Ok(Message::Response(response))) => {
                    if let Some(reply) = pending.remove(&response.id) {
                        let _ = reply.send(answer(response));
                    }
                }
                Some(Ok(Message::Event(_))) => {}
                Some(Err(err)) => break err.to_string(),
                None => break "browser closed the connection".to_string(),
            },
        }
    };

    warn!(target: "cdp-transport", %reason, in_flight = pending.len(), "browser connection ended");
    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(AdapterError::io(reason.clone())));
    }
}

fn submit(conn: &mut Connection<CdpEventMessage>, request: Request, pending: &mut HashMap<CallId, Reply>) {
    let session = match request.target {
        CommandTarget::Browser => None,
        CommandTarget::Session(id) => Some(CdpSessionId::from(id)),
    };
    debug!(target: "cdp-transport", method = %request.method, "submit");
    match conn.submit_command(request.method.into(), session, request.params) {
        Ok(id) => {
            pending.insert(id, request.reply);
        }
        Err(err) => {
            let _ = request
                .reply
                .send(Err(AdapterError::io(format!("submitting command: {err}"))));
        }
    }
}

fn answer(response: Response) -> Result<Value, AdapterError> {
    match (response.result, response.error) {
        (Some(result), _) => Ok(result),
        (None, Some(error)) => Err(AdapterError::io(format!(
            "{} (code {})",
            error.message, error.code
        ))),
        (None, None) => Err(AdapterError::internal("empty protocol response")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_is_an_io_failure() {
        let transport = ChromiumTransport::new(CdpConfig {
            websocket_url: Some("ws://127.0.0.1:9/devtools/browser/none".into()),
            default_deadline_ms: 2_000,
            ..CdpConfig::default()
        });

        let err = transport
            .send_command(CommandTarget::Browser, "Browser.getVersion", Value::Null)
            .await
            .expect_err("nothing listens on the discard port");
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
        assert!(err.to_string().contains("ws://127.0.0.1:9"));

        transport.close().await;
    }
}
