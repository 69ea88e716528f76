//! JSON-lines front end
//!
//! Each input line is one [`ConsoleRequest`]; each output line is one
//! [`ConsoleResponse`]. Subscriptions run concurrently with later requests
//! and their responses are interleaved on the output, tagged by id.

use std::collections::HashMap;
use std::sync::Arc;

use gnmi_lite_core::subscribe::PollHandle;
use gnmi_lite_core::{
    CapabilityResponse, Code, GetRequest, GetResponse, GnmiError, Server, SetRequest, SetResponse,
    SubscribeResponse, SubscriptionList, SubscriptionMode,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConsoleRequest {
    Capabilities,
    Get(GetRequest),
    Set(SetRequest),
    Subscribe(SubscriptionList),
    /// Re-collect a POLL subscription
    Poll { id: Uuid },
    /// End a subscription
    Cancel { id: Uuid },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsoleResponse {
    Capabilities(CapabilityResponse),
    Get(GetResponse),
    Set(SetResponse),
    Subscribed { id: Uuid, mode: SubscriptionMode },
    Subscription { id: Uuid, response: SubscribeResponse },
    /// The subscription produced its last response
    Ended { id: Uuid },
    Cancelled { id: Uuid },
    Error { code: Code, message: String },
}

impl From<GnmiError> for ConsoleResponse {
    fn from(err: GnmiError) -> Self {
        ConsoleResponse::Error {
            code: err.code(),
            message: err.message().to_string(),
        }
    }
}

struct ActiveSubscription {
    mode: SubscriptionMode,
    poll: Option<PollHandle>,
    forwarder: JoinHandle<()>,
}

struct Console {
    server: Arc<Server>,
    out: mpsc::UnboundedSender<ConsoleResponse>,
    subscriptions: HashMap<Uuid, ActiveSubscription>,
    /// Ids of subscriptions whose forwarder reached the end of its stream
    finished_tx: mpsc::UnboundedSender<Uuid>,
    finished_rx: mpsc::UnboundedReceiver<Uuid>,
}

impl Console {
    fn new(server: Arc<Server>, out: mpsc::UnboundedSender<ConsoleResponse>) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        Self {
            server,
            out,
            subscriptions: HashMap::new(),
            finished_tx,
            finished_rx,
        }
    }

    fn forget_finished(&mut self) {
        while let Ok(id) = self.finished_rx.try_recv() {
            if self.subscriptions.remove(&id).is_some() {
                debug!(client = %id, "subscription ended");
            }
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let response = match serde_json::from_str::<ConsoleRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                debug!(error = %e, "malformed request");
                Some(GnmiError::invalid_argument(format!("malformed request: {e}")).into())
            }
        };
        if let Some(response) = response {
            let _ = self.out.send(response);
        }
    }

    async fn handle(&mut self, request: ConsoleRequest) -> Option<ConsoleResponse> {
        self.forget_finished();
        match request {
            ConsoleRequest::Capabilities => {
                Some(ConsoleResponse::Capabilities(self.server.capabilities()))
            }
            ConsoleRequest::Get(req) => Some(match self.server.get(&req).await {
                Ok(resp) => ConsoleResponse::Get(resp),
                Err(e) => e.into(),
            }),
            ConsoleRequest::Set(req) => Some(match self.server.set(&req).await {
                Ok(resp) => ConsoleResponse::Set(resp),
                Err(e) => e.into(),
            }),
            ConsoleRequest::Subscribe(list) => self.subscribe(list).await,
            ConsoleRequest::Poll { id } => {
                let handle = self.subscriptions.get(&id).and_then(|s| s.poll.clone());
                match handle {
                    Some(handle) => {
                        handle.poll().await;
                        None
                    }
                    None => Some(
                        GnmiError::invalid_argument(format!("no POLL subscription {id}")).into(),
                    ),
                }
            }
            ConsoleRequest::Cancel { id } => match self.subscriptions.remove(&id) {
                Some(active) => {
                    active.forwarder.abort();
                    Some(ConsoleResponse::Cancelled { id })
                }
                None => Some(GnmiError::not_found(format!("no subscription {id}")).into()),
            },
        }
    }

    async fn subscribe(&mut self, list: SubscriptionList) -> Option<ConsoleResponse> {
        let mut stream = match self.server.subscribe(&list).await {
            Ok(stream) => stream,
            Err(e) => return Some(e.into()),
        };
        let id = stream.id();
        let mode = stream.mode();
        let poll = stream.poll_handle().ok().cloned();

        // announced before the forwarder can emit anything for this id
        let _ = self.out.send(ConsoleResponse::Subscribed { id, mode });

        let out = self.out.clone();
        let finished = self.finished_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(response) = stream.next().await {
                if out
                    .send(ConsoleResponse::Subscription { id, response })
                    .is_err()
                {
                    return;
                }
            }
            // forgotten before the client can observe the end
            let _ = finished.send(id);
            let _ = out.send(ConsoleResponse::Ended { id });
        });
        self.subscriptions
            .insert(id, ActiveSubscription { mode, poll, forwarder });
        None
    }

    /// End every subscription that would outlive the input. ONCE
    /// subscriptions are left to drain.
    fn close_open_ended(&mut self) {
        for (id, active) in self.subscriptions.drain() {
            if active.mode != SubscriptionMode::Once {
                debug!(client = %id, "closing subscription at end of input");
                active.forwarder.abort();
            }
        }
    }
}

/// Serve requests from `input` until it ends and every ONCE subscription
/// has drained, writing responses to `output`.
pub async fn run<R, W>(server: Arc<Server>, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut console = Some(Console::new(server, tx));
    let mut lines = input.lines();

    info!("console ready");
    loop {
        tokio::select! {
            line = lines.next_line(), if console.is_some() => match line? {
                Some(line) => {
                    if let Some(console) = console.as_mut() {
                        console.handle_line(&line).await;
                    }
                }
                None => {
                    // dropping the console leaves forwarders as the only senders
                    if let Some(mut console) = console.take() {
                        console.close_open_ended();
                    }
                }
            },
            response = rx.recv() => match response {
                Some(response) => write_response(&mut output, &response).await?,
                None => break,
            },
        }
    }
    info!("console closed");
    Ok(())
}

async fn write_response<W>(output: &mut W, response: &ConsoleResponse) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    if let ConsoleResponse::Error { code, message } = response {
        warn!(?code, %message, "request failed");
    }
    Ok(())
}
