//! Subscription Engine
//!
//! Every subscription owns a private update queue drained by a consumer task
//! that turns updates into responses (update or delete notification, then a
//! sync marker). ONCE and POLL fill the queue by resolving the subscribed
//! paths; STREAM subscriptions are registered by canonical path string and
//! fed by the broadcaster, which consumes the change bus.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{GnmiError, GnmiResult};
use crate::events::ChangeReceiver;
use crate::path::full_path;
use crate::read::ReadResolver;
use crate::types::{Path, SubscribeResponse, SubscriptionList, SubscriptionMode, Update};

/// Queue end a registration pushes into.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: Uuid,
    queue: mpsc::UnboundedSender<Update>,
}

/// STREAM registrations keyed by canonical full path.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    clients: Mutex<HashMap<String, Vec<ClientHandle>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<ClientHandle>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, key: String, handle: ClientHandle) {
        debug!(path = %key, client = %handle.id, "registering stream subscription");
        self.lock().entry(key).or_default().push(handle);
    }

    /// Remove every registration of client `id`. Returns how many were
    /// removed.
    pub fn deregister(&self, id: Uuid) -> usize {
        let mut clients = self.lock();
        let mut removed = 0;
        clients.retain(|_, handles| {
            let before = handles.len();
            handles.retain(|h| h.id != id);
            removed += before - handles.len();
            !handles.is_empty()
        });
        removed
    }

    /// Clients registered for exactly `key`.
    pub fn matching(&self, key: &str) -> Vec<ClientHandle> {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    /// Number of distinct registered paths.
    pub fn path_count(&self) -> usize {
        self.lock().len()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

/// Resolve every path into `queue`; failures become value-less updates.
async fn collect(
    resolver: &ReadResolver,
    prefix: Option<&Path>,
    paths: &[Path],
    queue: &mpsc::UnboundedSender<Update>,
) {
    for path in paths {
        let update = match resolver.resolve(prefix, path).await {
            Ok(update) => update,
            Err(e) => {
                debug!(path = %path, error = %e, "subscribed path did not resolve");
                Update::empty(path.clone())
            }
        };
        if queue.send(update).is_err() {
            return;
        }
    }
}

/// Drain a client queue into its response channel.
async fn deliver(
    id: Uuid,
    mut queue: mpsc::UnboundedReceiver<Update>,
    out: mpsc::Sender<SubscribeResponse>,
    registry: Arc<SubscriptionRegistry>,
) {
    while let Some(update) = queue.recv().await {
        let response = match update.val {
            Some(_) => SubscribeResponse::update(update),
            None => SubscribeResponse::delete(update.path),
        };
        if out.send(response).await.is_err() || out.send(SubscribeResponse::sync()).await.is_err()
        {
            warn!(client = %id, "subscriber is gone, dropping its registrations");
            registry.deregister(id);
            return;
        }
    }
    debug!(client = %id, "subscription queue closed");
}

/// Consume the change bus, pushing the current value of each changed path to
/// the clients registered for it.
pub fn spawn_broadcaster(
    mut events: ChangeReceiver,
    registry: Arc<SubscriptionRegistry>,
    resolver: ReadResolver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let key = event.path.to_string();
            let clients = registry.matching(&key);
            if clients.is_empty() {
                continue;
            }
            let update = match resolver.resolve(None, &event.path).await {
                Ok(update) => update,
                Err(e) => {
                    debug!(path = %key, error = %e, "changed path no longer resolves");
                    Update::empty(event.path.clone())
                }
            };
            for client in clients {
                if client.queue.send(update.clone()).is_err() {
                    warn!(path = %key, client = %client.id, "failed to queue update");
                    registry.deregister(client.id);
                }
            }
        }
        debug!("change bus closed, broadcaster exiting");
    })
}

/// Re-runs the collection pass of a POLL subscription.
#[derive(Clone)]
pub struct PollHandle {
    resolver: ReadResolver,
    prefix: Option<Path>,
    paths: Vec<Path>,
    queue: mpsc::UnboundedSender<Update>,
}

impl PollHandle {
    pub async fn poll(&self) {
        collect(&self.resolver, self.prefix.as_ref(), &self.paths, &self.queue).await;
    }
}

/// Responses of one subscription. Dropping it ends the subscription.
pub struct SubscribeStream {
    id: Uuid,
    mode: SubscriptionMode,
    responses: ReceiverStream<SubscribeResponse>,
    poll: Option<PollHandle>,
    registry: Arc<SubscriptionRegistry>,
    consumer: JoinHandle<()>,
}

impl SubscribeStream {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> SubscriptionMode {
        self.mode
    }

    /// Collect all subscribed paths again (POLL only).
    pub async fn poll(&self) -> GnmiResult<()> {
        let handle = self.poll_handle()?;
        handle.poll().await;
        Ok(())
    }

    pub fn poll_handle(&self) -> GnmiResult<&PollHandle> {
        self.poll.as_ref().ok_or_else(|| {
            GnmiError::invalid_argument(format!("subscription {} is not in POLL mode", self.id))
        })
    }
}

impl Stream for SubscribeStream {
    type Item = SubscribeResponse;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.responses).poll_next(cx)
    }
}

impl Drop for SubscribeStream {
    fn drop(&mut self) {
        let removed = self.registry.deregister(self.id);
        self.consumer.abort();
        debug!(client = %self.id, removed, "subscription closed");
    }
}

/// Start a subscription. Request checks happen before this point.
pub async fn start(
    list: &SubscriptionList,
    resolver: ReadResolver,
    registry: Arc<SubscriptionRegistry>,
    buffer: usize,
) -> SubscribeStream {
    let id = Uuid::now_v7();
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::channel(buffer.max(1));
    let consumer = tokio::spawn(deliver(id, queue_rx, out_tx, registry.clone()));

    let prefix = list.prefix.as_ref();
    let paths: Vec<Path> = list.subscription.iter().map(|s| s.path.clone()).collect();
    info!(client = %id, mode = ?list.mode, paths = paths.len(), "subscribe");

    let mut poll = None;
    match list.mode {
        SubscriptionMode::Once => {
            collect(&resolver, prefix, &paths, &queue_tx).await;
        }
        SubscriptionMode::Poll => {
            collect(&resolver, prefix, &paths, &queue_tx).await;
            poll = Some(PollHandle {
                resolver,
                prefix: list.prefix.clone(),
                paths,
                queue: queue_tx,
            });
        }
        SubscriptionMode::Stream => {
            for path in &paths {
                let key = full_path(prefix, path).to_string();
                registry.register(
                    key,
                    ClientHandle {
                        id,
                        queue: queue_tx.clone(),
                    },
                );
            }
            if !list.updates_only {
                collect(&resolver, prefix, &paths, &queue_tx).await;
            }
        }
    }

    SubscribeStream {
        id,
        mode: list.mode,
        responses: ReceiverStream::new(out_rx),
        poll,
        registry,
        consumer,
    }
}
