//! Broadcast Hub
//!
//! A single coordinating loop owns the set of connected observers. Nothing
//! outside the loop touches the set; callers go through a [`HubHandle`]
//! which sends register, unregister and broadcast messages over channels.
//!
//! Broadcast never waits on a slow observer. Each observer has a bounded
//! outbound queue and the hub uses a non-blocking send: when a queue is full
//! the observer is removed from the set. Dropping the hub's sender is what
//! closes that queue, and the hub holds the only sender, so a queue closes
//! exactly once whichever way the observer goes.
//!
//! # Example
//!
//! ```rust,ignore
//! let (hub, handle) = Hub::new(&HubConfig::default());
//! subsys.start(SubsystemBuilder::new("hub", |s| hub.run(s)));
//!
//! let (tx, rx) = mpsc::channel(256);
//! handle.register(handle.next_client_id(), tx).await?;
//! handle.try_broadcast(StreamMessage::Alert(alert))?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_graceful_shutdown::SubsystemHandle;

use neptune_core::StreamMessage;

use crate::config::HubConfig;

mod client;

pub use client::{run_session, serve, ClientPumps};

pub type ClientId = u64;

/// Serialized message shared by every observer queue
pub type Payload = Arc<str>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HubError {
    #[error("hub is not running")]
    Closed,
    #[error("hub broadcast queue is full")]
    Full,
    #[error("cannot encode message: {0}")]
    Encode(String),
}

struct Registration {
    id: ClientId,
    queue: mpsc::Sender<Payload>,
    done: oneshot::Sender<()>,
}

/// Cloneable access to a running [`Hub`]
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<Registration>,
    unregister_tx: mpsc::Sender<ClientId>,
    broadcast_tx: mpsc::Sender<Payload>,
    clients_rx: watch::Receiver<usize>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    pub fn next_client_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add an observer; returns once the hub has taken ownership of `queue`
    ///
    /// Broadcasts issued after this returns reach the new observer.
    pub async fn register(
        &self,
        id: ClientId,
        queue: mpsc::Sender<Payload>,
    ) -> Result<(), HubError> {
        let (done, registered) = oneshot::channel();
        self.register_tx
            .send(Registration { id, queue, done })
            .await
            .map_err(|_| HubError::Closed)?;
        registered.await.map_err(|_| HubError::Closed)
    }

    pub async fn unregister(&self, id: ClientId) -> Result<(), HubError> {
        self.unregister_tx
            .send(id)
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Queue a message for every observer without waiting
    pub fn try_broadcast(&self, message: &StreamMessage) -> Result<(), HubError> {
        let payload = encode(message)?;
        self.broadcast_tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::Full,
            mpsc::error::TrySendError::Closed(_) => HubError::Closed,
        })
    }

    pub async fn broadcast(&self, message: &StreamMessage) -> Result<(), HubError> {
        let payload = encode(message)?;
        self.broadcast_tx
            .send(payload)
            .await
            .map_err(|_| HubError::Closed)
    }

    pub fn client_count(&self) -> usize {
        *self.clients_rx.borrow()
    }

    /// Wait until the observer count satisfies `f`
    pub async fn wait_for_clients(&self, f: impl FnMut(&usize) -> bool) -> Result<(), HubError> {
        let mut rx = self.clients_rx.clone();
        rx.wait_for(f).await.map(|_| ()).map_err(|_| HubError::Closed)
    }
}

fn encode(message: &StreamMessage) -> Result<Payload, HubError> {
    message
        .to_json()
        .map(Payload::from)
        .map_err(|e| HubError::Encode(e.to_string()))
}

pub struct Hub {
    register_rx: mpsc::Receiver<Registration>,
    unregister_rx: mpsc::Receiver<ClientId>,
    broadcast_rx: mpsc::Receiver<Payload>,
    clients: HashMap<ClientId, mpsc::Sender<Payload>>,
    clients_tx: watch::Sender<usize>,
}

impl Hub {
    pub fn new(config: &HubConfig) -> (Hub, HubHandle) {
        let (register_tx, register_rx) = mpsc::channel(16);
        let (unregister_tx, unregister_rx) = mpsc::channel(16);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(config.broadcast_queue.max(1));
        let (clients_tx, clients_rx) = watch::channel(0);

        let hub = Hub {
            register_rx,
            unregister_rx,
            broadcast_rx,
            clients: HashMap::new(),
            clients_tx,
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            clients_rx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (hub, handle)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), HubError> {
        self.run_until(subsys.on_shutdown_requested()).await;
        Ok(())
    }

    /// Serve until `shutdown` completes or every handle is gone
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        log::debug!("hub: running");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    log::debug!("hub: shutdown");
                    break;
                },

                Some(r) = self.register_rx.recv() => {
                    self.clients.insert(r.id, r.queue);
                    self.publish_count();
                    log::info!("{}: observer registered, {} connected", r.id, self.clients.len());
                    let _ = r.done.send(());
                },

                Some(id) = self.unregister_rx.recv() => {
                    if self.clients.remove(&id).is_some() {
                        self.publish_count();
                        log::info!("{}: observer unregistered, {} connected", id, self.clients.len());
                    }
                },

                message = self.broadcast_rx.recv() => {
                    match message {
                        Some(payload) => self.fan_out(payload),
                        None => {
                            log::debug!("hub: all publishers gone");
                            break;
                        }
                    }
                },
            }
        }

        // Closes every remaining observer queue
        self.clients.clear();
        self.publish_count();
    }

    fn fan_out(&mut self, payload: Payload) {
        let mut dropped = Vec::new();
        for (id, queue) in &self.clients {
            match queue.try_send(payload.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("{}: observer queue full, dropping observer", id);
                    dropped.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("{}: observer queue closed", id);
                    dropped.push(*id);
                }
            }
        }
        if !dropped.is_empty() {
            for id in dropped {
                self.clients.remove(&id);
            }
            self.publish_count();
            log::info!("hub: {} observers connected", self.clients.len());
        }
    }

    fn publish_count(&self) {
        self.clients_tx.send_replace(self.clients.len());
    }
}
