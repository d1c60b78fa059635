use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tokio_util::sync::CancellationToken;

use neptune_core::StreamMessage;

use super::{ClientId, HubHandle, Payload};
use crate::config::HubConfig;

/// The two delivery tasks of one observer connection
///
/// The outbound pump drains the observer queue to the socket and pings on
/// a timer. The inbound pump reads control frames until the peer goes quiet
/// or closes. Whichever stops first cancels the other.
#[derive(Clone)]
pub struct ClientPumps {
    id: ClientId,
    config: HubConfig,
    cancel: CancellationToken,
}

impl ClientPumps {
    pub fn new(id: ClientId, config: HubConfig) -> Self {
        ClientPumps {
            id,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn send<S, E>(&self, sink: &mut S, message: Message) -> Result<(), String>
    where
        S: Sink<Message, Error = E> + Unpin,
        E: Display,
    {
        match timeout(self.config.write_wait, sink.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("write took longer than {:?}", self.config.write_wait)),
        }
    }

    /// Outbound pump
    ///
    /// Ends when the hub closes the queue (sending a Close frame), when a
    /// write fails or times out, or when the inbound pump stops.
    pub async fn write<S, E>(&self, mut sink: S, mut queue: mpsc::Receiver<Payload>)
    where
        S: Sink<Message, Error = E> + Unpin,
        E: Display,
    {
        let period = self.config.ping_period;
        let mut ping = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                payload = queue.recv() => match payload {
                    Some(payload) => {
                        let message = Message::Text(payload.as_ref().into());
                        if let Err(e) = self.send(&mut sink, message).await {
                            log::debug!("{}: write failed: {}", self.id, e);
                            break;
                        }
                    }
                    None => {
                        log::debug!("{}: queue closed by hub", self.id);
                        let _ = self.send(&mut sink, Message::Close(None)).await;
                        break;
                    }
                },

                _ = ping.tick() => {
                    if let Err(e) = self.send(&mut sink, Message::Ping(Bytes::new())).await {
                        log::debug!("{}: ping failed: {}", self.id, e);
                        break;
                    }
                    log::trace!("{}: ping", self.id);
                },
            }
        }
        self.cancel.cancel();
    }

    /// Inbound pump
    ///
    /// Any frame from the peer, pongs included, extends the read deadline
    /// by `pong_wait`. Ends on close, read error, silence, or when the
    /// outbound pump stops.
    pub async fn read<R, E>(&self, mut stream: R)
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                frame = timeout(self.config.pong_wait, stream.next()) => match frame {
                    Err(_) => {
                        log::info!("{}: no response within {:?}", self.id, self.config.pong_wait);
                        break;
                    }
                    Ok(None) | Ok(Some(Ok(Message::Close(_)))) => {
                        log::debug!("{}: closed by peer", self.id);
                        break;
                    }
                    Ok(Some(Err(e))) => {
                        log::debug!("{}: read failed: {}", self.id, e);
                        break;
                    }
                    Ok(Some(Ok(_))) => {}
                },
            }
        }
        self.cancel.cancel();
    }
}

/// Run one observer connection to completion
///
/// Sends the fleet snapshot straight to the socket first, then registers
/// with the hub and runs both pumps. The inbound pump runs on this task and
/// unregisters the observer when it stops.
pub async fn serve(socket: WebSocket, hub: HubHandle, snapshot: StreamMessage, config: HubConfig) {
    let (sink, stream) = socket.split();
    run_session(sink, stream, hub, snapshot, config).await;
}

/// Body of [`serve`] over any split message transport
pub async fn run_session<S, E, R, E2>(
    mut sink: S,
    stream: R,
    hub: HubHandle,
    snapshot: StreamMessage,
    config: HubConfig,
) where
    S: Sink<Message, Error = E> + Unpin + Send + 'static,
    E: Display + Send + 'static,
    R: Stream<Item = Result<Message, E2>> + Unpin,
    E2: Display,
{
    let id = hub.next_client_id();

    let initial = match snapshot.to_json() {
        Ok(json) => json,
        Err(e) => {
            log::error!("{}: cannot encode fleet snapshot: {}", id, e);
            return;
        }
    };
    match timeout(config.initial_send_timeout, sink.send(Message::Text(initial.into()))).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log::warn!("{}: initial fleet update failed: {}", id, e);
            return;
        }
        Err(_) => {
            log::warn!("{}: initial fleet update timed out", id);
            return;
        }
    }

    let (queue_tx, queue_rx) = mpsc::channel(config.client_queue.max(1));
    if let Err(e) = hub.register(id, queue_tx).await {
        log::warn!("{}: cannot register: {}", id, e);
        return;
    }

    let pumps = ClientPumps::new(id, config);
    let writer = {
        let pumps = pumps.clone();
        tokio::spawn(async move { pumps.write(sink, queue_rx).await })
    };

    pumps.read(stream).await;
    if let Err(e) = hub.unregister(id).await {
        log::debug!("{}: unregister: {}", id, e);
    }
    let _ = writer.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Hub;
    use futures::channel::mpsc as fmpsc;
    use neptune_core::{Alert, Position, Vessel};
    use std::io;
    use std::time::Duration;

    fn text(m: &Message) -> Option<&str> {
        match m {
            Message::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_write_pump_drains_then_closes() {
        let pumps = ClientPumps::new(1, HubConfig::default());
        let (queue_tx, queue_rx) = mpsc::channel(4);
        let (sink, sent) = fmpsc::unbounded::<Message>();

        queue_tx.send(Payload::from("one")).await.unwrap();
        queue_tx.send(Payload::from("two")).await.unwrap();
        drop(queue_tx);

        pumps.write(sink, queue_rx).await;
        let sent: Vec<Message> = sent.collect().await;
        assert_eq!(sent.len(), 3);
        assert_eq!(text(&sent[0]), Some("one"));
        assert_eq!(text(&sent[1]), Some("two"));
        assert!(matches!(sent[2], Message::Close(None)));
        assert!(pumps.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pump_pings() {
        let pumps = ClientPumps::new(2, HubConfig::default());
        let (_queue_tx, queue_rx) = mpsc::channel(4);
        let (sink, mut sent) = fmpsc::unbounded::<Message>();

        let writer = {
            let pumps = pumps.clone();
            tokio::spawn(async move { pumps.write(sink, queue_rx).await })
        };

        let first = sent.next().await.unwrap();
        assert!(matches!(first, Message::Ping(_)));

        pumps.cancel.cancel();
        writer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_pump_gives_up_on_silence() {
        let pumps = ClientPumps::new(3, HubConfig::default());
        let start = Instant::now();
        pumps
            .read(futures::stream::pending::<Result<Message, io::Error>>())
            .await;
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(pumps.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pongs_extend_the_deadline() {
        let pumps = ClientPumps::new(4, HubConfig::default());
        let (frames_tx, frames_rx) = fmpsc::unbounded::<Result<Message, io::Error>>();

        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_secs(45)).await;
                let _ = frames_tx.unbounded_send(Ok(Message::Pong(Bytes::new())));
            }
            tokio::time::sleep(Duration::from_secs(10)).await;
            let _ = frames_tx.unbounded_send(Ok(Message::Close(None)));
        });

        let start = Instant::now();
        pumps.read(frames_rx).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(145));
        assert!(elapsed < Duration::from_secs(200));
    }

    #[tokio::test]
    async fn test_pumps_stop_each_other() {
        let pumps = ClientPumps::new(5, HubConfig::default());
        let (_queue_tx, queue_rx) = mpsc::channel(4);
        let (sink, _sent) = fmpsc::unbounded::<Message>();

        let writer = {
            let pumps = pumps.clone();
            tokio::spawn(async move { pumps.write(sink, queue_rx).await })
        };

        // Peer closes: the inbound pump stops and takes the writer with it
        pumps
            .read(futures::stream::iter(vec![Ok::<_, io::Error>(Message::Close(None))]))
            .await;
        tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (hub, handle) = Hub::new(&HubConfig::default());
        let stop = CancellationToken::new();
        tokio::spawn(hub.run_until(stop.clone().cancelled_owned()));

        let (sink, mut sent) = fmpsc::unbounded::<Message>();
        let (frames_tx, frames_rx) = fmpsc::unbounded::<Result<Message, io::Error>>();
        let vessel = Vessel::new("v-1", "Neptune Star", Position::new(43.5, 16.4));
        let snapshot = StreamMessage::FleetUpdate(vec![vessel.clone()]);
        assert_eq!(handle.client_count(), 0);

        let session = tokio::spawn(run_session(
            sink,
            frames_rx,
            handle.clone(),
            snapshot,
            HubConfig::default(),
        ));

        // The snapshot goes out before anything else
        let first = sent.next().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(text(&first).unwrap()).unwrap();
        assert_eq!(json["type"], "FLEET_UPDATE");
        assert_eq!(json["payload"][0]["id"], "v-1");

        tokio::time::timeout(Duration::from_secs(1), handle.wait_for_clients(|n| *n == 1))
            .await
            .unwrap()
            .unwrap();

        // Registered observers receive broadcasts
        handle
            .broadcast(&StreamMessage::Alert(Alert::out_of_fuel(&vessel)))
            .await
            .unwrap();
        let next = tokio::time::timeout(Duration::from_secs(1), sent.next())
            .await
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(text(&next).unwrap()).unwrap();
        assert_eq!(json["type"], "ALERT");

        // Peer closes: the observer leaves the hub and the session ends
        frames_tx.unbounded_send(Ok(Message::Close(None))).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle.wait_for_clients(|n| *n == 0))
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), session)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.client_count(), 0);

        stop.cancel();
    }
}
