//! WebSocket peer transport: inbound accept loop, outbound dialing, and one
//! reader/writer task pair per connection.
use crate::constants::{CONNECT_TIMEOUT_SECS, PEER_OUTBOX_CAPACITY};
use crate::node::Event;
use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use ledger_core::PeerId;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_async, connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Turns sockets into node events. Cheap to clone.
#[derive(Clone)]
pub struct PeerNetwork {
    events: mpsc::Sender<Event>,
    next_id: Arc<AtomicU64>,
}

/// Accept `ws://host:port`, `wss://...` or a bare `host:port`.
pub fn peer_url(address: &str) -> String {
    if address.starts_with("ws://") || address.starts_with("wss://") {
        address.to_string()
    } else {
        format!("ws://{address}")
    }
}

impl PeerNetwork {
    pub fn new(events: mpsc::Sender<Event>) -> Self {
        Self {
            events,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Bind the peer listener and spawn its accept loop. Returns the bound address.
    pub async fn listen(&self, addr: SocketAddr) -> Result<SocketAddr> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding p2p listener on {addr}"))?;
        let local = listener.local_addr()?;
        info!("p2p listening on ws://{local}");

        let network = self.clone();
        tokio::spawn(async move {
            loop {
                let (stream, remote) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let network = network.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => {
                            network.spawn_connection(ws, remote.to_string());
                        }
                        Err(e) => debug!(%remote, error = %e, "websocket handshake failed"),
                    }
                });
            }
        });
        Ok(local)
    }

    /// Dial a peer. Resolves once the WebSocket handshake completes.
    pub async fn connect(&self, address: &str) -> Result<PeerId> {
        let url = peer_url(address);
        let (ws, _response) =
            tokio::time::timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), connect_async(url.as_str()))
                .await
                .map_err(|_| anyhow!("timed out connecting to {url}"))?
                .with_context(|| format!("connecting to {url}"))?;

        let remote = match ws.get_ref() {
            MaybeTlsStream::Plain(tcp) => tcp.peer_addr().ok().map(|a| a.to_string()),
            _ => None,
        }
        .unwrap_or_else(|| address.to_string());

        info!(%url, "connected to peer");
        Ok(self.spawn_connection(ws, remote))
    }

    fn spawn_connection<S>(&self, ws: WebSocketStream<S>, addr: String) -> PeerId
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let peer = PeerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (outbox, mut outbox_rx) = mpsc::channel::<String>(PEER_OUTBOX_CAPACITY);
        let events = self.events.clone();

        tokio::spawn(async move {
            // Registration is queued ahead of any message this peer sends.
            if events
                .send(Event::Connected { peer, addr, outbox })
                .await
                .is_err()
            {
                return;
            }

            let (mut sink, mut stream) = ws.split();
            let writer = tokio::spawn(async move {
                while let Some(frame) = outbox_rx.recv().await {
                    if let Err(e) = sink.send(WsMessage::text(frame)).await {
                        debug!(%peer, error = %e, "send failed");
                        break;
                    }
                }
                let _ = sink.close().await;
            });

            while let Some(frame) = stream.next().await {
                let raw = match frame {
                    Ok(WsMessage::Text(text)) => text.as_str().to_owned(),
                    Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!(%peer, "dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!(%peer, error = %e, "read failed");
                        break;
                    }
                };
                if events.send(Event::Message { peer, raw }).await.is_err() {
                    break;
                }
            }

            writer.abort();
            let _ = events.send(Event::Disconnected { peer }).await;
        });

        peer
    }
}
