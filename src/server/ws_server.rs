//! WebSocket transport façade for the server.
//!
//! The listener accepts any number of peers. Each peer gets an outbound
//! queue drained by a writer task; `broadcast` pushes the same encoded
//! frame into every live queue synchronously, so notification order is
//! preserved relative to the responses a peer's own reader enqueues.
//! A failing peer is absorbed: its queue is dropped on disconnect and
//! everyone else still receives.

use crate::server::Server;
use crate::shared::codec::{encode_frame, parse_error_response, parse_frame, Frame};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// The set of live peer connections.
#[derive(Debug, Default)]
pub struct PeerSet {
    peers: parking_lot::RwLock<HashMap<u64, mpsc::UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl PeerSet {
    /// Create an empty peer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Whether no peers are connected.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Send an encoded frame to every live peer.
    ///
    /// A peer whose queue is gone is skipped; its reader task removes it
    /// from the set when the disconnect is observed.
    pub fn broadcast(&self, text: &str) {
        for (peer_id, tx) in self.peers.read().iter() {
            if tx.send(text.to_string()).is_err() {
                tracing::debug!(peer = peer_id, "dropping frame for disconnected peer");
            }
        }
    }

    fn add(&self, tx: mpsc::UnboundedSender<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.peers.write().insert(id, tx);
        id
    }

    fn remove(&self, id: u64) {
        self.peers.write().remove(&id);
    }
}

/// Accept peers until cancelled.
pub(crate) async fn serve(server: Arc<Server>, listener: TcpListener, token: CancellationToken) {
    loop {
        let accepted = tokio::select! {
            () = token.cancelled() => return,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, addr)) => {
                tracing::info!(%addr, "client connected");
                let server = server.clone();
                tokio::spawn(async move {
                    handle_connection(server, stream).await;
                    tracing::info!(%addr, "client disconnected");
                });
            },
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
            },
        }
    }
}

async fn handle_connection(server: Arc<Server>, stream: TcpStream) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            tracing::warn!(error = %err, "websocket handshake failed");
            return;
        },
    };
    let (mut sink, mut stream) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let peer_id = server.peers().add(tx.clone());

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                dispatch_frame(&server, &tx, text.as_str()).await;
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {},
            Err(err) => {
                tracing::debug!(peer = peer_id, error = %err, "read failed");
                break;
            },
        }
    }

    server.peers().remove(peer_id);
    drop(tx);
    // Let queued frames flush before the writer exits.
    let _ = writer.await;
}

async fn dispatch_frame(server: &Arc<Server>, tx: &mpsc::UnboundedSender<String>, text: &str) {
    match parse_frame(text) {
        Ok(Frame::Request(request)) => {
            let response = server
                .handle_request(request.id, &request.method, request.params)
                .await;
            if let Ok(encoded) = encode_frame(&response) {
                let _ = tx.send(encoded);
            }
        },
        Ok(Frame::Notification(notification)) => {
            server.handle_notification(notification).await;
        },
        // The server never issues requests, so responses are unsolicited.
        Ok(Frame::Response(_)) => {},
        Err(err) => {
            tracing::debug!(error = %err, "unparseable frame");
            if let Ok(encoded) = encode_frame(&parse_error_response()) {
                let _ = tx.send(encoded);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_skips_dead_peers() {
        let peers = PeerSet::new();
        let (alive_tx, mut alive_rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        peers.add(alive_tx);
        peers.add(dead_tx);
        drop(dead_rx);

        peers.broadcast("frame");
        assert_eq!(alive_rx.try_recv().unwrap(), "frame");
        assert_eq!(peers.len(), 2);
    }

    #[test]
    fn remove_shrinks_set() {
        let peers = PeerSet::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = peers.add(tx);
        assert!(!peers.is_empty());
        peers.remove(id);
        assert!(peers.is_empty());
    }
}
