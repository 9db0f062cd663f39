//! WebSocket transport for ARP clients.
//!
//! One JSON message per text frame, UTF-8. The connection splits into a
//! send half (shared behind a lock by callers) and a receive half (owned by
//! the client's single background receive task).

use crate::error::{Result, TransportError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The write half of a client connection.
#[derive(Debug)]
pub struct WsSender {
    sink: SplitSink<WsStream, Message>,
}

impl WsSender {
    /// Send one text frame.
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::text(text))
            .await
            .map_err(TransportError::from)?;
        Ok(())
    }

    /// Close the connection.
    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await.map_err(TransportError::from)?;
        Ok(())
    }
}

/// The read half of a client connection.
#[derive(Debug)]
pub struct WsReceiver {
    stream: SplitStream<WsStream>,
}

impl WsReceiver {
    /// Receive the next text frame.
    ///
    /// Control frames are skipped; `None` means the connection is closed.
    pub async fn next_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(err) => return Some(Err(TransportError::from(err).into())),
            }
        }
    }
}

/// Connect to an ARP server at a `ws://host:port` URL.
///
/// # Examples
///
/// ```rust,no_run
/// use arp_sdk::shared::ws;
///
/// # async fn example() -> arp_sdk::Result<()> {
/// let (sender, receiver) = ws::connect("ws://localhost:8765").await?;
/// # let _ = (sender, receiver);
/// # Ok(())
/// # }
/// ```
pub async fn connect(url: &str) -> Result<(WsSender, WsReceiver)> {
    let (stream, _response) = connect_async(url).await.map_err(TransportError::from)?;
    tracing::debug!(url, "websocket connected");
    let (sink, stream) = stream.split();
    Ok((WsSender { sink }, WsReceiver { stream }))
}
