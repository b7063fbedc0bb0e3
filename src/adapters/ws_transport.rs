//! WebSocket transport over tokio-tungstenite.
//!
//! Each `open` spawns one reader task that connects, forwards text frames
//! and reports the first failure. Closing the handle aborts the task, which
//! drops the socket.

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::domain::error::LivefeedError;
use crate::ports::transport_port::{SocketEvent, SocketEvents, SocketHandle, TransportPort};

pub struct WsTransport {
    runtime: Handle,
}

impl WsTransport {
    pub fn new() -> Result<Self, LivefeedError> {
        let runtime = Handle::try_current().map_err(|e| LivefeedError::Runtime {
            reason: e.to_string(),
        })?;
        Ok(Self { runtime })
    }
}

impl TransportPort for WsTransport {
    fn open(&self, url: &str, events: SocketEvents) -> Box<dyn SocketHandle> {
        let task = self.runtime.spawn(read_socket(url.to_string(), events));
        Box::new(WsSocket { task: Some(task) })
    }
}

struct WsSocket {
    task: Option<JoinHandle<()>>,
}

impl SocketHandle for WsSocket {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WsSocket {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_socket(url: String, events: SocketEvents) {
    debug!("connecting to {url}");
    let mut stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            let _ = events.send(SocketEvent::Error(e.to_string()));
            return;
        }
    };
    info!("connected to {url}");
    if events.send(SocketEvent::Opened).is_err() {
        return;
    }

    while let Some(frame) = stream.next().await {
        let event = match frame {
            Ok(Message::Text(text)) => SocketEvent::Message(text.to_string()),
            Ok(Message::Close(_)) => {
                let _ = events.send(SocketEvent::Closed);
                return;
            }
            // Pings are answered by tungstenite itself.
            Ok(_) => continue,
            Err(e) => {
                let _ = events.send(SocketEvent::Error(e.to_string()));
                return;
            }
        };
        if events.send(event).is_err() {
            return;
        }
    }
    let _ = events.send(SocketEvent::Closed);
}
