//! WebSocket transport backed by tokio-tungstenite.

use futures::{SinkExt, StreamExt};
use tokio::{
    runtime::Handle,
    sync::mpsc,
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};

use crate::{
    config::SessionConfig,
    driver::{SessionDriver, SessionHandle},
    error::TransportError,
    events::{ChannelEvents, SessionEvent},
    manager::ConnectionManager,
    transport::{CLOSE_ABNORMAL, Transport, TransportEvent, TransportFrame},
};

/// Close frame without a status code.
const CLOSE_NO_STATUS: u16 = 1005;

enum Outgoing {
    Text(String),
    Close { code: u16, reason: String },
}

/// One WebSocket at a time, each on its own task.
///
/// Socket events are reported on `frames`, tagged with the generation the
/// socket was opened with.
pub struct WsTransport {
    url: String,
    frames: mpsc::UnboundedSender<TransportFrame>,
    outgoing: Option<mpsc::UnboundedSender<Outgoing>>,
    task: Option<JoinHandle<()>>,
}

impl WsTransport {
    #[must_use]
    pub fn new(url: impl Into<String>, frames: mpsc::UnboundedSender<TransportFrame>) -> Self {
        Self {
            url: url.into(),
            frames,
            outgoing: None,
            task: None,
        }
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, generation: u64) -> Result<(), TransportError> {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        self.abort_task();

        let (tx, rx) = mpsc::unbounded_channel();
        self.outgoing = Some(tx);
        self.task = Some(runtime.spawn(socket_task(
            self.url.clone(),
            generation,
            rx,
            self.frames.clone(),
        )));
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outgoing
            .as_ref()
            .ok_or(TransportError::NotOpen)?
            .send(Outgoing::Text(text))
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn close(&mut self, code: u16, reason: &str) {
        let Some(outgoing) = self.outgoing.take() else {
            return;
        };
        let request = Outgoing::Close {
            code,
            reason: reason.to_string(),
        };
        if outgoing.send(request).is_err() {
            self.abort_task();
        } else {
            // Let the task finish the closing handshake on its own.
            self.task = None;
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.abort_task();
    }
}

async fn socket_task(
    url: String,
    generation: u64,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    frames: mpsc::UnboundedSender<TransportFrame>,
) {
    let emit = |event: TransportEvent| {
        if frames.send(TransportFrame { generation, event }).is_err() {
            tracing::trace!(generation, "Transport frame receiver dropped");
        }
    };

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::debug!(generation, %url, "WebSocket connect failed: {e}");
            emit(TransportEvent::Error(e.to_string()));
            return;
        }
    };
    tracing::debug!(generation, %url, "WebSocket connected");
    emit(TransportEvent::Opened);

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            command = outgoing.recv() => match command {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        emit(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
                Some(Outgoing::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        tracing::debug!(generation, "Close handshake failed: {e}");
                    }
                    return;
                }
                None => {
                    let _ = sink.close().await;
                    return;
                }
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => emit(TransportEvent::Message(text)),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => emit(TransportEvent::Message(text)),
                    Err(_) => tracing::debug!(generation, "Ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or_else(
                        || (CLOSE_NO_STATUS, String::new()),
                        |frame| (u16::from(frame.code), frame.reason.into_owned()),
                    );
                    emit(TransportEvent::closed(code, reason));
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(TransportEvent::Error(e.to_string()));
                    return;
                }
                None => {
                    emit(TransportEvent::closed(CLOSE_ABNORMAL, "Stream ended"));
                    return;
                }
            }
        }
    }
}

/// A manager wired to a WebSocket and a channel of events.
pub type WebSocketSession = ConnectionManager<WsTransport, ChannelEvents>;

/// Build a WebSocket-backed session for `config` and run it on the current
/// runtime.
///
/// The session starts in `initial`; call `connect()` on the handle.
///
/// # Panics
/// Panics if called outside a tokio runtime.
#[must_use]
pub fn spawn_session(
    config: SessionConfig,
) -> (
    SessionHandle,
    mpsc::UnboundedReceiver<SessionEvent>,
    JoinHandle<WebSocketSession>,
) {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let transport = WsTransport::new(config.url.clone(), frames_tx);
    let (events, events_rx) = ChannelEvents::new();
    let manager = ConnectionManager::new(config, transport, events);
    tracing::info!(client_id = %manager.client_id(), url = %manager.config().url, "Spawning session");
    let (handle, task) = SessionDriver::spawn(manager, frames_rx);
    (handle, events_rx, task)
}
