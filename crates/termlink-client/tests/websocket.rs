//! End-to-end session against a local axum WebSocket server.

use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    extract::{
        WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use termlink_client::{ConnectionState, SessionConfig, SessionEvent, spawn_session};
use tokio::sync::mpsc;

async fn start_server<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(WebSocket) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade| {
            let handler = handler.clone();
            async move { ws.on_upgrade(handler) }
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Answers the sync request, then sends two chunks out of order.
async fn replay_server(socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    while let Some(Ok(message)) = receiver.next().await {
        let Message::Text(text) = message else { continue };
        let value: Value = serde_json::from_str(text.as_str()).unwrap();
        if value["type"] != "sync_request" {
            continue;
        }
        let replies = [
            json!({"type": "sync_response", "buffer_start_seq": 0, "buffer_end_seq": 0}),
            json!({"type": "terminal_chunk", "seq": 2, "data": "world"}),
            json!({"type": "terminal_chunk", "seq": 1, "data": "hello "}),
        ];
        for reply in replies {
            if sender.send(Message::Text(reply.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

/// Drops every connection without a close frame.
async fn hangup_server(socket: WebSocket) {
    drop(socket);
}

async fn next_matching<F>(
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    mut predicate: F,
) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("session events closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for session event")
}

#[tokio::test]
async fn test_ordered_output_over_websocket() {
    let addr = start_server(replay_server).await;
    let (handle, mut events, task) = spawn_session(SessionConfig::new(format!("ws://{addr}/ws")));
    handle.connect().unwrap();

    let first = next_matching(&mut events, |e| matches!(e, SessionEvent::TerminalData(_))).await;
    let second = next_matching(&mut events, |e| matches!(e, SessionEvent::TerminalData(_))).await;
    assert_eq!(first, SessionEvent::TerminalData("hello ".to_string()));
    assert_eq!(second, SessionEvent::TerminalData("world".to_string()));

    assert_eq!(handle.state().await.unwrap(), ConnectionState::Connected);
    let stream = handle.stream_state().await.unwrap();
    assert_eq!(stream.last_contiguous_seq, 2);
    assert_eq!(stream.pending_chunks, 0);

    handle.shutdown().unwrap();
    let manager = task.await.unwrap();
    assert_eq!(manager.state(), ConnectionState::Initial);
}

#[tokio::test]
async fn test_dropped_connection_backs_off() {
    let addr = start_server(hangup_server).await;
    let config = SessionConfig::new(format!("ws://{addr}/ws"))
        .with_backoff(60_000, 0, 60_000)
        .with_rng_seed(3);
    let (handle, mut events, _task) = spawn_session(config);
    handle.connect().unwrap();

    next_matching(&mut events, |e| {
        *e == SessionEvent::StateChanged(ConnectionState::Backoff)
    })
    .await;
    let info = handle.connection_info().await.unwrap();
    assert_eq!(info.reconnect_attempt, 1);
}

#[tokio::test]
async fn test_unreachable_server_backs_off() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = SessionConfig::new(format!("ws://{addr}/ws")).with_backoff(60_000, 0, 60_000);
    let (handle, mut events, _task) = spawn_session(config);
    handle.connect().unwrap();

    next_matching(&mut events, |e| {
        *e == SessionEvent::StateChanged(ConnectionState::Backoff)
    })
    .await;
    assert_eq!(handle.state().await.unwrap(), ConnectionState::Backoff);
}
