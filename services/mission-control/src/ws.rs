//! WebSocket event feed
//!
//! Each connection becomes one broadcaster subscriber. Inbound text and ping
//! frames are only keep-alives; a close frame, a read error, or a failed send
//! ends the subscription.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use skydrop_broadcast::Broadcaster;

use crate::state::AppState;

pub async fn feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let broadcaster = Arc::clone(state.broadcaster());
    ws.on_upgrade(move |socket| serve_subscriber(socket, broadcaster))
}

async fn serve_subscriber(socket: WebSocket, broadcaster: Arc<Broadcaster>) {
    let (subscriber_id, mut events) = broadcaster.subscribe_channel();
    let (mut sink, mut inbound) = socket.split();
    info!(subscriber_id, "feed subscriber connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        debug!(subscriber_id, "send failed");
                        break;
                    }
                }
                // Dropped by the broadcaster after a failed delivery
                None => break,
            },
            frame = inbound.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(subscriber_id, "read failed: {}", e);
                    break;
                }
            },
        }
    }

    broadcaster.unsubscribe(subscriber_id);
    info!(subscriber_id, "feed subscriber disconnected");
}
