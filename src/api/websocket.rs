//! WebSocket endpoints for real-time ping streaming
//!
//! Each connection owns one bounded outbound queue. The queue is registered
//! with the subscriber registry (broadcast envelopes) and also receives
//! command replies, and a single writer task drains it into the socket. A
//! socket that stops draining fills the queue and is dropped by the next
//! broadcast.
//!
//! ```text
//! broadcast ──┐
//!             ├─► mpsc queue ─► writer task ─► socket
//! replies ────┘
//! socket ─► reader task ─► CommandHandler ─► replies
//! ```

use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tracing::{debug, error, info, warn};

use crate::api::state::ApiState;
use crate::api::types::ConnectionsResponse;
use crate::broadcast::{Frame, Topic, encode, subscriber_queue};
use crate::commands::{HostEntry, OutboundMessage};

/// WebSocket upgrade handler for the full ping stream
///
/// GET /api/ws/ping-status
pub async fn ping_status_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state, Topic::Full))
}

/// WebSocket upgrade handler for the DNS resolver stream
///
/// GET /api/ws/dns-status
pub async fn dns_status_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state, Topic::DnsOnly))
}

/// GET /api/ws/connections
pub async fn connections(State(state): State<ApiState>) -> Json<ConnectionsResponse> {
    let subscribers = state.subscribers();
    Json(ConnectionsResponse {
        active_connections: subscribers.count().await,
        full_subscribers: subscribers.count_on(Topic::Full).await,
        dns_subscribers: subscribers.count_on(Topic::DnsOnly).await,
        monitoring_active: state.monitor.is_running().await,
    })
}

/// Snapshot sent right after `connection_established`, if there is one
async fn initial_snapshot(state: &ApiState, topic: Topic) -> Option<OutboundMessage> {
    match topic {
        Topic::Full => {
            let results = state.monitor.latest_results().await;
            let timestamp = state.monitor.last_cycle().await;
            (!results.is_empty()).then_some(OutboundMessage::InitialData { results, timestamp })
        }
        Topic::DnsOnly => {
            let targets = state.monitor.targets().await;
            (!targets.is_empty()).then(|| OutboundMessage::HostsUpdate {
                results: targets.into_iter().map(|host| HostEntry { host }).collect(),
            })
        }
    }
}

fn encode_or_log(message: &OutboundMessage) -> Option<Frame> {
    encode(message)
        .inspect_err(|e| error!("dropping outbound message: {e:#}"))
        .ok()
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: ApiState, topic: Topic) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = subscriber_queue();

    let monitoring_active = state.monitor.is_running().await;
    let snapshot = initial_snapshot(&state, topic).await;
    let greeting = match topic {
        Topic::Full => "Connected to ping status updates",
        Topic::DnsOnly => "Connected to DNS status updates",
    };

    let id = state
        .subscribers()
        .connect_with(tx.clone(), topic, move |id| {
            let established = OutboundMessage::ConnectionEstablished {
                connection_id: id,
                message: greeting.to_string(),
                monitoring_active,
            };
            std::iter::once(established)
                .chain(snapshot)
                .filter_map(|message| encode_or_log(&message))
                .collect()
        })
        .await;

    info!("websocket connection {id} established on {topic}");

    // Writer: the only task touching the sink
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                debug!("websocket send failed, client disconnected");
                break;
            }
        }
    });

    // Reader: one reply per inbound message
    let commands = state.commands.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            let reply = match message {
                Ok(Message::Text(text)) => commands.handle(&text).await,
                Ok(Message::Binary(_)) => OutboundMessage::error("Invalid JSON format"),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("websocket receive failed: {e}");
                    break;
                }
            };

            let frame = match encode_or_log(&reply) {
                Some(frame) => frame,
                None => match encode_or_log(&OutboundMessage::error("Internal server error")) {
                    Some(frame) => frame,
                    None => continue,
                },
            };

            if tx.send(frame).await.is_err() {
                warn!("outbound queue closed while replying");
                break;
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    state.subscribers().disconnect(id).await;
    info!("websocket connection {id} closed");
}
