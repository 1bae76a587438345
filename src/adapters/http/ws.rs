use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use futures_util::{SinkExt, StreamExt};
use std::ops::ControlFlow;
use tracing::{debug, warn};

use crate::adapters::http::state::HttpState;
use crate::adapters::stream::{ConnectionId, StreamHub};
use crate::application::services::HazardService;
use crate::domain::stream::{InboundMessage, StreamMessage};

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<HttpState>) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

/// Map a raw WebSocket message to what the session acts on.
pub fn classify(msg: Message) -> InboundMessage {
    match msg {
        Message::Binary(bytes) => InboundMessage::Frame(bytes),
        Message::Text(text) => InboundMessage::from_text(&text),
        Message::Close(_) => InboundMessage::Close,
        Message::Ping(_) | Message::Pong(_) => InboundMessage::Ignored,
    }
}

fn outbound(msg: StreamMessage) -> Message {
    match msg {
        StreamMessage::Frame(jpeg) => Message::Binary(jpeg),
        StreamMessage::Hazard(json) => Message::Text(json),
        StreamMessage::EndOfStream => Message::Close(None),
    }
}

/// Act on one inbound message: frames and hazard reports go to the other
/// consumers, reports are also logged. `Break` ends the session.
pub fn dispatch(hub: &StreamHub, hazards: &HazardService, id: ConnectionId, msg: InboundMessage) -> ControlFlow<()> {
    match msg {
        InboundMessage::Close => return ControlFlow::Break(()),
        InboundMessage::Ignored => {}
        InboundMessage::Frame(jpeg) => hub.relay(id, StreamMessage::Frame(jpeg)),
        InboundMessage::Hazard(report) => {
            match StreamMessage::report(&report) {
                Ok(msg) => hub.relay(id, msg),
                Err(e) => warn!("WS consumer #{}: cannot relay hazard: {}", id, e),
            }
            hazards.accept_report(report);
        }
    }
    ControlFlow::Continue(())
}

/// One consumer session: a send loop fed by the hub and a receive loop for
/// whatever the consumer sends. Either loop ending ends the session; the
/// subscription drop removes the consumer from the hub.
async fn handle_socket(socket: WebSocket, st: HttpState) {
    let mut sub = st.hub.connect();
    let id = sub.id();
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = sub.next().await {
            let end = matches!(msg, StreamMessage::EndOfStream);
            if sender.send(outbound(msg)).await.is_err() || end {
                break;
            }
        }
    });

    let hub = st.hub.clone();
    let hazards = st.hazards.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(next) = receiver.next().await {
            let msg = match next {
                Ok(msg) => msg,
                Err(e) => {
                    debug!("WS consumer #{} receive error: {}", id, e);
                    break;
                }
            };
            if dispatch(&hub, &hazards, id, classify(msg)).is_break() {
                break;
            }
        }
    });

    // A panic in either loop surfaces here as a JoinError and is treated as a
    // disconnect like any other ending.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}
