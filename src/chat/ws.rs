//! The websocket gateway: authenticates the upgrade, owns the connection's
//! lifecycle, and feeds inbound events to the relay one at a time.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::presence::Peer;
use crate::session::USERNAME;
use crate::AppResult;

use super::event::{ClientEvent, ServerEvent};
use super::relay::Relay;

#[axum::debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(relay): State<Relay>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    // No identity, no relay: unauthenticated sockets are refused before any
    // event can reach the router.
    let Some(username) = session.get::<String>(USERNAME).await? else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(relay, username, socket)))
}

async fn handle_socket(relay: Relay, username: String, socket: WebSocket) {
    let connection_id = Uuid::now_v7();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let (mut sink, mut stream) = socket.split();

    // Writer task: drains the connection's channel onto the socket. Transport
    // failures are not reported per send; the socket closing ends the read
    // loop below, which is where cleanup happens.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::from(text)).await.is_err() {
                break;
            }
        }
    });

    let peer = Peer::new(connection_id, tx);
    relay.on_connect(&username, peer.clone());
    debug!(%username, %connection_id, "websocket open");

    // One event processed to completion before the next is read. This is the
    // per-connection ordering guarantee: persist-then-deliver finishes before
    // another send from this connection starts.
    while let Some(Ok(frame)) = stream.next().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let event = match serde_json::from_str::<ClientEvent>(text.as_str()) {
            Ok(event) => event,
            Err(err) => {
                debug!(%username, %err, "ignoring malformed event");
                continue;
            }
        };

        // Receiver names are normalized here, before the relay sees them,
        // to match the lowercased identities the registry is keyed by.
        match event {
            ClientEvent::PrivateMessage { receiver, body } => {
                if let Err(err) = relay
                    .on_private_message(&username, &peer, &receiver.to_lowercase(), body)
                    .await
                {
                    // Sender only; the receiver never learns a message failed.
                    warn!(%username, %err, "private message not persisted");
                    peer.send(ServerEvent::Error {
                        message: "message could not be saved".to_owned(),
                    });
                }
            }
            ClientEvent::Typing { receiver, stop } => {
                relay.on_typing(&username, &receiver.to_lowercase(), stop);
            }
        }
    }

    relay.on_disconnect(connection_id);
    writer.abort();
    debug!(%username, %connection_id, "websocket closed");
}
