//! WebSocket endpoint for participant channels
//!
//! Each connection is one persistent bidirectional channel: inbound frames
//! are decoded into [`ClientEvent`]s and routed to the session registry;
//! outbound [`ServerEvent`]s arrive through the channel's broadcaster
//! subscription and are written back as JSON text frames.
//!
//! A channel adopts an identity with its `join-room` event. `ready` infers
//! its session and side from that identity, and losing the connection starts
//! the short disconnect grace window for the identified participant.

use crate::protocol::messages::{ClientEvent, ServerEvent};
use crate::service::app::AppState;
use crate::types::{ParticipantId, SessionId, Side};
use crate::utils::generate_connection_id;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Identity a channel adopted with its last join
struct ChannelIdentity {
    session_id: SessionId,
    participant_id: ParticipantId,
    side: Side,
}

/// Upgrade an HTTP request into a draft channel
pub async fn ws_handler(
    State(app): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: Arc<AppState>) {
    let connection_id = generate_connection_id();
    debug!("Channel {} connected", connection_id);

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer half: forward broadcast events to the socket as JSON text
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut identity: Option<ChannelIdentity> = None;

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => event,
            Err(e) => {
                // Undecodable frames are stale or adversarial client state
                debug!("Channel {} sent undecodable frame: {}", connection_id, e);
                continue;
            }
        };

        match event {
            ClientEvent::JoinRoom(request) => {
                // A reconnect may target a different session; move the
                // subscription before the registry sees the join so the
                // status broadcast reaches this channel.
                if let Some(previous) = identity.take() {
                    app.broadcaster()
                        .unsubscribe(&previous.session_id, &previous.participant_id);
                }
                app.broadcaster().subscribe(
                    &request.session_id,
                    &request.participant_id,
                    tx.clone(),
                );
                identity = Some(ChannelIdentity {
                    session_id: request.session_id.clone(),
                    participant_id: request.participant_id.clone(),
                    side: request.side,
                });

                if let Err(e) = app.registry().join(request).await {
                    warn!("Join failed on channel {}: {}", connection_id, e);
                }
            }
            ClientEvent::Ready => {
                let Some(current) = identity.as_ref() else {
                    debug!("Channel {} sent ready before joining", connection_id);
                    continue;
                };
                if let Err(e) = app.registry().ready(&current.session_id, current.side).await {
                    warn!("Ready failed on channel {}: {}", connection_id, e);
                }
            }
            ClientEvent::SelectChampion(request) => {
                if let Err(e) = app.registry().select_champion(request).await {
                    warn!("Selection failed on channel {}: {}", connection_id, e);
                }
            }
            ClientEvent::MatchResult(request) => {
                if let Err(e) = app.registry().match_result(request).await {
                    warn!("Match result failed on channel {}: {}", connection_id, e);
                }
            }
            ClientEvent::SideChosen(request) => {
                if let Err(e) = app.registry().side_chosen(request).await {
                    warn!("Side choice failed on channel {}: {}", connection_id, e);
                }
            }
            ClientEvent::UserLeave(request) => {
                app.registry().user_leave(request).await;
            }
        }
    }

    // Implicit channel loss: keep the session alive for the short grace
    // window in case the same participant reconnects.
    if let Some(current) = identity {
        debug!(
            "Channel {} lost for participant '{}' in session {}",
            connection_id, current.participant_id, current.session_id
        );
        app.broadcaster()
            .unsubscribe(&current.session_id, &current.participant_id);
        app.registry()
            .connection_lost(&current.session_id, &current.participant_id)
            .await;
    } else {
        debug!("Channel {} closed before joining", connection_id);
    }

    writer.abort();
}
