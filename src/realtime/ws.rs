use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::http::state::AppState;
use crate::realtime::voice::VoiceMessage;

/// Upgrades to the `/lobby/{id}/ws` and `/game/{id}/ws` socket, which both
/// just stream [`super::hub::ServerEvent`]s — content-free "something
/// changed, re-fetch" ticks. The client polls the matching HTTP snapshot for
/// anything it needs to act on; this socket carries no game or chat payload.
pub async fn lobby_socket(
    State(state): State<Arc<AppState>>,
    Path(lobby_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| fan_out_socket(socket, state, lobby_id))
}

async fn fan_out_socket(socket: WebSocket, state: Arc<AppState>, lobby_id: Uuid) {
    let mut rx = state.hub.subscribe(lobby_id);
    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else { continue };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // The client never sends anything meaningful on this socket besides
    // keepalive pings, which axum answers automatically; just drain it so
    // the connection is detected as closed promptly.
    let mut recv_task = tokio::spawn(async move { while stream.next().await.is_some() {} });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!(%lobby_id, "fan-out socket closed");
}

/// Upgrades to the `/voice/{id}/ws?username=...` socket: a bidirectional
/// signaling channel, one per participant, relayed through
/// [`super::voice::VoiceHub`].
pub async fn voice_socket(
    State(state): State<Arc<AppState>>,
    Path(lobby_id): Path<Uuid>,
    axum::extract::Query(params): axum::extract::Query<VoiceParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| voice_session(socket, state, lobby_id, params.username))
}

#[derive(serde::Deserialize)]
pub struct VoiceParams {
    pub username: String,
}

async fn voice_session(socket: WebSocket, state: Arc<AppState>, lobby_id: Uuid, username: String) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<VoiceMessage>();

    let existing = state.voice.join(lobby_id, username.clone(), tx);
    for peer in existing {
        let msg = VoiceMessage::UserJoined { username: peer };
        if let Ok(text) = serde_json::to_string(&msg) {
            let _ = sink.send(Message::Text(text.into())).await;
        }
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&message) else { continue };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let voice = &state.voice;
    while let Some(Ok(Message::Text(text))) = stream.next().await {
        match serde_json::from_str::<VoiceMessage>(&text) {
            Ok(message) => {
                if let Err(error) = voice.relay(lobby_id, message) {
                    warn!(%error, "dropped voice signaling message");
                }
            }
            Err(error) => warn!(%error, "malformed voice signaling message"),
        }
    }

    send_task.abort();
    state.voice.leave(lobby_id, &username);
    info!(%lobby_id, %username, "voice session ended");
}
