use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out events pushed to every subscriber of a lobby's `/lobby` or
/// `/game` WebSocket. Deliberately carries no payload: every variant is a
/// tick telling the client to re-fetch the corresponding HTTP snapshot
/// (`GET /lobbies/:id` or `GET /games/:id`), so there's no second source of
/// truth to keep in sync with the one the status endpoints already serve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    LobbyUpdated,
    GameStarted,
    GameStateChanged,
    GameFinished,
}

/// One broadcast channel per lobby, created lazily on first subscriber or
/// publisher. A lagging subscriber drops old events rather than blocking the
/// publisher (`tokio::sync::broadcast`'s standard behavior) — acceptable
/// here since every event is also recoverable from the lobby/game's current
/// snapshot over HTTP.
#[derive(Default)]
pub struct Hub {
    rooms: DashMap<Uuid, broadcast::Sender<ServerEvent>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, lobby_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.rooms
            .entry(lobby_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes an event; silently a no-op if nobody is subscribed, since
    /// `broadcast::Sender::send` only errors when there are zero receivers.
    pub fn publish(&self, lobby_id: Uuid, event: ServerEvent) {
        if let Some(sender) = self.rooms.get(&lobby_id) {
            let _ = sender.send(event);
        }
    }

    pub fn drop_room(&self, lobby_id: Uuid) {
        self.rooms.remove(&lobby_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = Hub::new();
        let lobby_id = Uuid::new_v4();
        let mut rx = hub.subscribe(lobby_id);
        hub.publish(lobby_id, ServerEvent::GameStarted);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ServerEvent::GameStarted));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let hub = Hub::new();
        hub.publish(Uuid::new_v4(), ServerEvent::GameFinished);
    }
}
