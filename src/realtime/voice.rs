use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// A signaling message passed between two peers in the same voice room, or a
/// membership notification broadcast to the whole room. Mirrors the standard
/// offer/answer/ICE-candidate vocabulary of WebRTC signaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VoiceMessage {
    Offer { from: String, to: String, sdp: String },
    Answer { from: String, to: String, sdp: String },
    IceCandidate { from: String, to: String, candidate: String },
    UserJoined { username: String },
    UserLeft { username: String },
}

type PeerSender = mpsc::UnboundedSender<VoiceMessage>;

#[derive(Default)]
struct VoiceRoom {
    peers: DashMap<String, PeerSender>,
}

/// Tracks voice-room membership per lobby and relays signaling messages
/// between named peers. Unlike [`super::hub::Hub`]'s broadcast fan-out,
/// offers/answers/candidates are addressed to one peer, so this hands each
/// peer its own channel instead of subscribing to a shared one.
#[derive(Default)]
pub struct VoiceHub {
    rooms: DashMap<Uuid, VoiceRoom>,
}

impl VoiceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `username`'s sender in the room and returns the usernames
    /// already present, so the caller can tell the new peer who to expect
    /// offers from. Existing peers are notified of the join.
    pub fn join(&self, lobby_id: Uuid, username: String, sender: PeerSender) -> Vec<String> {
        let room = self.rooms.entry(lobby_id).or_default();
        let existing: Vec<String> = room.peers.iter().map(|e| e.key().clone()).collect();
        for peer in room.peers.iter() {
            let _ = peer.value().send(VoiceMessage::UserJoined { username: username.clone() });
        }
        room.peers.insert(username, sender);
        existing
    }

    pub fn leave(&self, lobby_id: Uuid, username: &str) {
        if let Some(room) = self.rooms.get(&lobby_id) {
            room.peers.remove(username);
            for peer in room.peers.iter() {
                let _ = peer.value().send(VoiceMessage::UserLeft { username: username.to_string() });
            }
        }
    }

    /// Forwards a message to its addressed recipient. Offers/answers/ICE
    /// candidates all carry a `to` field; this reads it generically so the
    /// relay doesn't need a match arm per message kind.
    pub fn relay(&self, lobby_id: Uuid, message: VoiceMessage) -> Result<(), VoiceError> {
        let to = match &message {
            VoiceMessage::Offer { to, .. } | VoiceMessage::Answer { to, .. } | VoiceMessage::IceCandidate { to, .. } => to,
            VoiceMessage::UserJoined { .. } | VoiceMessage::UserLeft { .. } => return Err(VoiceError::NotRelayable),
        };

        let room = self.rooms.get(&lobby_id).ok_or(VoiceError::RoomNotFound)?;
        let peer = room.peers.get(to).ok_or(VoiceError::PeerNotFound)?;
        peer.send(message).map_err(|_| VoiceError::PeerGone)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    #[error("no voice room for that lobby")]
    RoomNotFound,
    #[error("no such peer in the room")]
    PeerNotFound,
    #[error("that message kind isn't addressed to a single peer")]
    NotRelayable,
    #[error("the peer's channel has closed")]
    PeerGone,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn join_reports_existing_peers_and_notifies_them() {
        let hub = VoiceHub::new();
        let lobby_id = Uuid::new_v4();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let existing = hub.join(lobby_id, "alice".into(), tx1);
        assert!(existing.is_empty());

        let existing = hub.join(lobby_id, "bob".into(), tx2);
        assert_eq!(existing, vec!["alice".to_string()]);
        match rx1.try_recv().unwrap() {
            VoiceMessage::UserJoined { username } => assert_eq!(username, "bob"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn relay_forwards_only_to_addressed_peer() {
        let hub = VoiceHub::new();
        let lobby_id = Uuid::new_v4();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.join(lobby_id, "alice".into(), tx1);
        hub.join(lobby_id, "bob".into(), tx2);

        hub.relay(lobby_id, VoiceMessage::Offer { from: "alice".into(), to: "bob".into(), sdp: "v=0".into() }).unwrap();
        let received = rx2.try_recv().unwrap();
        assert!(matches!(received, VoiceMessage::Offer { .. }));
    }

    #[test]
    fn relay_to_unknown_peer_errors() {
        let hub = VoiceHub::new();
        let lobby_id = Uuid::new_v4();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        hub.join(lobby_id, "alice".into(), tx1);

        let result = hub.relay(lobby_id, VoiceMessage::Offer { from: "alice".into(), to: "ghost".into(), sdp: "v=0".into() });
        assert_eq!(result, Err(VoiceError::PeerNotFound));
    }
}
