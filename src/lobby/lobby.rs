use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum and maximum seats a lobby will accept, fixed at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LobbySettings {
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self { min_players: 2, max_players: 6 }
    }
}

/// A lobby waiting to become a game. Players join in the order they arrive;
/// that order becomes turn order once the game starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lobby {
    pub id: Uuid,
    pub name: String,
    pub settings: LobbySettings,
    pub players: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Lobby {
    pub fn new(name: String, settings: LobbySettings, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            settings,
            players: Vec::new(),
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn join(&mut self, username: String, now: DateTime<Utc>) -> Result<(), LobbyError> {
        if self.players.iter().any(|p| p == &username) {
            return Err(LobbyError::AlreadyJoined);
        }
        if self.players.len() >= self.settings.max_players {
            return Err(LobbyError::Full);
        }
        self.players.push(username);
        self.last_activity_at = now;
        Ok(())
    }

    /// Removes a player. Returns `true` if they were present.
    pub fn leave(&mut self, username: &str, now: DateTime<Utc>) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p != username);
        let left = self.players.len() != before;
        if left {
            self.last_activity_at = now;
        }
        left
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.settings.max_players
    }

    /// The player who started the lobby: the first joiner. Does not rotate
    /// as players come and go, and is `None` only for a lobby nobody has
    /// joined yet.
    pub fn host(&self) -> Option<&str> {
        self.players.first().map(String::as_str)
    }

    pub fn can_start(&self) -> bool {
        self.players.len() >= self.settings.min_players
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    pub fn is_idle(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity_at > timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("already joined this lobby")]
    AlreadyJoined,
    #[error("lobby is full")]
    Full,
}

#[cfg(test)]
mod test {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn join_rejects_duplicates_and_respects_capacity() {
        let mut lobby = Lobby::new("table".into(), LobbySettings { min_players: 2, max_players: 2 }, now());
        lobby.join("alice".into(), now()).unwrap();
        assert_eq!(lobby.join("alice".into(), now()), Err(LobbyError::AlreadyJoined));
        lobby.join("bob".into(), now()).unwrap();
        assert_eq!(lobby.join("carol".into(), now()), Err(LobbyError::Full));
    }

    #[test]
    fn leave_reports_whether_the_player_was_present() {
        let mut lobby = Lobby::new("table".into(), LobbySettings::default(), now());
        lobby.join("alice".into(), now()).unwrap();
        assert!(lobby.leave("alice", now()));
        assert!(!lobby.leave("alice", now()));
    }

    #[test]
    fn idle_detection_uses_last_activity_not_creation() {
        let mut lobby = Lobby::new("table".into(), LobbySettings::default(), now());
        let later = now() + Duration::minutes(10);
        lobby.touch(later);
        assert!(!lobby.is_idle(Duration::minutes(15), later));
        assert!(lobby.is_idle(Duration::minutes(5), later + Duration::minutes(6)));
    }
}
