use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::game::engine::Game;
use crate::game::tile::random_shuffle;

use super::lobby::{Lobby, LobbyError, LobbySettings};

/// A lobby plus whatever game it has produced. The game lives behind its
/// own `Mutex` rather than the lobby's lock, so a lobby roster read never
/// blocks on an in-progress game and vice versa.
pub struct LobbyRecord {
    pub lobby: Lobby,
    pub game: Mutex<Option<Game>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl LobbyRecord {
    fn new(lobby: Lobby) -> Self {
        Self { lobby, game: Mutex::new(None), started_at: None, finished_at: None }
    }
}

/// Registry of every lobby and game in the process, keyed by lobby id.
/// Backed by `dashmap` instead of a `Mutex<HashMap<_>>` so lobby lookups
/// don't serialize on unrelated lobbies.
pub struct LobbyManager {
    lobbies: DashMap<Uuid, LobbyRecord>,
    max_lobbies: usize,
    max_active_games: usize,
}

impl LobbyManager {
    pub fn new(max_lobbies: usize, max_active_games: usize) -> Self {
        Self { lobbies: DashMap::new(), max_lobbies, max_active_games }
    }

    /// Creates a lobby and joins `host` to it in the same step, so the
    /// lobby's host (`Lobby::host`, the first joiner) is always the caller
    /// who created it rather than whoever happens to win a race to join.
    pub fn create(&self, name: String, settings: LobbySettings, host: String, now: DateTime<Utc>) -> Result<Uuid, ManagerError> {
        if self.lobbies.len() >= self.max_lobbies {
            return Err(ManagerError::CapacityReached);
        }
        let mut lobby = Lobby::new(name, settings, now);
        lobby.join(host, now).map_err(ManagerError::Lobby)?;
        let id = lobby.id;
        self.lobbies.insert(id, LobbyRecord::new(lobby));
        Ok(id)
    }

    pub fn join(&self, id: Uuid, username: String, now: DateTime<Utc>) -> Result<(), ManagerError> {
        let mut record = self.lobbies.get_mut(&id).ok_or(ManagerError::NotFound)?;
        record.lobby.join(username, now).map_err(ManagerError::Lobby)
    }

    pub fn leave(&self, id: Uuid, username: &str, now: DateTime<Utc>) -> Result<bool, ManagerError> {
        let mut record = self.lobbies.get_mut(&id).ok_or(ManagerError::NotFound)?;
        Ok(record.lobby.leave(username, now))
    }

    /// Starts the game for a lobby that can. Only the host (the first
    /// player to join) may start it. Fails if the process is already at its
    /// concurrent-game cap, so one misbehaving lobby can't starve every
    /// other game of CPU/memory.
    pub fn start_game(&self, id: Uuid, requester: &str, now: DateTime<Utc>) -> Result<(), ManagerError> {
        let active_games = self
            .lobbies
            .iter()
            .filter(|entry| entry.started_at.is_some() && entry.finished_at.is_none())
            .count();
        if active_games >= self.max_active_games {
            return Err(ManagerError::CapacityReached);
        }

        let mut record = self.lobbies.get_mut(&id).ok_or(ManagerError::NotFound)?;
        if record.lobby.host() != Some(requester) {
            return Err(ManagerError::NotHost);
        }
        if !record.lobby.can_start() {
            return Err(ManagerError::NotEnoughPlayers);
        }
        if record.started_at.is_some() {
            return Err(ManagerError::AlreadyStarted);
        }

        let game = Game::new(record.lobby.players.clone(), random_shuffle);
        *record.game.lock().unwrap() = Some(game);
        record.started_at = Some(now);
        Ok(())
    }

    pub fn mark_finished(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), ManagerError> {
        let mut record = self.lobbies.get_mut(&id).ok_or(ManagerError::NotFound)?;
        record.finished_at = Some(now);
        Ok(())
    }

    /// Runs `f` with exclusive access to the lobby's game, if one exists.
    pub fn with_game<R>(&self, id: Uuid, f: impl FnOnce(&mut Game) -> R) -> Result<R, ManagerError> {
        let record = self.lobbies.get(&id).ok_or(ManagerError::NotFound)?;
        let mut guard = record.game.lock().unwrap();
        let game = guard.as_mut().ok_or(ManagerError::GameNotStarted)?;
        Ok(f(game))
    }

    pub fn lobby_snapshot(&self, id: Uuid) -> Result<Lobby, ManagerError> {
        self.lobbies.get(&id).map(|r| r.lobby.clone()).ok_or(ManagerError::NotFound)
    }

    /// Lobbies whose game hasn't started yet, sorted by creation time
    /// descending (newest first).
    pub fn list_open_lobbies(&self) -> Vec<Lobby> {
        let mut lobbies: Vec<Lobby> =
            self.lobbies.iter().filter(|entry| entry.started_at.is_none()).map(|entry| entry.lobby.clone()).collect();
        lobbies.sort_by_key(|lobby| std::cmp::Reverse(lobby.created_at));
        lobbies
    }

    /// Evicts lobbies that never started and have gone idle, and finished
    /// games past their retention window. Intended to be called on a timer
    /// from a background task (see `src/main.rs`); separate timeouts cover
    /// each lifecycle stage (idle lobby, idle game, retained finished game).
    pub fn reap(&self, now: DateTime<Utc>, rules: ReapRules) {
        let doomed: Vec<Uuid> = self
            .lobbies
            .iter()
            .filter(|entry| Self::is_reapable(entry.value(), now, rules))
            .map(|entry| *entry.key())
            .collect();

        for id in doomed {
            self.lobbies.remove(&id);
        }
    }

    fn is_reapable(record: &LobbyRecord, now: DateTime<Utc>, rules: ReapRules) -> bool {
        match (record.started_at, record.finished_at) {
            // An empty lobby is reaped unconditionally — a separate rule
            // from idle-timeout, so the lone player leaving doesn't leave
            // the lobby occupying a `MAX_LOBBIES` slot until it goes idle.
            (None, _) => record.lobby.players.is_empty() || record.lobby.is_idle(rules.lobby_idle_timeout, now),
            (Some(_), Some(finished_at)) => now - finished_at > rules.finished_game_retention,
            (Some(_), None) => now - record.lobby.last_activity_at > rules.game_idle_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReapRules {
    pub lobby_idle_timeout: Duration,
    pub game_idle_timeout: Duration,
    pub finished_game_retention: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    #[error("no lobby with that id")]
    NotFound,
    #[error(transparent)]
    Lobby(#[from] LobbyError),
    #[error("the process is already running its configured maximum")]
    CapacityReached,
    #[error("the lobby doesn't have enough players to start")]
    NotEnoughPlayers,
    #[error("the lobby's game has already started")]
    AlreadyStarted,
    #[error("the lobby's game hasn't started yet")]
    GameNotStarted,
    #[error("only the lobby's host may do that")]
    NotHost,
}

#[cfg(test)]
mod test {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn create_join_and_start_a_game() {
        let manager = LobbyManager::new(10, 10);
        let id = manager
            .create("table".into(), LobbySettings { min_players: 2, max_players: 4 }, "alice".into(), now())
            .unwrap();
        manager.join(id, "bob".into(), now()).unwrap();
        manager.start_game(id, "alice", now()).unwrap();
        assert_eq!(manager.start_game(id, "alice", now()), Err(ManagerError::AlreadyStarted));
    }

    #[test]
    fn create_joins_the_host_as_the_first_player() {
        let manager = LobbyManager::new(10, 10);
        let id = manager.create("table".into(), LobbySettings::default(), "alice".into(), now()).unwrap();
        let lobby = manager.lobby_snapshot(id).unwrap();
        assert_eq!(lobby.host(), Some("alice"));
        assert_eq!(lobby.players, vec!["alice".to_string()]);
    }

    #[test]
    fn only_the_host_may_start_the_game() {
        let manager = LobbyManager::new(10, 10);
        let id = manager
            .create("table".into(), LobbySettings { min_players: 2, max_players: 4 }, "alice".into(), now())
            .unwrap();
        manager.join(id, "bob".into(), now()).unwrap();
        assert_eq!(manager.start_game(id, "bob", now()), Err(ManagerError::NotHost));
        manager.start_game(id, "alice", now()).unwrap();
    }

    #[test]
    fn capacity_is_enforced_at_creation() {
        let manager = LobbyManager::new(1, 10);
        manager.create("a".into(), LobbySettings::default(), "alice".into(), now()).unwrap();
        assert_eq!(
            manager.create("b".into(), LobbySettings::default(), "bob".into(), now()),
            Err(ManagerError::CapacityReached)
        );
    }

    #[test]
    fn reap_clears_idle_unstarted_lobbies_but_keeps_active_games() {
        let manager = LobbyManager::new(10, 10);
        let idle_id = manager.create("idle".into(), LobbySettings::default(), "zeke".into(), now()).unwrap();
        let active_id = manager
            .create("active".into(), LobbySettings { min_players: 2, max_players: 4 }, "alice".into(), now())
            .unwrap();
        manager.join(active_id, "bob".into(), now()).unwrap();
        manager.start_game(active_id, "alice", now()).unwrap();

        let later = now() + Duration::hours(1);
        let rules = ReapRules {
            lobby_idle_timeout: Duration::minutes(30),
            game_idle_timeout: Duration::hours(2),
            finished_game_retention: Duration::minutes(5),
        };
        manager.reap(later, rules);

        assert!(manager.lobby_snapshot(idle_id).is_err());
        assert!(manager.lobby_snapshot(active_id).is_ok());
    }

    #[test]
    fn reap_clears_empty_lobbies_immediately_regardless_of_idle_timeout() {
        let manager = LobbyManager::new(10, 10);
        let id = manager.create("table".into(), LobbySettings::default(), "alice".into(), now()).unwrap();
        manager.leave(id, "alice", now()).unwrap();

        let rules = ReapRules {
            lobby_idle_timeout: Duration::minutes(30),
            game_idle_timeout: Duration::hours(2),
            finished_game_retention: Duration::minutes(5),
        };
        manager.reap(now(), rules);

        assert!(manager.lobby_snapshot(id).is_err());
    }

    #[test]
    fn list_open_lobbies_excludes_started_and_sorts_newest_first() {
        let manager = LobbyManager::new(10, 10);
        let first = manager.create("first".into(), LobbySettings::default(), "alice".into(), now()).unwrap();
        let later = now() + Duration::minutes(5);
        let second = manager.create("second".into(), LobbySettings::default(), "bob".into(), later).unwrap();
        let started = manager
            .create("started".into(), LobbySettings { min_players: 1, max_players: 4 }, "carol".into(), later)
            .unwrap();
        manager.start_game(started, "carol", later).unwrap();

        let open = manager.list_open_lobbies();
        let ids: Vec<Uuid> = open.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![second, first]);
    }
}
