pub mod lobby;
pub mod manager;

pub use lobby::{Lobby, LobbyError, LobbySettings};
pub use manager::{LobbyManager, LobbyRecord, ManagerError, ReapRules};
