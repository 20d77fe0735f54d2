use std::sync::Arc;

use crate::config::Config;
use crate::lobby::LobbyManager;
use crate::realtime::hub::Hub;
use crate::realtime::voice::VoiceHub;

/// Shared process state handed to every axum handler via `State<AppState>`:
/// the single `Arc`-shared object the HTTP and WebSocket layers close over.
pub struct AppState {
    pub lobbies: LobbyManager,
    pub hub: Hub,
    pub voice: VoiceHub,
    pub config: Config,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            lobbies: LobbyManager::new(config.max_lobbies, config.max_active_games),
            hub: Hub::new(),
            voice: VoiceHub::new(),
            config,
        }
    }
}
