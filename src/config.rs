use clap::Parser;

/// Process configuration, sourced from CLI flags or environment variables
/// (`clap`'s `env` feature). Every field has a sensible default so the
/// server runs with no configuration at all in development.
#[derive(Debug, Clone, Parser)]
#[command(name = "acquire-server", about = "Multiplayer Acquire lobby, game, and voice server")]
pub struct Config {
    /// TCP port the HTTP/WebSocket server binds.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Maximum number of lobbies (waiting or in-progress) held at once.
    #[arg(long, env = "MAX_LOBBIES", default_value_t = 200)]
    pub max_lobbies: usize,

    /// Maximum number of games running concurrently.
    #[arg(long, env = "MAX_ACTIVE_GAMES", default_value_t = 100)]
    pub max_active_games: usize,

    /// Minutes an unstarted lobby may sit idle before the reaper removes it.
    #[arg(long, env = "LOBBY_IDLE_TIMEOUT_MINUTES", default_value_t = 30)]
    pub lobby_idle_timeout_minutes: i64,

    /// Hours a started game may sit idle before the reaper removes it.
    #[arg(long, env = "GAME_IDLE_TIMEOUT_HOURS", default_value_t = 2)]
    pub game_idle_timeout_hours: i64,

    /// Minutes a finished game's record is kept around for clients to read
    /// final results before it's reaped.
    #[arg(long, env = "FINISHED_GAME_RETENTION_MINUTES", default_value_t = 5)]
    pub finished_game_retention_minutes: i64,

    /// Seconds between reaper sweeps.
    #[arg(long, env = "CLEANUP_INTERVAL_SECONDS", default_value_t = 60)]
    pub cleanup_interval_seconds: u64,

    /// Requests allowed per identity per second before the rate limiter
    /// starts responding 429.
    #[arg(long, env = "RATE_LIMIT_PER_SECOND", default_value_t = 20)]
    pub rate_limit_per_second: u32,
}

impl Config {
    pub fn lobby_idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lobby_idle_timeout_minutes)
    }

    pub fn game_idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::hours(self.game_idle_timeout_hours)
    }

    pub fn finished_game_retention(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.finished_game_retention_minutes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_parse_with_no_arguments() {
        let config = Config::parse_from(["acquire-server"]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_lobbies, 200);
        assert_eq!(config.rate_limit_per_second, 20);
    }
}
