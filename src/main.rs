use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use acquire_server::config::Config;
use acquire_server::http::{build_router, AppState};
use acquire_server::lobby::ReapRules;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let port = config.port;
    let reap_interval = std::time::Duration::from_secs(config.cleanup_interval_seconds);
    let reap_rules = ReapRules {
        lobby_idle_timeout: config.lobby_idle_timeout(),
        game_idle_timeout: config.game_idle_timeout(),
        finished_game_retention: config.finished_game_retention(),
    };

    let state = Arc::new(AppState::new(config));
    tokio::spawn(run_reaper(state.clone(), reap_interval, reap_rules));

    let router = build_router(state);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .expect("failed to bind listen address");
    info!(%port, "acquire-server listening");

    axum::serve(listener, router).await.expect("server error");
}

/// Periodically sweeps idle lobbies and retention-expired finished games.
/// Grounded in the pack's room-expiry sweep pattern, run on its own task
/// rather than per-request so reaping never blocks a handler.
async fn run_reaper(state: Arc<AppState>, interval: std::time::Duration, rules: ReapRules) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        state.lobbies.reap(Utc::now(), rules);
    }
}
