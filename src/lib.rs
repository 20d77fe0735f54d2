pub mod config;
pub mod error;
pub mod game;
pub mod http;
pub mod lobby;
pub mod realtime;
