pub mod identity;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::{AppState, SharedState};
