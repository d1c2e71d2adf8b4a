//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::game::r#match::Game;
use crate::game::session::Session;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<Session>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Seed the match; log it so a run can be replayed
        let seed = config.match_seed.unwrap_or_else(rand::random);
        info!(seed, "Match seeded");

        let session = Arc::new(Session::new(Game::new(seed), config.outbox_capacity));

        Self { config, session }
    }
}
