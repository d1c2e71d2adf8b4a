//! HTTP route definitions

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::game::r#match::MatchState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connections: usize,
    active_players: usize,
    match_state: MatchState,
    progress: f32,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.session.stats();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        connections: stats.connections,
        active_players: stats.active_players,
        match_state: stats.match_state,
        progress: stats.progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn health_reports_session_counters() {
        let config = Config::from_lookup(|key| match key {
            "MATCH_SEED" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::new(config);
        let (_, _, _rx) = state.session.connect(None);

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.connections, 1);
        assert_eq!(health.active_players, 1);
        assert_eq!(health.match_state, MatchState::Standby);
    }
}
