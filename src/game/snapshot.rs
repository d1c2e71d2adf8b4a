//! Read-only snapshots of the match for the wire and presentation layers

use super::r#match::{Game, MatchState, TriggerDirection};
use super::roster::{Player, PlayerId, Side};

/// One roster entry as clients see it
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub active: bool,
    pub advantage_direction: Option<Side>,
    pub penalty: f32,
    pub advantage: bool,
    pub name: String,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            active: p.active,
            advantage_direction: p.advantage_direction,
            penalty: p.penalty,
            advantage: p.advantage,
            name: p.name.clone(),
        }
    }
}

/// Full authoritative state; clients replace theirs wholesale with each one
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// Viewer's own entry first when the viewer is known
    pub players: Vec<PlayerView>,
    pub active_player_count: u32,
    pub progress: f32,
    pub trigger_direction: TriggerDirection,
    pub match_state: MatchState,
}

impl StateSnapshot {
    /// Entry for the local player, which the server always sends first
    pub fn me(&self) -> Option<&PlayerView> {
        self.players.first()
    }
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            active_player_count: 0,
            progress: 0.0,
            trigger_direction: TriggerDirection::Left,
            match_state: MatchState::Standby,
        }
    }
}

impl Game {
    /// Build a snapshot, moving `viewer` to the front of the roster
    pub fn snapshot(&self, viewer: Option<PlayerId>) -> StateSnapshot {
        let mut players = Vec::with_capacity(self.players().len());
        if let Some(me) = viewer.and_then(|id| self.player(id)) {
            players.push(PlayerView::from(me));
        }
        players.extend(
            self.players()
                .iter()
                .filter(|p| Some(p.id) != viewer)
                .map(PlayerView::from),
        );

        StateSnapshot {
            players,
            active_player_count: self.active_player_count() as u32,
            progress: self.progress(),
            trigger_direction: self.trigger_direction(),
            match_state: self.match_state(),
        }
    }
}
