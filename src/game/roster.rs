//! Player roster: spawning, removal and active-slot bookkeeping

use std::fmt;

use rand::Rng;
use tracing::info;

use super::controls::{ButtonKind, Controls};

/// Active participants per match
pub const MAX_ACTIVE_PLAYERS: usize = 2;

/// Stable player number, assigned at spawn and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which end of the rope a participant pulls toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn sign(self) -> i32 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }

    pub fn from_sign(sign: i32) -> Option<Self> {
        match sign {
            -1 => Some(Side::Left),
            1 => Some(Side::Right),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Player state (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Unit-length cosmetic colour
    pub color: [f32; 3],
    /// Spectators have this false
    pub active: bool,
    /// Side pulled toward; `None` for spectators that never played
    pub advantage_direction: Option<Side>,
    /// Seconds of false-start penalty left
    pub penalty: f32,
    pub advantage: bool,
    /// Buttons with edges this tick; filled and cleared inside one tick
    pub inputs: Vec<ButtonKind>,
    pub controls: Controls,
}

impl Player {
    fn new(id: PlayerId, name: String, color: [f32; 3]) -> Self {
        Self {
            id,
            name,
            color,
            active: false,
            advantage_direction: None,
            penalty: 0.0,
            advantage: false,
            inputs: Vec::new(),
            controls: Controls::default(),
        }
    }

    pub fn is_penalized(&self) -> bool {
        self.penalty > 0.0
    }
}

/// Ordered roster plus the per-match slot counters
#[derive(Debug, Clone)]
pub struct Roster {
    players: Vec<Player>,
    active_player_count: usize,
    side_taken: [bool; 2],
    next_player_number: u32,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            active_player_count: 0,
            side_taken: [false; 2],
            next_player_number: 1,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    pub fn active_player_count(&self) -> usize {
        self.active_player_count
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn active(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.active)
    }

    /// Append a player. The first two become active and claim a free side.
    pub fn spawn<R: Rng>(&mut self, name: Option<String>, rng: &mut R) -> PlayerId {
        let id = PlayerId(self.next_player_number);
        self.next_player_number += 1;

        let name = name.unwrap_or_else(|| format!("Player {}", id));
        let mut player = Player::new(id, name, random_color(rng));

        if self.active_player_count < MAX_ACTIVE_PLAYERS {
            let side = self.claim_side();
            player.active = true;
            player.advantage_direction = Some(side);
            self.active_player_count += 1;
            info!(
                player_id = %id,
                side = ?side,
                active_players = self.active_player_count,
                "Spawned player"
            );
        } else {
            info!(
                player_id = %id,
                active_players = self.active_player_count,
                "Spawned spectator"
            );
        }

        self.players.push(player);
        id
    }

    /// Remove a player. A spectator directly behind a departing participant
    /// takes over its side, penalty and advantage.
    ///
    /// Returns the promoted spectator, if any.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not in the roster.
    pub fn remove(&mut self, id: PlayerId) -> Option<PlayerId> {
        let index = match self.players.iter().position(|p| p.id == id) {
            Some(index) => index,
            None => panic!("remove of unregistered player {}", id),
        };

        let mut promoted = None;
        let departed = self.players.remove(index);

        if departed.active {
            self.active_player_count -= 1;

            match self.players.get_mut(index) {
                Some(next) if !next.active => {
                    next.active = true;
                    next.advantage = departed.advantage;
                    next.penalty = departed.penalty;
                    next.advantage_direction = departed.advantage_direction;
                    self.active_player_count += 1;
                    promoted = Some(next.id);
                    info!(
                        player_id = %next.id,
                        replaced = %departed.id,
                        "Spectator jumped in"
                    );
                }
                _ => {
                    if let Some(side) = departed.advantage_direction {
                        self.side_taken[side.slot()] = false;
                    }
                }
            }
        }

        info!(
            player_id = %departed.id,
            active_players = self.active_player_count,
            "Removed player"
        );

        debug_assert!(self.active_player_count <= MAX_ACTIVE_PLAYERS);
        promoted
    }

    fn claim_side(&mut self) -> Side {
        let side = if !self.side_taken[Side::Left.slot()] {
            Side::Left
        } else {
            Side::Right
        };
        self.side_taken[side.slot()] = true;
        side
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

/// Random unit vector with non-negative components
fn random_color<R: Rng>(rng: &mut R) -> [f32; 3] {
    loop {
        let c: [f32; 3] = [rng.gen(), rng.gen(), rng.gen()];
        if c != [0.0; 3] {
            let len = (c[0] * c[0] + c[1] * c[1] + c[2] * c[2]).sqrt();
            return [c[0] / len, c[1] / len, c[2] / len];
        }
    }
}
