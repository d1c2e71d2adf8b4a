//! Match state machine: trigger prompts, advantage/counter pulls, false starts

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use super::controls::ButtonKind;
use super::roster::{Player, PlayerId, Roster, Side, MAX_ACTIVE_PLAYERS};
use super::tuning::MatchTuning;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    /// Fewer than two participants
    Standby,
    /// Two participants, waiting for the prompt
    Neutral,
    /// Prompt is showing
    Trigger,
    /// Someone won the reaction and is pulling
    Advantage,
    /// The other participant countered and is pulling back
    Counter,
    /// Reserved for the tug clock; nothing enters or leaves it
    TugClockViolation,
    /// Someone crossed the bound; waits for a restart
    End,
}

impl MatchState {
    pub fn ordinal(self) -> u32 {
        match self {
            MatchState::Standby => 0,
            MatchState::Neutral => 1,
            MatchState::Trigger => 2,
            MatchState::Advantage => 3,
            MatchState::Counter => 4,
            MatchState::TugClockViolation => 5,
            MatchState::End => 6,
        }
    }

    pub fn from_ordinal(value: u32) -> Option<Self> {
        Some(match value {
            0 => MatchState::Standby,
            1 => MatchState::Neutral,
            2 => MatchState::Trigger,
            3 => MatchState::Advantage,
            4 => MatchState::Counter,
            5 => MatchState::TugClockViolation,
            6 => MatchState::End,
            _ => return None,
        })
    }
}

/// Direction the prompt asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDirection {
    Left,
    Right,
    Up,
    Down,
}

impl TriggerDirection {
    pub const ALL: [TriggerDirection; 4] = [
        TriggerDirection::Left,
        TriggerDirection::Right,
        TriggerDirection::Up,
        TriggerDirection::Down,
    ];

    pub fn button(self) -> ButtonKind {
        match self {
            TriggerDirection::Left => ButtonKind::Left,
            TriggerDirection::Right => ButtonKind::Right,
            TriggerDirection::Up => ButtonKind::Up,
            TriggerDirection::Down => ButtonKind::Down,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            TriggerDirection::Left => TriggerDirection::Right,
            TriggerDirection::Right => TriggerDirection::Left,
            TriggerDirection::Up => TriggerDirection::Down,
            TriggerDirection::Down => TriggerDirection::Up,
        }
    }

    pub fn ordinal(self) -> u32 {
        match self {
            TriggerDirection::Left => 0,
            TriggerDirection::Right => 1,
            TriggerDirection::Up => 2,
            TriggerDirection::Down => 3,
        }
    }

    pub fn from_ordinal(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

/// The authoritative match: roster plus every per-round scalar
pub struct Game {
    roster: Roster,
    match_state: MatchState,
    /// Signed rope position; |progress| past the win bound ends the match
    progress: f32,
    trigger_direction: TriggerDirection,
    trigger_delay: f32,
    /// Rope position when the current prompt appeared
    last_position: f32,
    /// Extra roll-back granted to a counter; always opposite `tug_direction`
    counter_bonus: f32,
    tug_direction: Option<Side>,
    winner: Option<Side>,
    tuning: MatchTuning,
    rng: ChaCha8Rng,
}

impl Game {
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, MatchTuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: MatchTuning) -> Self {
        Self {
            roster: Roster::new(),
            match_state: MatchState::Standby,
            progress: 0.0,
            trigger_direction: TriggerDirection::Left,
            trigger_delay: tuning.initial_trigger_delay,
            last_position: 0.0,
            counter_bonus: 0.0,
            tug_direction: None,
            winner: None,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn match_state(&self) -> MatchState {
        self.match_state
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn trigger_direction(&self) -> TriggerDirection {
        self.trigger_direction
    }

    pub fn trigger_delay(&self) -> f32 {
        self.trigger_delay
    }

    pub fn last_position(&self) -> f32 {
        self.last_position
    }

    pub fn counter_bonus(&self) -> f32 {
        self.counter_bonus
    }

    pub fn tug_direction(&self) -> Option<Side> {
        self.tug_direction
    }

    /// Side that crossed the bound, once the match has ended
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn players(&self) -> &[Player] {
        self.roster.players()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.roster.get(id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.roster.get_mut(id)
    }

    pub fn active_player_count(&self) -> usize {
        self.roster.active_player_count()
    }

    pub fn spawn_player(&mut self, name: Option<String>) -> PlayerId {
        self.roster.spawn(name, &mut self.rng)
    }

    /// # Panics
    ///
    /// Panics if `id` is not in the roster.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<PlayerId> {
        self.roster.remove(id)
    }

    /// Advance the match by `elapsed` seconds, consuming and clearing every
    /// player's pending button edges.
    pub fn update(&mut self, elapsed: f32) {
        let previous = self.match_state;
        let state = self.match_state;
        let trigger = self.trigger_direction;
        let false_start = self.draw_false_start_penalty();
        let wrong_direction = false_start * self.tuning.wrong_direction_factor;

        let mut next_state = state;
        let mut correct_hits = 0usize;

        for player in self.roster.players_mut() {
            if player.active {
                player.inputs.clear();
                for kind in ButtonKind::DIRECTIONS {
                    if player.controls.button(kind).downs > 0 {
                        player.inputs.push(kind);
                    }
                }
                let start_requested = player.controls.start.downs > 0;

                match state {
                    MatchState::Neutral => {
                        if !player.inputs.is_empty() && !player.is_penalized() {
                            apply_penalty(player, false_start, "false start");
                        }
                    }
                    MatchState::Trigger => {
                        if !player.inputs.is_empty() && !player.is_penalized() {
                            if player.inputs.len() == 1 && player.inputs[0] == trigger.button() {
                                player.advantage = true;
                                correct_hits += 1;
                            } else {
                                apply_penalty(player, false_start, "wrong reaction");
                            }
                        }
                    }
                    MatchState::Advantage => {
                        if player.advantage {
                            if player.inputs.contains(&trigger.button()) {
                                next_state = MatchState::Neutral;
                            }
                        } else if player.inputs.contains(&trigger.opposite().button()) {
                            if next_state != MatchState::Neutral {
                                next_state = MatchState::Counter;
                            }
                        } else if player.inputs.iter().any(|k| *k != trigger.button()) {
                            apply_penalty(player, wrong_direction, "stray pull");
                        }
                    }
                    MatchState::End => {
                        if start_requested {
                            next_state = MatchState::Standby;
                        }
                    }
                    MatchState::Standby | MatchState::Counter | MatchState::TugClockViolation => {}
                }
            }

            player.controls.clear_downs();
        }

        self.match_state = if self.roster.active_player_count() == MAX_ACTIVE_PLAYERS {
            next_state
        } else {
            MatchState::Standby
        };

        if previous == MatchState::Advantage && self.match_state == MatchState::Neutral {
            self.enter_neutral(false);
        }

        match self.match_state {
            MatchState::Standby => {
                if self.roster.active_player_count() == MAX_ACTIVE_PLAYERS {
                    self.winner = None;
                    self.enter_neutral(true);
                }
            }
            MatchState::Neutral => {
                self.clear_advantage();
                if self.trigger_delay <= 0.0 {
                    self.trigger_direction = self.draw_direction();
                    self.last_position = self.progress;
                    self.match_state = MatchState::Trigger;
                } else {
                    self.trigger_delay = (self.trigger_delay - elapsed).max(0.0);
                }
            }
            MatchState::Trigger => self.resolve_trigger(correct_hits),
            MatchState::Advantage => self.pull(elapsed),
            MatchState::Counter => self.counter_pull(elapsed),
            MatchState::TugClockViolation | MatchState::End => {}
        }

        for player in self.roster.players_mut() {
            if player.active && player.inputs.is_empty() {
                player.penalty = (player.penalty - elapsed).max(0.0);
            }
            player.inputs.clear();
        }

        if self.match_state != previous {
            info!(
                from = ?previous,
                to = ?self.match_state,
                progress = self.progress,
                "Match state changed"
            );
        }
    }

    fn resolve_trigger(&mut self, correct_hits: usize) {
        match correct_hits {
            0 => {}
            1 => {
                self.tug_direction = self
                    .roster
                    .active()
                    .find(|p| p.advantage && !p.is_penalized())
                    .and_then(|p| p.advantage_direction);
                for player in self.roster.players_mut() {
                    player.penalty /= 4.0;
                }
                self.match_state = MatchState::Advantage;
            }
            2 => {
                let previous = self.trigger_direction;
                let mut direction = self.draw_direction();
                while direction == previous {
                    direction = self.draw_direction();
                }
                self.trigger_direction = direction;
                self.clear_advantage();
                debug!(direction = ?direction, "Simultaneous hits, prompt redrawn");
            }
            n => panic!("{} correct hits in one tick with at most two participants", n),
        }
    }

    fn pull(&mut self, elapsed: f32) {
        let side = match self.tug_direction {
            Some(side) => side,
            None => panic!("advantage pull without a tug direction"),
        };

        let delta = side.sign() as f32 * self.tuning.tug_speed * elapsed;
        self.progress += delta;
        self.counter_bonus -= delta * self.tuning.counter_bonus_rate;
        self.check_counter_bonus(side);

        if self.progress.abs() > self.tuning.win_bound() {
            self.finish();
        }
    }

    fn counter_pull(&mut self, elapsed: f32) {
        if let Some(side) = self.tug_direction {
            self.check_counter_bonus(side);
        }

        let target = self.last_position + self.counter_bonus;
        let step = self.tuning.tug_speed * (1.0 + self.tuning.counter_bonus_rate) * elapsed;
        self.progress = if self.progress < target {
            (self.progress + step).min(target)
        } else {
            (self.progress - step).max(target)
        };

        if self.progress.abs() > self.tuning.win_bound() {
            self.finish();
        } else if self.progress == target {
            self.match_state = MatchState::Neutral;
            self.enter_neutral(false);
        }
    }

    fn finish(&mut self) {
        self.winner = Side::from_sign(self.progress.signum() as i32);
        self.match_state = MatchState::End;
        info!(winner = ?self.winner, progress = self.progress, "Match won");
    }

    /// Reset the per-round scalars and arm a fresh prompt delay
    fn enter_neutral(&mut self, recenter: bool) {
        self.clear_advantage();
        self.tug_direction = None;

        let floor = self.min_active_penalty().max(self.tuning.trigger_min_time);
        let ceiling = self.tuning.trigger_max_time;
        self.trigger_delay = self.rng.gen_range(floor.min(ceiling)..=ceiling);

        if recenter && self.progress.abs() > self.tuning.recenter_bound() {
            self.progress = 0.0;
        }
        self.match_state = MatchState::Neutral;
    }

    fn clear_advantage(&mut self) {
        for player in self.roster.players_mut() {
            player.advantage = false;
        }
        self.counter_bonus = 0.0;
    }

    fn check_counter_bonus(&self, side: Side) {
        assert!(
            self.counter_bonus * side.sign() as f32 <= 0.0,
            "counter bonus {} has the same sign as tug direction {:?}",
            self.counter_bonus,
            side
        );
    }

    fn draw_direction(&mut self) -> TriggerDirection {
        TriggerDirection::ALL[self.rng.gen_range(0..TriggerDirection::ALL.len())]
    }

    /// Penalty floor follows the least-penalized participant so a fresh
    /// penalty never undercuts an outstanding one.
    fn draw_false_start_penalty(&mut self) -> f32 {
        let floor = self.min_active_penalty().max(self.tuning.false_start_min);
        let ceiling = self.tuning.false_start_max;
        self.rng.gen_range(floor.min(ceiling)..=ceiling)
    }

    fn min_active_penalty(&self) -> f32 {
        self.roster
            .active()
            .map(|p| p.penalty)
            .reduce(f32::min)
            .unwrap_or(0.0)
    }
}

fn apply_penalty(player: &mut Player, amount: f32, reason: &'static str) {
    player.penalty = player.penalty.max(amount);
    debug!(player_id = %player.id, penalty = player.penalty, reason, "Penalty applied");
}
