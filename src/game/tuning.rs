//! Match timing and arena constants

/// Tunable numbers for one match
#[derive(Debug, Clone, Copy)]
pub struct MatchTuning {
    /// Half-width of the arena along the rope
    pub arena_max_x: f32,
    /// Distance from rope centre to a player's hands (presentation)
    pub hand_offset_x: f32,
    /// Extra clearance past the hands (presentation)
    pub extra_hand_offset_x: f32,
    /// Distance inside the win bound past which a fresh round recentres the rope
    pub recenter_margin: f32,
    /// Trigger delay range (seconds)
    pub trigger_min_time: f32,
    pub trigger_max_time: f32,
    /// Trigger delay before the very first round
    pub initial_trigger_delay: f32,
    /// False-start penalty range (seconds)
    pub false_start_min: f32,
    pub false_start_max: f32,
    /// Fraction of the false-start penalty for a stray press during ADVANTAGE
    pub wrong_direction_factor: f32,
    /// Rope speed (units per second)
    pub tug_speed: f32,
    /// Share of pulled distance the counter-puller may roll back beyond the start
    pub counter_bonus_rate: f32,
}

impl MatchTuning {
    /// |progress| beyond this ends the match
    pub fn win_bound(&self) -> f32 {
        self.arena_max_x - self.hand_offset_x - self.extra_hand_offset_x
    }

    /// |progress| beyond this is recentred when a new round starts from STANDBY
    pub fn recenter_bound(&self) -> f32 {
        (self.win_bound() - self.recenter_margin).max(0.0)
    }
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            arena_max_x: 6.3,
            hand_offset_x: 1.5,
            extra_hand_offset_x: 1.0,
            recenter_margin: 1.5,
            trigger_min_time: 3.0,
            trigger_max_time: 8.0,
            initial_trigger_delay: 8.0,
            false_start_min: 6.0,
            false_start_max: 8.0,
            wrong_direction_factor: 0.25,
            tug_speed: 1.5,
            counter_bonus_rate: 0.2,
        }
    }
}
