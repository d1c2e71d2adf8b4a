//! Match simulation: the controls value model, the roster, the state machine
//! and the session that ticks it.

pub mod controls;
pub mod r#match;
pub mod roster;
pub mod session;
pub mod snapshot;
pub mod tuning;

pub use controls::{Button, ButtonKind, Controls};
pub use r#match::{Game, MatchState, TriggerDirection};
pub use roster::{Player, PlayerId, Roster, Side};
pub use session::{Session, SessionStats};
pub use snapshot::{PlayerView, StateSnapshot};
pub use tuning::MatchTuning;
