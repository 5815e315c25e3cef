//! Minigame state machines.
//!
//! Every game follows the same lifecycle (see [`session::Session`]):
//! `Idle --start (entry fee)--> Active --tick/input--> Finished --acknowledge--> Idle`.
//! The per-game modules only describe how their active state advances and how
//! a terminal state converts into a token reward.

pub mod archery;
pub mod crossword;
pub mod driver;
pub mod fruit_luck;
pub mod lucky_ducks;
pub mod mario_dash;
pub mod rng;
pub mod rules;
pub mod session;
pub mod snake;
pub mod uno;

pub use driver::{Driver, DriverHandle, DriveEnd};
pub use rng::GameRng;
pub use rules::GameRules;
pub use session::{Advance, Game, GameError, Session, SessionError, SessionState, Settlement, Step};
