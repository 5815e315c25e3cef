use std::{fmt::Debug, time::Duration};

use common::utils::GameType;
use thiserror::Error;
use tracing::{info, warn};
use wallet::{Clock, LedgerError, Storage, TokenLedger};

use crate::rng::GameRng;

/// Result of advancing an active game by one tick or one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<O> {
    Continue,
    Finished(O),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("invalid move: {0}")]
    InvalidMove(String),
    #[error("cell ({row}, {col}) is outside the grid")]
    OutOfBounds { row: usize, col: usize },
    #[error("not your turn")]
    NotYourTurn,
    #[error("invalid rules: {0}")]
    InvalidRules(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{game} costs {required} tokens, balance is {balance}")]
    InsufficientBalance {
        game: GameType,
        required: u64,
        balance: u64,
    },
    #[error("{0} is already running")]
    AlreadyActive(GameType),
    #[error("{0} is not running")]
    NotActive(GameType),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The rules of one minigame.
///
/// Implementations are pure: all randomness comes from the supplied
/// [`GameRng`] and all token movement is done by [`Session`].
pub trait Game {
    type Active: Clone + Debug;
    type Input: Debug;
    type Outcome: Clone + Debug;

    fn kind(&self) -> GameType;
    fn entry_fee(&self) -> u64;
    fn tick_period(&self) -> Duration;
    fn begin(&self, rng: &mut GameRng) -> Self::Active;
    fn tick(&self, active: &mut Self::Active, rng: &mut GameRng) -> Step<Self::Outcome>;
    fn apply(
        &self,
        active: &mut Self::Active,
        input: Self::Input,
        rng: &mut GameRng,
    ) -> Result<Step<Self::Outcome>, GameError>;
    fn reward(&self, outcome: &Self::Outcome) -> u64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settlement<O> {
    pub outcome: O,
    pub reward: u64,
}

#[derive(Debug, Clone)]
pub enum SessionState<A, O> {
    Idle,
    Active(A),
    Finished(Settlement<O>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Continued,
    Settled { reward: u64 },
}

pub struct Session<G: Game> {
    game: G,
    rng: GameRng,
    state: SessionState<G::Active, G::Outcome>,
}

impl<G: Game> Session<G> {
    pub fn new(game: G, rng: GameRng) -> Self {
        Self {
            game,
            rng,
            state: SessionState::Idle,
        }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn state(&self) -> &SessionState<G::Active, G::Outcome> {
        &self.state
    }

    pub fn active(&self) -> Option<&G::Active> {
        match &self.state {
            SessionState::Active(active) => Some(active),
            _ => None,
        }
    }

    pub fn settlement(&self) -> Option<&Settlement<G::Outcome>> {
        match &self.state {
            SessionState::Finished(settlement) => Some(settlement),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// Debits the entry fee and enters the active state. Allowed from idle and
    /// from an unacknowledged result.
    pub fn start<S: Storage, C: Clock>(
        &mut self,
        ledger: &mut TokenLedger<S, C>,
    ) -> Result<(), SessionError> {
        let game = self.game.kind();
        if self.is_active() {
            return Err(SessionError::AlreadyActive(game));
        }

        let required = self.game.entry_fee();
        if !ledger.spend(required)? {
            return Err(SessionError::InsufficientBalance {
                game,
                required,
                balance: ledger.balance(),
            });
        }

        self.state = SessionState::Active(self.game.begin(&mut self.rng));
        info!(%game, fee = required, balance = ledger.balance(), "Game started");
        Ok(())
    }

    pub fn tick<S: Storage, C: Clock>(
        &mut self,
        ledger: &mut TokenLedger<S, C>,
    ) -> Result<Advance, SessionError> {
        let SessionState::Active(active) = &mut self.state else {
            return Err(SessionError::NotActive(self.game.kind()));
        };
        let step = self.game.tick(active, &mut self.rng);
        self.resolve(step, ledger)
    }

    /// Applies a player action. A rejected action leaves the game untouched.
    pub fn input<S: Storage, C: Clock>(
        &mut self,
        input: G::Input,
        ledger: &mut TokenLedger<S, C>,
    ) -> Result<Advance, SessionError> {
        let SessionState::Active(active) = &mut self.state else {
            return Err(SessionError::NotActive(self.game.kind()));
        };
        let mut next = active.clone();
        let step = self.game.apply(&mut next, input, &mut self.rng)?;
        *active = next;
        self.resolve(step, ledger)
    }

    /// Dismisses the result view.
    pub fn acknowledge(&mut self) -> Option<Settlement<G::Outcome>> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Finished(settlement) => Some(settlement),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Abandons the current play. The entry fee is not refunded. Returns true
    /// if an active game was discarded.
    pub fn exit(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.state, SessionState::Idle);
        let discarded = matches!(previous, SessionState::Active(_));
        if discarded {
            warn!(game = %self.game.kind(), "Game abandoned, entry fee forfeited");
        }
        discarded
    }

    fn resolve<S: Storage, C: Clock>(
        &mut self,
        step: Step<G::Outcome>,
        ledger: &mut TokenLedger<S, C>,
    ) -> Result<Advance, SessionError> {
        let Step::Finished(outcome) = step else {
            return Ok(Advance::Continued);
        };

        // a failed credit keeps the game active so the finish can be retried
        let reward = self.game.reward(&outcome);
        if reward > 0 {
            ledger.add(reward)?;
        }
        self.state = SessionState::Finished(Settlement { outcome, reward });
        info!(game = %self.game.kind(), reward, balance = ledger.balance(), "Game settled");
        Ok(Advance::Settled { reward })
    }
}
