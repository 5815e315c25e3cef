use tokio::{
    sync::{mpsc, watch},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};
use wallet::{Clock, Storage, TokenLedger};

use crate::session::{Advance, Game, Session, SessionError, SessionState};

/// Feeds player inputs into a running [`Driver`] and cancels it.
pub struct DriverHandle<I> {
    inputs: mpsc::UnboundedSender<I>,
    cancel: watch::Sender<bool>,
}

impl<I> DriverHandle<I> {
    /// False once the driver has stopped.
    pub fn send(&self, input: I) -> bool {
        self.inputs.send(input).is_ok()
    }

    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveEnd {
    Settled { reward: u64 },
    Cancelled,
}

/// Runs an active session on its tick period until it settles or is cancelled.
pub struct Driver<I> {
    inputs: mpsc::UnboundedReceiver<I>,
    cancel: watch::Receiver<bool>,
}

pub fn channel<I>() -> (DriverHandle<I>, Driver<I>) {
    let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    (
        DriverHandle {
            inputs: inputs_tx,
            cancel: cancel_tx,
        },
        Driver {
            inputs: inputs_rx,
            cancel: cancel_rx,
        },
    )
}

impl<I> Driver<I> {
    /// `observe` sees the state after every tick and every accepted input.
    /// Cancellation exits the session, forfeiting the entry fee.
    pub async fn run<G, S, C, F>(
        mut self,
        session: &mut Session<G>,
        ledger: &mut TokenLedger<S, C>,
        mut observe: F,
    ) -> Result<DriveEnd, SessionError>
    where
        G: Game<Input = I>,
        S: Storage,
        C: Clock,
        F: FnMut(&SessionState<G::Active, G::Outcome>),
    {
        if !session.is_active() {
            return Err(SessionError::NotActive(session.game().kind()));
        }

        let mut interval = time::interval(session.game().tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        interval.tick().await;

        let mut inputs_open = true;
        let mut cancel_open = true;
        observe(session.state());

        loop {
            let advanced = tokio::select! {
                biased;

                changed = self.cancel.changed(), if cancel_open => {
                    if changed.is_err() {
                        cancel_open = false;
                        continue;
                    }
                    if *self.cancel.borrow_and_update() {
                        session.exit();
                        observe(session.state());
                        return Ok(DriveEnd::Cancelled);
                    }
                    continue;
                }
                input = self.inputs.recv(), if inputs_open => {
                    let Some(input) = input else {
                        inputs_open = false;
                        continue;
                    };
                    match session.input(input, ledger) {
                        Err(SessionError::Game(err)) => {
                            debug!(%err, "Input rejected");
                            continue;
                        }
                        other => other,
                    }
                }
                _ = interval.tick() => session.tick(ledger),
            };

            let advanced = advanced.map_err(|err| {
                warn!(%err, "Session stopped");
                err
            })?;
            observe(session.state());

            if let Advance::Settled { reward } = advanced {
                return Ok(DriveEnd::Settled { reward });
            }
        }
    }
}
