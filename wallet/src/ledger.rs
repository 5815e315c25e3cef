use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    clock::{Clock, SystemClock},
    storage::{Storage, StorageError},
};

pub const BALANCE_KEY: &str = "token_balance";
pub const LAST_CLAIM_KEY: &str = "last_claim_time";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub initial_balance: u64,
    pub daily_tokens: u64,
    pub claim_cooldown: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_balance: 100,
            daily_tokens: 100,
            claim_cooldown: Duration::hours(24),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("balance overflow adding {amount} to {balance}")]
    Overflow { balance: u64, amount: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed { amount: u64, balance: u64 },
    CoolingDown { remaining: Duration },
}

/// The single owner of the token balance.
///
/// Every mutation is written to storage before it is applied in memory, so a
/// failed write leaves both the ledger and storage on the previous value.
pub struct TokenLedger<S, C = SystemClock> {
    storage: S,
    clock: C,
    config: LedgerConfig,
    balance: u64,
    last_claim: Option<DateTime<Utc>>,
    balance_tx: watch::Sender<u64>,
}

impl<S: Storage> TokenLedger<S, SystemClock> {
    pub fn open(storage: S) -> Result<Self, LedgerError> {
        Self::with_clock(storage, SystemClock, LedgerConfig::default())
    }
}

impl<S: Storage, C: Clock> TokenLedger<S, C> {
    pub fn with_clock(mut storage: S, clock: C, config: LedgerConfig) -> Result<Self, LedgerError> {
        let balance = match storage.get(BALANCE_KEY)? {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!(value = %raw, "Discarding unreadable stored balance");
                config.initial_balance
            }),
            None => config.initial_balance,
        };

        // 0 is the "never claimed" marker
        let last_claim = match storage.get(LAST_CLAIM_KEY)? {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(0) => None,
                Ok(millis) => Utc.timestamp_millis_opt(millis).single(),
                Err(_) => {
                    warn!(value = %raw, "Discarding unreadable last claim time");
                    None
                }
            },
            None => None,
        };

        let (balance_tx, _) = watch::channel(balance);
        Ok(Self {
            storage,
            clock,
            config,
            balance,
            last_claim,
            balance_tx,
        })
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn last_claim(&self) -> Option<DateTime<Utc>> {
        self.last_claim
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Observes every committed balance.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.balance_tx.subscribe()
    }

    pub fn time_until_next_claim(&self) -> Duration {
        match self.last_claim {
            None => Duration::zero(),
            Some(last) => {
                let elapsed = self.clock.now() - last;
                (self.config.claim_cooldown - elapsed).max(Duration::zero())
            }
        }
    }

    pub fn can_claim(&self) -> bool {
        self.time_until_next_claim() == Duration::zero()
    }

    pub fn claim(&mut self) -> Result<ClaimOutcome, LedgerError> {
        let remaining = self.time_until_next_claim();
        if remaining > Duration::zero() {
            return Ok(ClaimOutcome::CoolingDown { remaining });
        }

        let amount = self.config.daily_tokens;
        let balance = self.checked_credit(amount)?;
        let now = self.clock.now();

        // stamp first: a failure after it can lose a claim but never grant two
        self.storage
            .set(LAST_CLAIM_KEY, &now.timestamp_millis().to_string())?;
        if let Err(err) = self.storage.set(BALANCE_KEY, &balance.to_string()) {
            self.restore_last_claim();
            return Err(err.into());
        }

        self.last_claim = Some(now);
        self.commit(balance);
        info!(amount, balance, "Claimed daily tokens");

        Ok(ClaimOutcome::Claimed { amount, balance })
    }

    /// Debits `amount` iff the balance covers it. `Ok(false)` leaves everything untouched.
    pub fn spend(&mut self, amount: u64) -> Result<bool, LedgerError> {
        if self.balance < amount {
            warn!(amount, balance = self.balance, "Insufficient tokens");
            return Ok(false);
        }

        let balance = self.balance - amount;
        self.storage.set(BALANCE_KEY, &balance.to_string())?;
        self.commit(balance);
        Ok(true)
    }

    pub fn add(&mut self, amount: u64) -> Result<u64, LedgerError> {
        let balance = self.checked_credit(amount)?;
        self.storage.set(BALANCE_KEY, &balance.to_string())?;
        self.commit(balance);
        Ok(balance)
    }

    fn restore_last_claim(&mut self) {
        let restored = match self.last_claim {
            Some(last) => self
                .storage
                .set(LAST_CLAIM_KEY, &last.timestamp_millis().to_string()),
            None => self.storage.remove(LAST_CLAIM_KEY),
        };
        if let Err(err) = restored {
            warn!(%err, "Could not roll back claim time, today's claim is forfeited");
        }
    }

    fn checked_credit(&self, amount: u64) -> Result<u64, LedgerError> {
        self.balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                balance: self.balance,
                amount,
            })
    }

    fn commit(&mut self, balance: u64) {
        self.balance = balance;
        self.balance_tx.send_replace(balance);
    }
}

/// Renders a countdown as `HH:MM:SS`.
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
