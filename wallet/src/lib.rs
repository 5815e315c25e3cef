//! Local token wallet: the balance ledger, its key/value persistence and the
//! simulated wallet connection.

pub mod clock;
pub mod connector;
pub mod ledger;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use connector::{short_address, WalletConnector};
pub use ledger::{format_countdown, ClaimOutcome, LedgerConfig, LedgerError, TokenLedger};
pub use storage::{FileStorage, MemoryStorage, RedisStorage, Storage, StorageError};
