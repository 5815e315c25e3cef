//! Multiplayer rooms, tournaments and the leaderboard over the relational
//! store, plus the change feed that keeps listings fresh.

pub mod error;
pub mod leaderboard;
pub mod realtime;
pub mod rooms;
pub mod tournaments;

use sqlx::SqlitePool;

pub use error::LobbyError;
pub use leaderboard::Leaderboard;
pub use realtime::{Change, ChangeFeed, ChangeKind, Table};
pub use rooms::{PlayersWatcher, RoomClient, RoomsWatcher};
pub use tournaments::{NewTournament, TournamentClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
}

/// The three lobby clients sharing one pool, feed and wallet.
#[derive(Clone)]
pub struct Lobby {
    pub rooms: RoomClient,
    pub tournaments: TournamentClient,
    pub leaderboard: Leaderboard,
}

impl Lobby {
    pub fn new(pool: SqlitePool, feed: ChangeFeed, wallet: Option<String>) -> Self {
        Self {
            rooms: RoomClient::new(pool.clone(), feed.clone(), wallet.clone()),
            tournaments: TournamentClient::new(pool.clone(), feed.clone(), wallet),
            leaderboard: Leaderboard::new(pool, feed),
        }
    }
}
