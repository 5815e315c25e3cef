use common::utils::UnknownVariant;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("Please connect your wallet first")]
    WalletNotConnected,
    #[error("Room {0} not found")]
    RoomNotFound(String),
    #[error("Room {0} is not accepting players")]
    RoomNotWaiting(String),
    #[error("Room {room_code} is full ({max_players} players)")]
    RoomFull { room_code: String, max_players: i64 },
    #[error("A room needs at least 2 seats, got {0}")]
    InvalidMaxPlayers(i64),
    #[error("{0} is not in this room")]
    NotInRoom(String),
    #[error("Only the host can start the room")]
    NotHost,
    #[error("Need 2 to {max_players} players to start, have {players}")]
    CannotStart { players: i64, max_players: i64 },
    #[error("Tournament {0} not found")]
    TournamentNotFound(String),
    #[error("Tournament {0} is closed")]
    TournamentClosed(String),
    #[error("Tournament {0} is full")]
    TournamentFull(String),
    #[error(transparent)]
    Corrupt(#[from] UnknownVariant),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Logs a failed remote-store call before handing the error back.
pub(crate) trait Logged<T> {
    fn logged(self, action: &'static str) -> Result<T, LobbyError>;
}

impl<T> Logged<T> for Result<T, sqlx::Error> {
    fn logged(self, action: &'static str) -> Result<T, LobbyError> {
        self.map_err(|err| {
            error!(%err, action, "Remote store call failed");
            LobbyError::Database(err)
        })
    }
}
