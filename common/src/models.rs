use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{GameType, RoomStatus, TournamentStatus, UnknownVariant};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct GameRoom {
    pub id: String,
    pub room_code: String,
    pub game_type: String,
    pub host_wallet_address: String,
    pub max_players: i64,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub status: String,
    pub game_state: Option<String>, // JSON blob owned by the running game
    pub winner_wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GameRoom {
    pub fn status(&self) -> Result<RoomStatus, UnknownVariant> {
        self.status.parse()
    }

    pub fn game_type(&self) -> Result<GameType, UnknownVariant> {
        self.game_type.parse()
    }

    pub fn is_host(&self, wallet_address: &str) -> bool {
        self.host_wallet_address == wallet_address
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct RoomPlayer {
    pub id: String,
    pub room_id: String,
    pub wallet_address: String,
    pub score: i64,
    pub position: Option<i64>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub game_type: String,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub max_participants: i64,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub winner_wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn status(&self) -> Result<TournamentStatus, UnknownVariant> {
        self.status.parse()
    }

    pub fn game_type(&self) -> Result<GameType, UnknownVariant> {
        self.game_type.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct TournamentParticipant {
    pub id: String,
    pub tournament_id: String,
    pub wallet_address: String,
    pub final_score: Option<i64>,
    pub final_position: Option<i64>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct PlayerStats {
    pub id: String,
    pub wallet_address: String,
    pub username: Option<String>,
    pub total_games_played: i64,
    pub total_tokens_won: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
