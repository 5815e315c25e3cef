use chrono::Utc;
use common::models::PlayerStats;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{LobbyError, Logged},
    realtime::{Change, ChangeFeed, ChangeKind, Table},
};

pub const DEFAULT_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct Leaderboard {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl Leaderboard {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn top_players(&self, limit: i64) -> Result<Vec<PlayerStats>, LobbyError> {
        sqlx::query_as::<_, PlayerStats>(
            "SELECT * FROM players \
             ORDER BY total_tokens_won DESC, total_games_played DESC, wallet_address ASC \
             LIMIT ?",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .logged("fetch leaderboard")
    }

    pub async fn player(&self, wallet_address: &str) -> Result<Option<PlayerStats>, LobbyError> {
        sqlx::query_as::<_, PlayerStats>("SELECT * FROM players WHERE wallet_address = ?")
            .bind(wallet_address)
            .fetch_optional(&self.pool)
            .await
            .logged("fetch player")
    }

    /// Counts one settled game and its reward against the wallet.
    pub async fn record_result(
        &self,
        wallet_address: &str,
        tokens_won: u64,
    ) -> Result<PlayerStats, LobbyError> {
        let now = Utc::now();
        let tokens_won = i64::try_from(tokens_won).unwrap_or(i64::MAX);

        let stats = sqlx::query_as::<_, PlayerStats>(
            "INSERT INTO players (id, wallet_address, total_games_played, total_tokens_won, created_at, updated_at) \
             VALUES (?, ?, 1, ?, ?, ?) \
             ON CONFLICT (wallet_address) DO UPDATE SET \
                 total_games_played = total_games_played + 1, \
                 total_tokens_won = total_tokens_won + excluded.total_tokens_won, \
                 updated_at = excluded.updated_at \
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(wallet_address)
        .bind(tokens_won)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .logged("record result")?;

        info!(
            wallet = %wallet_address,
            games = stats.total_games_played,
            won = stats.total_tokens_won,
            "Recorded game result"
        );
        self.feed
            .publish(Change::new(Table::Players, ChangeKind::Update, &stats.id))
            .await;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn board() -> Leaderboard {
        let pool = common::db::in_memory().await.unwrap();
        Leaderboard::new(pool, ChangeFeed::local())
    }

    #[tokio::test]
    async fn results_accumulate_per_wallet() {
        let board = board().await;
        board.record_result("alice", 150).await.unwrap();
        let stats = board.record_result("alice", 0).await.unwrap();

        assert_eq!(stats.total_games_played, 2);
        assert_eq!(stats.total_tokens_won, 150);
        assert_eq!(board.player("alice").await.unwrap(), Some(stats));
        assert_eq!(board.player("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ranks_by_tokens_won() {
        let board = board().await;
        board.record_result("alice", 60).await.unwrap();
        board.record_result("bob", 120).await.unwrap();
        board.record_result("carol", 90).await.unwrap();
        board.record_result("alice", 45).await.unwrap();

        let ranking: Vec<(String, i64)> = board
            .top_players(DEFAULT_LIMIT)
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.wallet_address, p.total_tokens_won))
            .collect();
        assert_eq!(
            ranking,
            vec![
                ("bob".to_string(), 120),
                ("alice".to_string(), 105),
                ("carol".to_string(), 90)
            ]
        );
        assert_eq!(board.top_players(1).await.unwrap().len(), 1);
    }
}
