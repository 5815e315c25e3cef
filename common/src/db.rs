use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS game_rooms (
        id TEXT PRIMARY KEY NOT NULL,
        room_code TEXT NOT NULL UNIQUE,
        game_type TEXT NOT NULL,
        host_wallet_address TEXT NOT NULL,
        max_players INTEGER NOT NULL DEFAULT 4,
        entry_fee INTEGER NOT NULL DEFAULT 45,
        prize_pool INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'waiting',
        game_state TEXT,
        winner_wallet_address TEXT,
        created_at TEXT NOT NULL,
        started_at TEXT,
        completed_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS room_players (
        id TEXT PRIMARY KEY NOT NULL,
        room_id TEXT NOT NULL REFERENCES game_rooms(id) ON DELETE CASCADE,
        wallet_address TEXT NOT NULL,
        score INTEGER NOT NULL DEFAULT 0,
        position INTEGER,
        joined_at TEXT NOT NULL,
        UNIQUE (room_id, wallet_address)
    )",
    "CREATE TABLE IF NOT EXISTS tournaments (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        game_type TEXT NOT NULL,
        entry_fee INTEGER NOT NULL DEFAULT 45,
        prize_pool INTEGER NOT NULL DEFAULT 0,
        max_participants INTEGER NOT NULL DEFAULT 64,
        status TEXT NOT NULL DEFAULT 'upcoming',
        start_time TEXT NOT NULL,
        end_time TEXT,
        winner_wallet_address TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tournament_participants (
        id TEXT PRIMARY KEY NOT NULL,
        tournament_id TEXT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
        wallet_address TEXT NOT NULL,
        final_score INTEGER,
        final_position INTEGER,
        joined_at TEXT NOT NULL,
        UNIQUE (tournament_id, wallet_address)
    )",
    "CREATE TABLE IF NOT EXISTS players (
        id TEXT PRIMARY KEY NOT NULL,
        wallet_address TEXT NOT NULL UNIQUE,
        username TEXT,
        total_games_played INTEGER NOT NULL DEFAULT 0,
        total_tokens_won INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_game_rooms_status ON game_rooms (status, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_tournaments_status ON tournaments (status, start_time)",
];

pub async fn establish_connection(database_url: &str) -> anyhow::Result<SqlitePool> {
    info!("Connecting to database: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid DATABASE_URL {database_url}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to create pool")?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Single-connection pool over a private in-memory database.
pub async fn in_memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<_> = tables.into_iter().map(|(name,)| name).collect();
        assert_eq!(
            names,
            vec![
                "game_rooms",
                "players",
                "room_players",
                "tournament_participants",
                "tournaments"
            ]
        );
    }
}
