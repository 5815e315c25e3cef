use chrono::{DateTime, Utc};
use common::{
    models::{Tournament, TournamentParticipant},
    utils::{GameType, TournamentStatus},
};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{LobbyError, Logged},
    realtime::{Change, ChangeFeed, ChangeKind, Table},
    JoinOutcome,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NewTournament {
    pub name: String,
    pub game_type: GameType,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub max_participants: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl NewTournament {
    pub fn new(name: impl Into<String>, game_type: GameType, start_time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            game_type,
            entry_fee: 45,
            prize_pool: 0,
            max_participants: 64,
            start_time,
            end_time: None,
        }
    }
}

#[derive(Clone)]
pub struct TournamentClient {
    pool: SqlitePool,
    feed: ChangeFeed,
    wallet: Option<String>,
}

impl TournamentClient {
    pub fn new(pool: SqlitePool, feed: ChangeFeed, wallet: Option<String>) -> Self {
        Self { pool, feed, wallet }
    }

    pub fn with_wallet(&self, wallet: impl Into<String>) -> Self {
        Self {
            wallet: Some(wallet.into()),
            ..self.clone()
        }
    }

    /// Upcoming and running tournaments, soonest first.
    pub async fn fetch_tournaments(&self) -> Result<Vec<Tournament>, LobbyError> {
        sqlx::query_as::<_, Tournament>(
            "SELECT * FROM tournaments WHERE status IN (?, ?) ORDER BY start_time ASC",
        )
        .bind(TournamentStatus::Upcoming.as_str())
        .bind(TournamentStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await
        .logged("fetch tournaments")
    }

    pub async fn tournament(&self, tournament_id: &str) -> Result<Tournament, LobbyError> {
        sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = ?")
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await
            .logged("fetch tournament")?
            .ok_or_else(|| LobbyError::TournamentNotFound(tournament_id.to_string()))
    }

    pub async fn participants(
        &self,
        tournament_id: &str,
    ) -> Result<Vec<TournamentParticipant>, LobbyError> {
        sqlx::query_as::<_, TournamentParticipant>(
            "SELECT * FROM tournament_participants WHERE tournament_id = ? ORDER BY joined_at ASC",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await
        .logged("fetch participants")
    }

    pub async fn join_tournament(&self, tournament_id: &str) -> Result<JoinOutcome, LobbyError> {
        let wallet = self
            .wallet
            .as_deref()
            .ok_or(LobbyError::WalletNotConnected)?;
        let tournament = self.tournament(tournament_id).await?;
        if tournament.status()? == TournamentStatus::Completed {
            return Err(LobbyError::TournamentClosed(tournament.name));
        }

        // capacity is checked in the same statement as the insert
        let participant_id = Uuid::new_v4().to_string();
        let inserted = sqlx::query(
            "INSERT INTO tournament_participants (id, tournament_id, wallet_address, joined_at) \
             SELECT ?, ?, ?, ? \
             WHERE (SELECT COUNT(*) FROM tournament_participants WHERE tournament_id = ?) < ? \
             ON CONFLICT (tournament_id, wallet_address) DO NOTHING",
        )
        .bind(&participant_id)
        .bind(tournament_id)
        .bind(wallet)
        .bind(Utc::now())
        .bind(tournament_id)
        .bind(tournament.max_participants)
        .execute(&self.pool)
        .await
        .logged("join tournament")?
        .rows_affected();

        if inserted == 0 {
            let already: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM tournament_participants \
                 WHERE tournament_id = ? AND wallet_address = ?",
            )
            .bind(tournament_id)
            .bind(wallet)
            .fetch_one(&self.pool)
            .await
            .logged("check participant")?;
            return if already > 0 {
                Ok(JoinOutcome::AlreadyMember)
            } else {
                Err(LobbyError::TournamentFull(tournament.name))
            };
        }

        info!(tournament = %tournament.name, wallet = %wallet, "Joined tournament");
        self.feed
            .publish(Change::new(
                Table::TournamentParticipants,
                ChangeKind::Insert,
                participant_id,
            ))
            .await;
        Ok(JoinOutcome::Joined)
    }

    pub async fn schedule_tournament(&self, new: NewTournament) -> Result<Tournament, LobbyError> {
        let tournament = Tournament {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            game_type: new.game_type.to_string(),
            entry_fee: new.entry_fee,
            prize_pool: new.prize_pool,
            max_participants: new.max_participants,
            status: TournamentStatus::Upcoming.to_string(),
            start_time: new.start_time,
            end_time: new.end_time,
            winner_wallet_address: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO tournaments (id, name, game_type, entry_fee, prize_pool, max_participants, \
             status, start_time, end_time, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tournament.id)
        .bind(&tournament.name)
        .bind(&tournament.game_type)
        .bind(tournament.entry_fee)
        .bind(tournament.prize_pool)
        .bind(tournament.max_participants)
        .bind(&tournament.status)
        .bind(tournament.start_time)
        .bind(tournament.end_time)
        .bind(tournament.created_at)
        .execute(&self.pool)
        .await
        .logged("schedule tournament")?;

        info!(tournament = %tournament.name, start = %tournament.start_time, "Tournament scheduled");
        self.feed
            .publish(Change::new(Table::Tournaments, ChangeKind::Insert, &tournament.id))
            .await;
        Ok(tournament)
    }

    pub async fn set_status(
        &self,
        tournament_id: &str,
        status: TournamentStatus,
    ) -> Result<(), LobbyError> {
        let updated = sqlx::query("UPDATE tournaments SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(tournament_id)
            .execute(&self.pool)
            .await
            .logged("update tournament status")?
            .rows_affected();
        if updated == 0 {
            return Err(LobbyError::TournamentNotFound(tournament_id.to_string()));
        }

        self.feed
            .publish(Change::new(Table::Tournaments, ChangeKind::Update, tournament_id))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    async fn client() -> TournamentClient {
        let pool = common::db::in_memory().await.unwrap();
        TournamentClient::new(pool, ChangeFeed::local(), Some("player".into()))
    }

    #[tokio::test]
    async fn lists_open_tournaments_soonest_first() {
        let client = client().await;
        let now = Utc::now();
        let later = client
            .schedule_tournament(NewTournament::new("Weekend Cup", GameType::Snake, now + Duration::days(2)))
            .await
            .unwrap();
        let sooner = client
            .schedule_tournament(NewTournament::new("Daily Dash", GameType::MarioDash, now + Duration::hours(3)))
            .await
            .unwrap();
        let done = client
            .schedule_tournament(NewTournament::new("Old Cup", GameType::Uno, now - Duration::days(7)))
            .await
            .unwrap();
        client.set_status(&done.id, TournamentStatus::Completed).await.unwrap();

        let names: Vec<String> = client
            .fetch_tournaments()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec![sooner.name, later.name]);
    }

    #[tokio::test]
    async fn joining_is_idempotent() {
        let client = client().await;
        let cup = client
            .schedule_tournament(NewTournament::new("Cup", GameType::Crossword, Utc::now()))
            .await
            .unwrap();

        assert_eq!(client.join_tournament(&cup.id).await.unwrap(), JoinOutcome::Joined);
        assert_eq!(client.join_tournament(&cup.id).await.unwrap(), JoinOutcome::AlreadyMember);

        let participants = client.participants(&cup.id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].wallet_address, "player");
        assert_eq!(participants[0].final_score, None);
    }

    #[tokio::test]
    async fn full_and_closed_tournaments_refuse_entry() {
        let client = client().await;
        let mut small = NewTournament::new("Duel", GameType::PrecisionArchery, Utc::now());
        small.max_participants = 1;
        let duel = client.schedule_tournament(small).await.unwrap();

        client.join_tournament(&duel.id).await.unwrap();
        assert!(matches!(
            client.with_wallet("rival").join_tournament(&duel.id).await,
            Err(LobbyError::TournamentFull(_))
        ));

        client.set_status(&duel.id, TournamentStatus::Completed).await.unwrap();
        assert!(matches!(
            client.with_wallet("late").join_tournament(&duel.id).await,
            Err(LobbyError::TournamentClosed(_))
        ));
        assert!(matches!(
            client.join_tournament("nope").await,
            Err(LobbyError::TournamentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn simultaneous_joins_never_exceed_capacity() {
        let client = client().await;
        let mut pair = NewTournament::new("Pairs", GameType::Uno, Utc::now());
        pair.max_participants = 2;
        let pairs = client.schedule_tournament(pair).await.unwrap();

        let contenders: Vec<TournamentClient> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|wallet| client.with_wallet(wallet))
            .collect();
        let results =
            futures_util::future::join_all(contenders.iter().map(|c| c.join_tournament(&pairs.id))).await;

        let joined = results
            .iter()
            .filter(|r| matches!(r, Ok(JoinOutcome::Joined)))
            .count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(LobbyError::TournamentFull(_))))
            .count();
        assert_eq!((joined, refused), (2, 2));
        assert_eq!(client.participants(&pairs.id).await.unwrap().len(), 2);

        // members of a full tournament are told they are in, not that it is full
        let member = results
            .iter()
            .position(|r| r.is_ok())
            .map(|i| &contenders[i])
            .unwrap();
        assert_eq!(member.join_tournament(&pairs.id).await.unwrap(), JoinOutcome::AlreadyMember);
    }

    #[tokio::test]
    async fn joining_requires_a_wallet() {
        let pool = common::db::in_memory().await.unwrap();
        let anonymous = TournamentClient::new(pool, ChangeFeed::local(), None);
        assert!(matches!(
            anonymous.join_tournament("any").await,
            Err(LobbyError::WalletNotConnected)
        ));
    }
}
