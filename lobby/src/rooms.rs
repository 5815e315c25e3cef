use chrono::Utc;
use common::{
    models::{GameRoom, RoomPlayer},
    utils::{GameType, RoomStatus},
};
use rand::Rng;
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{LobbyError, Logged},
    realtime::{Change, ChangeFeed, ChangeKind, Table},
    JoinOutcome,
};

pub const ROOM_CODE_LEN: usize = 6;
pub const DEFAULT_MAX_PLAYERS: i64 = 4;
pub const DEFAULT_ROOM_ENTRY_FEE: i64 = 45;
const CODE_ATTEMPTS: usize = 8;
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random code used when the store cannot produce one.
pub fn fallback_room_code<R: Rng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// A room may start once at least two players are seated and it is not over capacity.
pub fn can_start(room: &GameRoom, players: i64) -> bool {
    players >= 2 && players <= room.max_players
}

#[derive(Clone)]
pub struct RoomClient {
    pool: SqlitePool,
    feed: ChangeFeed,
    wallet: Option<String>,
}

impl RoomClient {
    pub fn new(pool: SqlitePool, feed: ChangeFeed, wallet: Option<String>) -> Self {
        Self { pool, feed, wallet }
    }

    pub fn with_wallet(&self, wallet: impl Into<String>) -> Self {
        Self {
            wallet: Some(wallet.into()),
            ..self.clone()
        }
    }

    fn wallet(&self) -> Result<&str, LobbyError> {
        self.wallet.as_deref().ok_or(LobbyError::WalletNotConnected)
    }

    pub async fn fetch_rooms(&self, status: RoomStatus) -> Result<Vec<GameRoom>, LobbyError> {
        sqlx::query_as::<_, GameRoom>(
            "SELECT * FROM game_rooms WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .logged("fetch rooms")
    }

    pub async fn room(&self, room_id: &str) -> Result<GameRoom, LobbyError> {
        sqlx::query_as::<_, GameRoom>("SELECT * FROM game_rooms WHERE id = ?")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .logged("fetch room")?
            .ok_or_else(|| LobbyError::RoomNotFound(room_id.to_string()))
    }

    pub async fn room_players(&self, room_id: &str) -> Result<Vec<RoomPlayer>, LobbyError> {
        sqlx::query_as::<_, RoomPlayer>(
            "SELECT * FROM room_players WHERE room_id = ? ORDER BY joined_at ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .logged("fetch room players")
    }

    async fn player_count(&self, room_id: &str) -> Result<i64, LobbyError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM room_players WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .logged("count room players")
    }

    /// Asks the store for an unused code, falling back to a local random one.
    pub async fn generate_room_code(&self) -> String {
        match self.unique_code_from_store().await {
            Ok(Some(code)) => code,
            Ok(None) => {
                warn!("No unique room code after {CODE_ATTEMPTS} attempts, using fallback");
                fallback_room_code(&mut rand::thread_rng())
            }
            Err(err) => {
                warn!(%err, "Room code generation failed, using fallback");
                fallback_room_code(&mut rand::thread_rng())
            }
        }
    }

    async fn unique_code_from_store(&self) -> Result<Option<String>, sqlx::Error> {
        for _ in 0..CODE_ATTEMPTS {
            let code: String =
                sqlx::query_scalar("SELECT upper(substr(hex(randomblob(4)), 1, 6))")
                    .fetch_one(&self.pool)
                    .await?;
            let taken: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM game_rooms WHERE room_code = ?")
                    .bind(&code)
                    .fetch_one(&self.pool)
                    .await?;
            if taken == 0 {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }

    /// Creates a waiting room hosted by the connected wallet and seats the host.
    pub async fn create_room(
        &self,
        game_type: GameType,
        max_players: i64,
    ) -> Result<GameRoom, LobbyError> {
        let host = self.wallet()?.to_string();
        if max_players < 2 {
            return Err(LobbyError::InvalidMaxPlayers(max_players));
        }

        let room = GameRoom {
            id: Uuid::new_v4().to_string(),
            room_code: self.generate_room_code().await,
            game_type: game_type.to_string(),
            host_wallet_address: host.clone(),
            max_players,
            entry_fee: DEFAULT_ROOM_ENTRY_FEE,
            prize_pool: 0,
            status: RoomStatus::Waiting.to_string(),
            game_state: None,
            winner_wallet_address: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let player_id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await.logged("begin create room")?;
        sqlx::query(
            "INSERT INTO game_rooms (id, room_code, game_type, host_wallet_address, max_players, \
             entry_fee, prize_pool, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&room.id)
        .bind(&room.room_code)
        .bind(&room.game_type)
        .bind(&room.host_wallet_address)
        .bind(room.max_players)
        .bind(room.entry_fee)
        .bind(room.prize_pool)
        .bind(&room.status)
        .bind(room.created_at)
        .execute(&mut tx)
        .await
        .logged("insert room")?;
        sqlx::query(
            "INSERT INTO room_players (id, room_id, wallet_address, score, joined_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(&player_id)
        .bind(&room.id)
        .bind(&host)
        .bind(room.created_at)
        .execute(&mut tx)
        .await
        .logged("seat host")?;
        tx.commit().await.logged("commit create room")?;

        info!(room = %room.room_code, game = %game_type, host = %host, "Room created");
        self.feed
            .publish(Change::new(Table::GameRooms, ChangeKind::Insert, &room.id))
            .await;
        self.feed
            .publish(Change::new(Table::RoomPlayers, ChangeKind::Insert, player_id).in_room(&room.id))
            .await;
        Ok(room)
    }

    /// Seats the connected wallet. Joining a room twice is a no-op.
    pub async fn join_room(&self, room_id: &str) -> Result<JoinOutcome, LobbyError> {
        let wallet = self.wallet()?.to_string();
        let room = self.room(room_id).await?;

        let seated: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM room_players WHERE room_id = ? AND wallet_address = ?",
        )
        .bind(room_id)
        .bind(&wallet)
        .fetch_one(&self.pool)
        .await
        .logged("check membership")?;
        if seated > 0 {
            debug!(room = %room.room_code, "Already in room");
            return Ok(JoinOutcome::AlreadyMember);
        }

        if room.status()? != RoomStatus::Waiting {
            return Err(LobbyError::RoomNotWaiting(room.room_code));
        }
        if self.player_count(room_id).await? >= room.max_players {
            return Err(LobbyError::RoomFull {
                room_code: room.room_code,
                max_players: room.max_players,
            });
        }

        let player_id = Uuid::new_v4().to_string();
        let inserted = sqlx::query(
            "INSERT INTO room_players (id, room_id, wallet_address, score, joined_at) \
             VALUES (?, ?, ?, 0, ?) ON CONFLICT (room_id, wallet_address) DO NOTHING",
        )
        .bind(&player_id)
        .bind(room_id)
        .bind(&wallet)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .logged("join room")?
        .rows_affected();
        if inserted == 0 {
            return Ok(JoinOutcome::AlreadyMember);
        }

        info!(room = %room.room_code, wallet = %wallet, "Joined room");
        self.feed
            .publish(Change::new(Table::RoomPlayers, ChangeKind::Insert, player_id).in_room(room_id))
            .await;
        Ok(JoinOutcome::Joined)
    }

    /// Case-insensitive lookup among waiting rooms.
    pub async fn find_room_by_code(&self, code: &str) -> Result<Option<GameRoom>, LobbyError> {
        sqlx::query_as::<_, GameRoom>(
            "SELECT * FROM game_rooms WHERE room_code = ? AND status = ?",
        )
        .bind(code.trim().to_uppercase())
        .bind(RoomStatus::Waiting.as_str())
        .fetch_optional(&self.pool)
        .await
        .logged("find room by code")
    }

    pub async fn join_by_code(&self, code: &str) -> Result<(GameRoom, JoinOutcome), LobbyError> {
        let room = self
            .find_room_by_code(code)
            .await?
            .ok_or_else(|| LobbyError::RoomNotFound(code.trim().to_uppercase()))?;
        let outcome = self.join_room(&room.id).await?;
        Ok((room, outcome))
    }

    pub async fn leave_room(&self, room_id: &str) -> Result<(), LobbyError> {
        let wallet = self.wallet()?.to_string();
        let removed = sqlx::query("DELETE FROM room_players WHERE room_id = ? AND wallet_address = ?")
            .bind(room_id)
            .bind(&wallet)
            .execute(&self.pool)
            .await
            .logged("leave room")?
            .rows_affected();
        if removed == 0 {
            return Err(LobbyError::NotInRoom(wallet));
        }

        info!(room = %room_id, wallet = %wallet, "Left room");
        self.feed
            .publish(Change::new(Table::RoomPlayers, ChangeKind::Delete, &wallet).in_room(room_id))
            .await;
        Ok(())
    }

    /// Host-only transition from waiting to active.
    pub async fn start_room(&self, room_id: &str) -> Result<GameRoom, LobbyError> {
        let wallet = self.wallet()?;
        let room = self.room(room_id).await?;
        if !room.is_host(wallet) {
            return Err(LobbyError::NotHost);
        }
        if room.status()? != RoomStatus::Waiting {
            return Err(LobbyError::RoomNotWaiting(room.room_code));
        }

        let players = self.player_count(room_id).await?;
        if !can_start(&room, players) {
            return Err(LobbyError::CannotStart {
                players,
                max_players: room.max_players,
            });
        }

        sqlx::query("UPDATE game_rooms SET status = ?, started_at = ? WHERE id = ?")
            .bind(RoomStatus::Active.as_str())
            .bind(Utc::now())
            .bind(room_id)
            .execute(&self.pool)
            .await
            .logged("start room")?;

        info!(room = %room.room_code, players, "Room started");
        self.feed
            .publish(Change::new(Table::GameRooms, ChangeKind::Update, room_id))
            .await;
        self.room(room_id).await
    }

    pub fn watch_rooms(&self, status: RoomStatus) -> RoomsWatcher {
        RoomsWatcher {
            client: self.clone(),
            changes: self.feed.subscribe(),
            status,
        }
    }

    pub fn watch_players(&self, room_id: impl Into<String>) -> PlayersWatcher {
        PlayersWatcher {
            client: self.clone(),
            changes: self.feed.subscribe(),
            room_id: room_id.into(),
        }
    }
}

/// Waits for the next relevant change. A lagged receiver counts as a change
/// since notifications were lost.
async fn next_match<F>(changes: &mut broadcast::Receiver<Change>, relevant: F) -> Option<()>
where
    F: Fn(&Change) -> bool,
{
    loop {
        match changes.recv().await {
            Ok(change) if relevant(&change) => return Some(()),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Change feed lagged");
                return Some(());
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Re-fetches the room list whenever a room changes.
pub struct RoomsWatcher {
    client: RoomClient,
    changes: broadcast::Receiver<Change>,
    status: RoomStatus,
}

impl RoomsWatcher {
    /// `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<Result<Vec<GameRoom>, LobbyError>> {
        next_match(&mut self.changes, |change| change.table == Table::GameRooms).await?;
        Some(self.client.fetch_rooms(self.status).await)
    }
}

/// Re-fetches one room's roster whenever its membership changes.
pub struct PlayersWatcher {
    client: RoomClient,
    changes: broadcast::Receiver<Change>,
    room_id: String,
}

impl PlayersWatcher {
    pub async fn next(&mut self) -> Option<Result<Vec<RoomPlayer>, LobbyError>> {
        let room_id = self.room_id.clone();
        next_match(&mut self.changes, move |change| {
            change.table == Table::RoomPlayers && change.room_id.as_deref() == Some(room_id.as_str())
        })
        .await?;
        Some(self.client.room_players(&self.room_id).await)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    async fn client(wallet: &str) -> RoomClient {
        let pool = common::db::in_memory().await.unwrap();
        RoomClient::new(pool, ChangeFeed::local(), Some(wallet.to_string()))
    }

    #[test]
    fn fallback_codes_are_six_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let code = fallback_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[tokio::test]
    async fn store_generated_codes_are_hex() {
        let host = client("host").await;
        let code = host.generate_room_code().await;
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn creating_requires_a_wallet() {
        let pool = common::db::in_memory().await.unwrap();
        let anonymous = RoomClient::new(pool, ChangeFeed::local(), None);
        assert!(matches!(
            anonymous.create_room(GameType::Uno, 4).await,
            Err(LobbyError::WalletNotConnected)
        ));
        assert!(anonymous.fetch_rooms(RoomStatus::Waiting).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_seats_the_host() {
        let host = client("host").await;
        let room = host.create_room(GameType::Snake, 4).await.unwrap();

        assert_eq!(room.status().unwrap(), RoomStatus::Waiting);
        assert_eq!(room.entry_fee, 45);
        assert!(room.is_host("host"));

        let players = host.room_players(&room.id).await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].wallet_address, "host");

        let waiting = host.fetch_rooms(RoomStatus::Waiting).await.unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].room_code, room.room_code);
        assert!(matches!(
            host.create_room(GameType::Snake, 1).await,
            Err(LobbyError::InvalidMaxPlayers(1))
        ));
    }

    #[tokio::test]
    async fn joining_twice_keeps_one_membership() {
        let host = client("host").await;
        let room = host.create_room(GameType::Uno, 4).await.unwrap();
        let guest = host.with_wallet("guest");

        assert_eq!(guest.join_room(&room.id).await.unwrap(), JoinOutcome::Joined);
        assert_eq!(guest.join_room(&room.id).await.unwrap(), JoinOutcome::AlreadyMember);
        assert_eq!(host.join_room(&room.id).await.unwrap(), JoinOutcome::AlreadyMember);
        assert_eq!(host.room_players(&room.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn join_by_code_ignores_case() {
        let host = client("host").await;
        let room = host.create_room(GameType::Crossword, 4).await.unwrap();
        let guest = host.with_wallet("guest");

        let (found, outcome) = guest
            .join_by_code(&format!(" {} ", room.room_code.to_lowercase()))
            .await
            .unwrap();
        assert_eq!(found.id, room.id);
        assert_eq!(outcome, JoinOutcome::Joined);
        assert!(matches!(
            guest.join_by_code("ZZZZZZ").await,
            Err(LobbyError::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn full_rooms_refuse_newcomers() {
        let host = client("host").await;
        let room = host.create_room(GameType::Uno, 2).await.unwrap();
        host.with_wallet("second").join_room(&room.id).await.unwrap();

        assert!(matches!(
            host.with_wallet("third").join_room(&room.id).await,
            Err(LobbyError::RoomFull { max_players: 2, .. })
        ));
        assert!(matches!(
            host.with_wallet("x").join_room("missing").await,
            Err(LobbyError::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn leaving_removes_the_membership() {
        let host = client("host").await;
        let room = host.create_room(GameType::MarioDash, 4).await.unwrap();
        let guest = host.with_wallet("guest");
        guest.join_room(&room.id).await.unwrap();

        guest.leave_room(&room.id).await.unwrap();
        assert_eq!(host.room_players(&room.id).await.unwrap().len(), 1);
        assert!(matches!(
            guest.leave_room(&room.id).await,
            Err(LobbyError::NotInRoom(_))
        ));
    }

    #[tokio::test]
    async fn only_the_host_starts_a_full_enough_room() {
        let host = client("host").await;
        let room = host.create_room(GameType::PrecisionArchery, 4).await.unwrap();
        let guest = host.with_wallet("guest");

        assert!(matches!(
            host.start_room(&room.id).await,
            Err(LobbyError::CannotStart { players: 1, max_players: 4 })
        ));
        guest.join_room(&room.id).await.unwrap();
        assert!(matches!(guest.start_room(&room.id).await, Err(LobbyError::NotHost)));

        let started = host.start_room(&room.id).await.unwrap();
        assert_eq!(started.status().unwrap(), RoomStatus::Active);
        assert!(started.started_at.is_some());

        assert!(host.fetch_rooms(RoomStatus::Waiting).await.unwrap().is_empty());
        assert_eq!(host.fetch_rooms(RoomStatus::Active).await.unwrap().len(), 1);
        assert!(matches!(
            host.with_wallet("late").join_room(&room.id).await,
            Err(LobbyError::RoomNotWaiting(_))
        ));
        assert!(host.find_room_by_code(&room.room_code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn watchers_refetch_on_changes() {
        let host = client("host").await;
        let mut rooms = host.watch_rooms(RoomStatus::Waiting);

        let room = host.create_room(GameType::FruitLuck, 4).await.unwrap();
        let listed = rooms.next().await.unwrap().unwrap();
        assert_eq!(listed.len(), 1);

        let mut players = host.watch_players(&room.id);
        host.with_wallet("guest").join_room(&room.id).await.unwrap();
        let roster = players.next().await.unwrap().unwrap();
        assert_eq!(roster.len(), 2);
    }
}
