use futures_util::StreamExt;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_CHANNEL: &str = "arcade:changes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    GameRooms,
    RoomPlayers,
    Tournaments,
    TournamentParticipants,
    Players,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change notification. Carries no row data; receivers re-query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: String,
    /// Set for `room_players` changes so watchers can filter by room.
    pub room_id: Option<String>,
}

impl Change {
    pub fn new(table: Table, kind: ChangeKind, row_id: impl Into<String>) -> Self {
        Self {
            table,
            kind,
            row_id: row_id.into(),
            room_id: None,
        }
    }

    pub fn in_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }
}

#[derive(Debug, Error)]
enum RelayError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    origin: String,
    change: Change,
}

/// Fan-out of store changes to local subscribers, optionally mirrored across
/// processes through redis pub/sub. Delivery is best effort.
#[derive(Clone)]
pub struct ChangeFeed {
    origin: String,
    local: broadcast::Sender<Change>,
    redis: Option<redis::Client>,
    channel: String,
}

impl ChangeFeed {
    pub fn local() -> Self {
        let (local, _) = broadcast::channel(100);
        Self {
            origin: Uuid::new_v4().to_string(),
            local,
            redis: None,
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }

    pub fn with_redis(redis: redis::Client) -> Self {
        Self {
            redis: Some(redis),
            ..Self::local()
        }
    }

    pub fn on_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.local.subscribe()
    }

    pub async fn publish(&self, change: Change) {
        let _ = self.local.send(change.clone());

        let Some(redis) = &self.redis else {
            return;
        };
        let envelope = Envelope {
            origin: self.origin.clone(),
            change,
        };
        if let Err(err) = self.publish_remote(redis, &envelope).await {
            warn!(%err, channel = %self.channel, "Failed to relay change");
        }
    }

    async fn publish_remote(&self, redis: &redis::Client, envelope: &Envelope) -> Result<(), RelayError> {
        let payload = serde_json::to_string(envelope)?;
        let mut conn = redis.get_multiplexed_async_connection().await?;
        conn.publish::<_, _, ()>(&self.channel, payload).await?;
        Ok(())
    }

    /// Forwards changes published by other processes to local subscribers.
    /// `None` without redis.
    pub fn spawn_relay(&self) -> Option<JoinHandle<()>> {
        let redis = self.redis.clone()?;
        let feed = self.clone();

        Some(tokio::spawn(async move {
            let mut pubsub = match redis.get_async_pubsub().await {
                Ok(pubsub) => pubsub,
                Err(err) => {
                    warn!(%err, "Realtime relay unavailable");
                    return;
                }
            };
            if let Err(err) = pubsub.subscribe(&feed.channel).await {
                warn!(%err, channel = %feed.channel, "Realtime subscribe failed");
                return;
            }
            info!(channel = %feed.channel, "Subscribed to change relay");

            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let Ok(payload) = msg.get_payload::<String>() else {
                    continue;
                };
                match feed.accept(&payload) {
                    Some(change) => {
                        let _ = feed.local.send(change);
                    }
                    None => debug!("Dropped relayed message"),
                }
            }
            warn!(channel = %feed.channel, "Change relay closed");
        }))
    }

    /// Decodes a relayed payload, skipping this process's own echoes.
    fn accept(&self, payload: &str) -> Option<Change> {
        let envelope: Envelope = serde_json::from_str(payload).ok()?;
        (envelope.origin != self.origin).then_some(envelope.change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_subscribers_receive_changes() {
        let feed = ChangeFeed::local();
        let mut rx = feed.subscribe();

        feed.publish(Change::new(Table::RoomPlayers, ChangeKind::Insert, "p1").in_room("r1"))
            .await;

        let change = rx.recv().await.unwrap();
        assert_eq!(change.table, Table::RoomPlayers);
        assert_eq!(change.room_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        ChangeFeed::local()
            .publish(Change::new(Table::Players, ChangeKind::Update, "x"))
            .await;
    }

    #[test]
    fn own_echoes_are_ignored() {
        let feed = ChangeFeed::local();
        let other = ChangeFeed::local();
        let change = Change::new(Table::GameRooms, ChangeKind::Delete, "r9");

        let mine = serde_json::to_string(&Envelope {
            origin: feed.origin.clone(),
            change: change.clone(),
        })
        .unwrap();
        let theirs = serde_json::to_string(&Envelope {
            origin: other.origin.clone(),
            change: change.clone(),
        })
        .unwrap();

        assert_eq!(feed.accept(&mine), None);
        assert_eq!(feed.accept(&theirs), Some(change));
        assert_eq!(feed.accept("{not json"), None);
    }

    #[test]
    fn relay_needs_redis() {
        assert!(ChangeFeed::local().spawn_relay().is_none());
    }
}
