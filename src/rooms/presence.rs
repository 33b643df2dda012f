use crate::duel::PlayerId;
use crate::live::PresenceStatus;
use crate::pg::*;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_postgres::Client;

/// Per-user presence row, authoritative across instances. TTL-refreshed
/// by socket activity; the reconciler demotes stale rows to offline.
#[derive(Debug, Clone)]
pub struct Presence {
    pub user: PlayerId,
    pub status: PresenceStatus,
    pub last_seen: SystemTime,
}

impl Schema for Presence {
    fn name() -> &'static str {
        PRESENCE
    }
    fn columns() -> &'static [tokio_postgres::types::Type] {
        &[
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::TIMESTAMPTZ,
        ]
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            PRESENCE,
            " (
                user_id     UUID PRIMARY KEY,
                status      TEXT NOT NULL,
                last_seen   TIMESTAMPTZ NOT NULL
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_presence_seen ON ",
            PRESENCE,
            " (last_seen);"
        )
    }
}

/// Presence operations on the shared store.
#[allow(async_fn_in_trait)]
pub trait PresenceStore {
    async fn set_presence(&self, user: PlayerId, status: PresenceStatus) -> Result<(), PgErr>;
    /// Activity heartbeat: refresh last_seen without touching status.
    async fn touch_presence(&self, user: PlayerId) -> Result<(), PgErr>;
    async fn presence(&self, user: PlayerId) -> Result<Option<Presence>, PgErr>;
    /// Demote online/away rows whose TTL lapsed; returns how many.
    async fn demote_stale_presence(&self, ttl_secs: f64) -> Result<u64, PgErr>;
}

impl PresenceStore for Arc<Client> {
    async fn set_presence(&self, user: PlayerId, status: PresenceStatus) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                PRESENCE,
                " (user_id, status, last_seen) VALUES ($1, $2, now())
                  ON CONFLICT (user_id) DO UPDATE SET status = $2, last_seen = now()"
            ),
            &[&user.inner(), &status.as_str()],
        )
        .await
        .map(|_| ())
    }

    async fn touch_presence(&self, user: PlayerId) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PRESENCE,
                " SET last_seen = now() WHERE user_id = $1"
            ),
            &[&user.inner()],
        )
        .await
        .map(|_| ())
    }

    async fn presence(&self, user: PlayerId) -> Result<Option<Presence>, PgErr> {
        Ok(self
            .query_opt(
                const_format::concatcp!(
                    "SELECT user_id, status, last_seen FROM ",
                    PRESENCE,
                    " WHERE user_id = $1"
                ),
                &[&user.inner()],
            )
            .await?
            .and_then(|row| {
                Some(Presence {
                    user: PlayerId::from(row.get::<_, uuid::Uuid>(0)),
                    status: PresenceStatus::try_from(row.get::<_, &str>(1)).ok()?,
                    last_seen: row.get(2),
                })
            }))
    }

    async fn demote_stale_presence(&self, ttl_secs: f64) -> Result<u64, PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PRESENCE,
                " SET status = 'offline'
                  WHERE status <> 'offline'
                    AND last_seen < now() - make_interval(secs => $1)"
            ),
            &[&ttl_secs],
        )
        .await
    }
}
