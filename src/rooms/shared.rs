use super::RoomKey;
use crate::duel::PlayerId;
use crate::pg::*;
use std::sync::Arc;
use tokio_postgres::Client;

/// Room membership rows shared across server instances. Lazily created on
/// first join, TTL-refreshed on activity, deleted when empty.
pub struct SharedRooms;

/// Rooms live this long past their last activity.
pub const ROOM_TTL_SECS: f64 = 3_600.0;

impl Schema for SharedRooms {
    fn name() -> &'static str {
        ROOMS
    }
    fn columns() -> &'static [tokio_postgres::types::Type] {
        &[
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::UUID_ARRAY,
            tokio_postgres::types::Type::INT4,
            tokio_postgres::types::Type::TIMESTAMPTZ,
        ]
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            ROOMS,
            " (
                key         TEXT PRIMARY KEY,
                members     UUID[] NOT NULL DEFAULT '{}',
                capacity    INTEGER NOT NULL,
                expires_at  TIMESTAMPTZ NOT NULL
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_rooms_expiry ON ",
            ROOMS,
            " (expires_at);"
        )
    }
}

/// Shared-store membership operations. The join is a single guarded
/// upsert, so two instances racing on the last slot cannot both win.
#[allow(async_fn_in_trait)]
pub trait RoomStore {
    /// Check-and-add in one statement; Ok(false) means the room was full.
    async fn join_room(&self, key: &RoomKey, user: PlayerId) -> Result<bool, PgErr>;
    async fn leave_room(&self, key: &RoomKey, user: PlayerId) -> Result<(), PgErr>;
    async fn room_members(&self, key: &RoomKey) -> Result<Vec<PlayerId>, PgErr>;
    /// Drop rooms whose TTL lapsed; returns how many went.
    async fn expire_rooms(&self) -> Result<u64, PgErr>;
}

impl RoomStore for Arc<Client> {
    async fn join_room(&self, key: &RoomKey, user: PlayerId) -> Result<bool, PgErr> {
        // capacity 0 encodes unbounded
        let capacity = key.capacity().unwrap_or(0) as i32;
        let row = self
            .query_one(
                const_format::concatcp!(
                    "INSERT INTO ",
                    ROOMS,
                    " (key, members, capacity, expires_at)
                      VALUES ($1, ARRAY[$2]::uuid[], $3, now() + make_interval(secs => $4))
                      ON CONFLICT (key) DO UPDATE SET
                        members = CASE
                            WHEN ",
                    ROOMS,
                    ".members @> ARRAY[$2]::uuid[] THEN ",
                    ROOMS,
                    ".members
                            WHEN $3 = 0 OR cardinality(",
                    ROOMS,
                    ".members) < $3 THEN array_append(",
                    ROOMS,
                    ".members, $2)
                            ELSE ",
                    ROOMS,
                    ".members
                        END,
                        expires_at = now() + make_interval(secs => $4)
                      RETURNING members @> ARRAY[$2]::uuid[] AS joined"
                ),
                &[
                    &key.to_string(),
                    &user.inner(),
                    &capacity,
                    &ROOM_TTL_SECS,
                ],
            )
            .await?;
        Ok(row.get::<_, bool>(0))
    }

    async fn leave_room(&self, key: &RoomKey, user: PlayerId) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                ROOMS,
                " SET members = array_remove(members, $2) WHERE key = $1"
            ),
            &[&key.to_string(), &user.inner()],
        )
        .await?;
        self.execute(
            const_format::concatcp!(
                "DELETE FROM ",
                ROOMS,
                " WHERE key = $1 AND cardinality(members) = 0"
            ),
            &[&key.to_string()],
        )
        .await
        .map(|_| ())
    }

    async fn room_members(&self, key: &RoomKey) -> Result<Vec<PlayerId>, PgErr> {
        Ok(self
            .query_opt(
                const_format::concatcp!("SELECT members FROM ", ROOMS, " WHERE key = $1"),
                &[&key.to_string()],
            )
            .await?
            .map(|row| {
                row.get::<_, Vec<uuid::Uuid>>(0)
                    .into_iter()
                    .map(PlayerId::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn expire_rooms(&self) -> Result<u64, PgErr> {
        self.execute(
            const_format::concatcp!("DELETE FROM ", ROOMS, " WHERE expires_at < now()"),
            &[],
        )
        .await
    }
}
