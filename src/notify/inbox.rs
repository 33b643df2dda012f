use super::Kind;
use crate::ID;
use crate::Unique;
use crate::duel::PlayerId;
use crate::pg::*;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_postgres::Client;

/// Persisted in-app notification. Written regardless of quiet hours
/// whenever in-app delivery is enabled.
#[derive(Debug, Clone)]
pub struct Notification {
    id: ID<Self>,
    user: PlayerId,
    kind: Kind,
    payload: serde_json::Value,
    read: bool,
    created_at: SystemTime,
}

impl Notification {
    pub fn new(user: PlayerId, kind: Kind, payload: serde_json::Value, now: SystemTime) -> Self {
        Self {
            id: ID::default(),
            user,
            kind,
            payload,
            read: false,
            created_at: now,
        }
    }
    pub fn user(&self) -> PlayerId {
        self.user
    }
    pub fn kind(&self) -> Kind {
        self.kind
    }
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
    pub fn read(&self) -> bool {
        self.read
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
}

impl Unique for Notification {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Schema for Notification {
    fn name() -> &'static str {
        NOTIFICATIONS
    }
    fn columns() -> &'static [tokio_postgres::types::Type] {
        &[
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::UUID,
            tokio_postgres::types::Type::TEXT,
            tokio_postgres::types::Type::JSONB,
            tokio_postgres::types::Type::BOOL,
            tokio_postgres::types::Type::TIMESTAMPTZ,
        ]
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            NOTIFICATIONS,
            " (
                id          UUID PRIMARY KEY,
                user_id     UUID NOT NULL,
                kind        TEXT NOT NULL,
                payload     JSONB NOT NULL,
                read        BOOLEAN NOT NULL DEFAULT FALSE,
                created_at  TIMESTAMPTZ NOT NULL
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_notifications_user ON ",
            NOTIFICATIONS,
            " (user_id, created_at DESC);"
        )
    }
}

/// In-app store operations.
#[allow(async_fn_in_trait)]
pub trait Inbox {
    async fn deposit(&self, notification: &Notification) -> Result<(), PgErr>;
}

impl Inbox for Arc<Client> {
    async fn deposit(&self, notification: &Notification) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                NOTIFICATIONS,
                " (id, user_id, kind, payload, read, created_at) VALUES ($1, $2, $3, $4, $5, $6)"
            ),
            &[
                &notification.id().inner(),
                &notification.user().inner(),
                &notification.kind().as_str(),
                &notification.payload(),
                &notification.read(),
                &notification.created_at(),
            ],
        )
        .await
        .map(|_| ())
    }
}
