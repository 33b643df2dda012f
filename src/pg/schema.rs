use super::PgErr;
use tokio_postgres::Client;

/// Table metadata and DDL generation. Implemented next to each persisted
/// entity so the schema lives with the type it stores.
pub trait Schema {
    /// Table name.
    fn name() -> &'static str;
    /// Column types in DDL order.
    fn columns() -> &'static [tokio_postgres::types::Type];
    /// CREATE TABLE IF NOT EXISTS statement.
    fn creates() -> &'static str;
    /// CREATE INDEX IF NOT EXISTS statements.
    fn indices() -> &'static str;
}

async fn ensure<S: Schema>(db: &Client) -> Result<(), PgErr> {
    db.batch_execute(S::creates()).await?;
    let indices = S::indices();
    if !indices.is_empty() {
        db.batch_execute(indices).await?;
    }
    log::debug!("[migrate] ensured table {}", S::name());
    Ok(())
}

/// Bootstrap every table and index. Idempotent; the server binary runs it
/// on startup before accepting traffic.
pub async fn migrate(db: &Client) -> Result<(), PgErr> {
    ensure::<crate::duel::Profile>(db).await?;
    ensure::<crate::duel::Game>(db).await?;
    ensure::<crate::duel::Turn>(db).await?;
    ensure::<crate::duel::Dispute>(db).await?;
    ensure::<crate::live::LiveSession>(db).await?;
    ensure::<crate::notify::Notification>(db).await?;
    ensure::<crate::rooms::SharedRooms>(db).await?;
    ensure::<crate::rooms::Presence>(db).await?;
    log::info!("[migrate] schema up to date");
    Ok(())
}
