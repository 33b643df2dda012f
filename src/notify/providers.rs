use super::Kind;
use async_trait::async_trait;

/// Push delivery backend. Token validity was checked by the dispatcher;
/// implementations only talk to their provider.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn push(
        &self,
        token: &str,
        kind: Kind,
        payload: &serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// Email delivery backend, only ever handed high-value kinds.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn email(
        &self,
        address: &str,
        kind: Kind,
        payload: &serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// Log-only backend for development and tests.
pub struct LogDelivery;

#[async_trait]
impl PushProvider for LogDelivery {
    async fn push(&self, token: &str, kind: Kind, _: &serde_json::Value) -> anyhow::Result<()> {
        log::info!("[push] {} -> {}", kind, &token[..token.len().min(24)]);
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for LogDelivery {
    async fn email(&self, address: &str, kind: Kind, _: &serde_json::Value) -> anyhow::Result<()> {
        log::info!("[email] {} ({}) -> {}", kind.title(), kind, address);
        Ok(())
    }
}
