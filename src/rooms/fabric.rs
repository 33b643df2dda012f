use super::Registry;
use super::RoomKey;
use super::RoomStore;
use super::SocketId;
use crate::duel::PlayerId;
use crate::duel::Reject;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_postgres::Client;

/// The room/broadcast fabric: shared-store membership for cross-instance
/// capacity, in-process registry for socket delivery.
///
/// When the shared store errors, joins degrade to the local registry.
/// Correctness is best-effort in that mode; session state itself is never
/// at risk because every mutation still goes through the gateway.
pub struct Fabric {
    registry: Registry,
    shared: Option<Arc<Client>>,
}

impl Fabric {
    pub fn local() -> Self {
        Self {
            registry: Registry::default(),
            shared: None,
        }
    }
    pub fn shared(db: Arc<Client>) -> Self {
        Self {
            registry: Registry::default(),
            shared: Some(db),
        }
    }
    /// Atomic join-if-capacity. The shared store arbitrates when present;
    /// the local mirror then admits unconditionally.
    pub async fn join(&self, key: &RoomKey, user: PlayerId) -> Result<(), Reject> {
        match &self.shared {
            Some(db) => match db.join_room(key, user).await {
                Ok(true) => self.registry.admit(key, user, false).await,
                Ok(false) => Err(Reject::RoomFull),
                Err(e) => {
                    log::warn!("[room {}] shared store unavailable, local join: {}", key, e);
                    self.registry.join(key, user).await
                }
            },
            None => self.registry.join(key, user).await,
        }
    }
    pub async fn leave(&self, key: &RoomKey, user: PlayerId) {
        if let Some(db) = &self.shared {
            if let Err(e) = db.leave_room(key, user).await {
                log::warn!("[room {}] shared store leave failed: {}", key, e);
            }
        }
        self.registry.leave(key, user).await;
    }
    pub async fn members(&self, key: &RoomKey) -> Vec<PlayerId> {
        if let Some(db) = &self.shared {
            match db.room_members(key).await {
                Ok(members) => return members,
                Err(e) => log::warn!("[room {}] shared store read failed: {}", key, e),
            }
        }
        self.registry.members(key).await
    }
    /// Delivery is per-instance: whatever members are reachable through
    /// local sockets get the payload.
    pub async fn broadcast(&self, key: &RoomKey, json: &str, exclude: Option<PlayerId>) {
        self.registry.broadcast(key, json, exclude).await;
    }
    pub async fn send_to_user(&self, user: PlayerId, json: &str) {
        self.registry.send_to_user(user, json).await;
    }
    pub async fn attach(&self, user: PlayerId, tx: UnboundedSender<String>) -> SocketId {
        self.registry.attach(user, tx).await
    }
    pub async fn detach(&self, user: PlayerId, id: SocketId) {
        self.registry.detach(user, id).await;
    }
    pub async fn prune(&self) {
        self.registry.prune().await;
        if let Some(db) = &self.shared {
            match db.expire_rooms().await {
                Ok(0) => {}
                Ok(n) => log::info!("[rooms] expired {} stale rooms", n),
                Err(e) => log::warn!("[rooms] expiry sweep failed: {}", e),
            }
        }
    }
}
