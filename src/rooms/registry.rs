use super::RoomKey;
use crate::duel::PlayerId;
use crate::duel::Reject;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;

type Tx = UnboundedSender<String>;

/// Handle for detaching one socket from the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketId(u64);

/// In-process room membership and socket fan-out.
///
/// Join-if-capacity happens under one lock, so concurrent joins can never
/// overshoot within this instance; cross-instance capacity is the shared
/// store's job. Sockets are instance-local by nature.
pub struct Registry {
    rooms: RwLock<HashMap<RoomKey, HashSet<PlayerId>>>,
    sockets: RwLock<HashMap<PlayerId, HashMap<SocketId, Tx>>>,
    count: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            sockets: RwLock::new(HashMap::new()),
            count: AtomicU64::new(1),
        }
    }
}

impl Registry {
    /// Atomic check-and-add. `enforce` is off when a shared store already
    /// admitted the member and this is just the local mirror.
    pub(crate) async fn admit(
        &self,
        key: &RoomKey,
        user: PlayerId,
        enforce: bool,
    ) -> Result<(), Reject> {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(key.clone()).or_default();
        if members.contains(&user) {
            return Ok(());
        }
        if enforce {
            if let Some(cap) = key.capacity() {
                if members.len() >= cap {
                    return Err(Reject::RoomFull);
                }
            }
        }
        members.insert(user);
        log::debug!("[room {}] join {} ({} members)", key, user, members.len());
        Ok(())
    }
    pub async fn join(&self, key: &RoomKey, user: PlayerId) -> Result<(), Reject> {
        self.admit(key, user, true).await
    }
    /// Remove membership; empty rooms are deleted.
    pub async fn leave(&self, key: &RoomKey, user: PlayerId) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(key) {
            members.remove(&user);
            if members.is_empty() {
                rooms.remove(key);
                log::debug!("[room {}] empty, dropped", key);
            }
        }
    }
    pub async fn members(&self, key: &RoomKey) -> Vec<PlayerId> {
        self.rooms
            .read()
            .await
            .get(key)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }
    /// Register a socket's outbound channel for direct delivery.
    pub async fn attach(&self, user: PlayerId, tx: Tx) -> SocketId {
        let id = SocketId(self.count.fetch_add(1, Ordering::Relaxed));
        self.sockets.write().await.entry(user).or_default().insert(id, tx);
        id
    }
    pub async fn detach(&self, user: PlayerId, id: SocketId) {
        let mut sockets = self.sockets.write().await;
        if let Some(txs) = sockets.get_mut(&user) {
            txs.remove(&id);
            if txs.is_empty() {
                sockets.remove(&user);
            }
        }
    }
    /// Deliver to every member of the room, optionally skipping the actor.
    pub async fn broadcast(&self, key: &RoomKey, json: &str, exclude: Option<PlayerId>) {
        let members = self.members(key).await;
        let sockets = self.sockets.read().await;
        for member in members {
            if Some(member) == exclude {
                continue;
            }
            if let Some(txs) = sockets.get(&member) {
                for tx in txs.values() {
                    let _ = tx.send(json.to_string());
                }
            }
        }
    }
    /// Every user has an implicit user room: direct delivery is just a
    /// send to their sockets.
    pub async fn send_to_user(&self, user: PlayerId, json: &str) {
        if let Some(txs) = self.sockets.read().await.get(&user) {
            for tx in txs.values() {
                let _ = tx.send(json.to_string());
            }
        }
    }
    /// Drop channels whose receiving task is gone.
    pub async fn prune(&self) {
        let mut sockets = self.sockets.write().await;
        sockets.retain(|_, txs| {
            txs.retain(|_, tx| !tx.is_closed());
            !txs.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_respects_capacity() {
        let registry = Registry::default();
        let key = RoomKey::battle("g1");
        assert!(registry.join(&key, PlayerId::default()).await.is_ok());
        assert!(registry.join(&key, PlayerId::default()).await.is_ok());
        assert_eq!(
            registry.join(&key, PlayerId::default()).await.unwrap_err(),
            Reject::RoomFull
        );
        assert_eq!(registry.members(&key).await.len(), 2);
    }
    #[tokio::test]
    async fn join_is_idempotent_per_user() {
        let registry = Registry::default();
        let key = RoomKey::battle("g1");
        let user = PlayerId::default();
        assert!(registry.join(&key, user).await.is_ok());
        assert!(registry.join(&key, user).await.is_ok());
        assert_eq!(registry.members(&key).await.len(), 1);
    }
    #[tokio::test]
    async fn concurrent_joins_never_overshoot() {
        use std::sync::Arc;
        let registry = Arc::new(Registry::default());
        let key = RoomKey::game("jam");
        let joins: Vec<_> = (0..32)
            .map(|_| {
                let registry = registry.clone();
                let key = key.clone();
                tokio::spawn(async move { registry.join(&key, PlayerId::default()).await })
            })
            .collect();
        let mut admitted = 0;
        for join in joins {
            if join.await.unwrap().is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 8);
        assert_eq!(registry.members(&key).await.len(), 8);
    }
    #[tokio::test]
    async fn empty_rooms_are_deleted() {
        let registry = Registry::default();
        let key = RoomKey::spot("embarcadero");
        let user = PlayerId::default();
        registry.join(&key, user).await.unwrap();
        registry.leave(&key, user).await;
        assert!(registry.rooms.read().await.is_empty());
    }
    #[tokio::test]
    async fn broadcast_skips_the_excluded_actor() {
        let registry = Registry::default();
        let key = RoomKey::game("jam");
        let (a, b) = (PlayerId::default(), PlayerId::default());
        let (tx_a, mut rx_a) = tokio::sync::mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = tokio::sync::mpsc::unbounded_channel();
        registry.attach(a, tx_a).await;
        registry.attach(b, tx_b).await;
        registry.join(&key, a).await.unwrap();
        registry.join(&key, b).await.unwrap();
        registry.broadcast(&key, "{\"type\":\"x\"}", Some(a)).await;
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "{\"type\":\"x\"}");
    }
}
