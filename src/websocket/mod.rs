use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

use chat_events::ChannelEvent;

pub mod session;

/// Unique identifier for one WebSocket connection.
///
/// Captured by the session at connect time; disconnect only removes the
/// registry entry when it still carries this id, so a stale disconnect can
/// never delete a newer device's mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Connection {
    id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// Process-wide presence registry: user id → live connection.
///
/// At most one live connection per user; a second device connecting for
/// the same user silently overwrites the mapping. The prior connection is
/// not force-closed (known limitation — its frames simply stop resolving).
/// Frames pushed to one connection are delivered in send order.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Connection>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`, returning its id and the frame
    /// receiver. Broadcasts the updated online set to everyone.
    pub async fn connect(&self, user_id: Uuid) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let connection_id = ConnectionId::new();

        {
            let mut guard = self.inner.write().await;
            let previous = guard.insert(
                user_id,
                Connection {
                    id: connection_id,
                    sender: tx,
                },
            );
            if previous.is_some() {
                tracing::debug!(user_id = %user_id, "connection overwritten by newer device");
            }
        }

        tracing::info!(user_id = %user_id, "user connected");
        self.broadcast_presence().await;
        (connection_id, rx)
    }

    /// Remove the mapping for `user_id` — only if it still points at
    /// `connection_id`. Broadcasts the updated online set when it does.
    pub async fn disconnect(&self, user_id: Uuid, connection_id: ConnectionId) {
        let removed = {
            let mut guard = self.inner.write().await;
            match guard.get(&user_id) {
                Some(current) if current.id == connection_id => {
                    guard.remove(&user_id);
                    true
                }
                _ => false,
            }
        };

        if removed {
            tracing::info!(user_id = %user_id, "user disconnected");
            self.broadcast_presence().await;
        } else {
            tracing::debug!(user_id = %user_id, "stale disconnect ignored");
        }
    }

    /// The live connection for `user_id`, if any.
    pub async fn resolve(&self, user_id: Uuid) -> Option<ConnectionId> {
        self.inner.read().await.get(&user_id).map(|c| c.id)
    }

    pub async fn online_users(&self) -> Vec<Uuid> {
        self.inner.read().await.keys().copied().collect()
    }

    /// Push one frame to `user_id`'s connection. Returns false on a
    /// presence miss — never an error, the message stays durable and
    /// surfaces on the next history fetch.
    pub async fn send_to_user(&self, user_id: Uuid, frame: String) -> bool {
        let guard = self.inner.read().await;
        match guard.get(&user_id) {
            Some(connection) => connection.sender.send(frame).is_ok(),
            None => false,
        }
    }

    /// Push one frame to every live connection, dropping dead senders.
    pub async fn broadcast(&self, frame: String) {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, connection| connection.sender.send(frame.clone()).is_ok());
        let after = guard.len();
        if before != after {
            tracing::debug!("broadcast cleaned up {} dead connections", before - after);
        }
    }

    async fn broadcast_presence(&self) {
        let frame = ChannelEvent::PresenceChanged {
            online_user_ids: self.online_users().await,
        }
        .to_frame();
        self.broadcast(frame).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_device_overwrites_and_stale_disconnect_is_ignored() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();

        let (first, _rx1) = registry.connect(user).await;
        let (second, _rx2) = registry.connect(user).await;
        assert_eq!(registry.online_users().await, vec![user]);
        assert_eq!(registry.resolve(user).await, Some(second));

        registry.disconnect(user, first).await;
        assert_eq!(
            registry.resolve(user).await,
            Some(second),
            "stale disconnect must not delete the newer mapping"
        );

        registry.disconnect(user, second).await;
        assert_eq!(registry.resolve(user).await, None);
    }

    #[tokio::test]
    async fn connect_broadcasts_the_full_online_set() {
        let registry = PresenceRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (_, mut alice_rx) = registry.connect(alice).await;
        // alice hears her own presence broadcast
        let frame = alice_rx.recv().await.unwrap();
        assert!(frame.contains("presenceChanged"));

        registry.connect(bob).await;
        let frame = alice_rx.recv().await.unwrap();
        assert!(frame.contains(&bob.to_string()));
        assert!(frame.contains(&alice.to_string()));
    }

    #[tokio::test]
    async fn frames_arrive_in_send_order() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let (_, mut rx) = registry.connect(user).await;
        rx.recv().await.unwrap(); // presence frame

        for i in 0..10 {
            registry.send_to_user(user, format!("frame-{i}")).await;
        }
        for i in 0..10 {
            assert_eq!(rx.recv().await.unwrap(), format!("frame-{i}"));
        }
    }

    #[tokio::test]
    async fn send_to_offline_user_is_a_presence_miss() {
        let registry = PresenceRegistry::new();
        assert!(!registry.send_to_user(Uuid::new_v4(), "frame".into()).await);
    }
}
