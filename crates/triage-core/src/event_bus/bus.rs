//! Push side of the WebSocket/SSE surface (C8, `spec.md` §4.8).
//!
//! Three routing tables — all connections, by user id, by role — are
//! consulted by [`EventBus::send`] before publishing to each matching
//! connection's outbound channel. Delivery is best-effort: a send that
//! fails because a connection's receiver was dropped just drops that one
//! connection, the same isolation guarantee
//! `weavegraph::event_bus::EventBus`'s per-sink worker tasks give broadcast
//! subscribers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::debug;

use crate::domain::Role;

use super::event::{Envelope, InboundFrame};

/// Opaque handle identifying one connected subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

/// Delivery scope for [`EventBus::send`].
#[derive(Debug, Clone)]
pub enum Target {
    All,
    User(uuid::Uuid),
    Role(Role),
}

struct Connection {
    sender: flume::Sender<Envelope>,
    user_id: Option<uuid::Uuid>,
    role: Option<Role>,
    /// `None` means "subscribed to everything" (the default on connect).
    subscriptions: Option<HashSet<String>>,
}

pub struct EventBus {
    next_id: AtomicU64,
    connections: RwLock<FxHashMap<ConnectionId, Connection>>,
    by_user: RwLock<FxHashMap<uuid::Uuid, HashSet<ConnectionId>>>,
    by_role: RwLock<FxHashMap<Role, HashSet<ConnectionId>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            connections: RwLock::new(FxHashMap::default()),
            by_user: RwLock::new(FxHashMap::default()),
            by_role: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a new subscriber and return its id plus the receiving end
    /// of its outbound channel (`WS /ws/events?user_id=...&role=...`,
    /// `spec.md` §6).
    pub fn connect(
        &self,
        user_id: Option<uuid::Uuid>,
        role: Option<Role>,
    ) -> (ConnectionId, flume::Receiver<Envelope>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = flume::unbounded();
        self.connections.write().insert(
            id,
            Connection {
                sender,
                user_id,
                role,
                subscriptions: None,
            },
        );
        if let Some(uid) = user_id {
            self.by_user.write().entry(uid).or_default().insert(id);
        }
        if let Some(role) = role {
            self.by_role.write().entry(role).or_default().insert(id);
        }
        (id, receiver)
    }

    pub fn disconnect(&self, id: ConnectionId) {
        let Some(conn) = self.connections.write().remove(&id) else {
            return;
        };
        if let Some(uid) = conn.user_id {
            if let Some(set) = self.by_user.write().get_mut(&uid) {
                set.remove(&id);
            }
        }
        if let Some(role) = conn.role {
            if let Some(set) = self.by_role.write().get_mut(&role) {
                set.remove(&id);
            }
        }
    }

    /// Broadcast `event_type`/`data` to every connection matching `target`
    /// and subscribed to `event_type` (or to everything). Returns the
    /// number of connections the envelope was handed to.
    pub fn send(&self, event_type: &str, data: Value, target: Target) -> usize {
        let envelope = Envelope::new(event_type, data);
        let ids = self.resolve_target(&target);
        let connections = self.connections.read();
        let mut delivered = 0;
        for id in ids {
            let Some(conn) = connections.get(&id) else {
                continue;
            };
            if let Some(filter) = &conn.subscriptions {
                if !filter.contains(event_type) {
                    continue;
                }
            }
            if conn.sender.send(envelope.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!(?id, "event bus send failed, connection dropped silently");
            }
        }
        delivered
    }

    /// Handle an inbound client frame. Pings get an immediate pong; a
    /// subscribe request narrows future delivery and is acknowledged with
    /// `subscription_confirmed`. Both replies are delivered only to the
    /// originating connection.
    pub fn handle_inbound(&self, id: ConnectionId, frame: InboundFrame) {
        match frame {
            InboundFrame::Ping => {
                if let Some(conn) = self.connections.read().get(&id) {
                    let _ = conn.sender.send(Envelope::pong());
                }
            }
            InboundFrame::Subscribe { event_types } => {
                let mut connections = self.connections.write();
                if let Some(conn) = connections.get_mut(&id) {
                    conn.subscriptions = Some(event_types.iter().cloned().collect());
                    let _ = conn.sender.send(Envelope::subscription_confirmed(&event_types));
                }
            }
        }
    }

    fn resolve_target(&self, target: &Target) -> Vec<ConnectionId> {
        match target {
            Target::All => self.connections.read().keys().copied().collect(),
            Target::User(uid) => self
                .by_user
                .read()
                .get(uid)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
            Target::Role(role) => self
                .by_role
                .read()
                .get(role)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_to_role_reaches_only_that_role() {
        let bus = EventBus::new();
        let (_reviewer_id, reviewer_rx) = bus.connect(None, Some(Role::Reviewer));
        let (_admin_id, admin_rx) = bus.connect(None, Some(Role::Admin));

        let delivered = bus.send("review:queued", json!({"doc_id": "x"}), Target::Role(Role::Reviewer));
        assert_eq!(delivered, 1);
        assert!(reviewer_rx.try_recv().is_ok());
        assert!(admin_rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_removes_from_all_tables() {
        let bus = EventBus::new();
        let user_id = uuid::Uuid::new_v4();
        let (id, _rx) = bus.connect(Some(user_id), Some(Role::User));
        bus.disconnect(id);
        assert_eq!(bus.send("check:completed", json!({}), Target::User(user_id)), 0);
    }

    #[test]
    fn ping_gets_pong() {
        let bus = EventBus::new();
        let (id, rx) = bus.connect(None, None);
        bus.handle_inbound(id, InboundFrame::Ping);
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.event_type, "pong");
    }

    #[test]
    fn subscribe_narrows_delivery() {
        let bus = EventBus::new();
        let (id, rx) = bus.connect(None, None);
        bus.handle_inbound(
            id,
            InboundFrame::Subscribe {
                event_types: vec!["ingest:completed".to_string()],
            },
        );
        // Drain the subscription_confirmed reply.
        let confirm = rx.try_recv().unwrap();
        assert_eq!(confirm.event_type, "subscription_confirmed");

        bus.send("review:queued", json!({}), Target::All);
        assert!(rx.try_recv().is_err(), "unsubscribed event type should not be delivered");

        bus.send("ingest:completed", json!({}), Target::All);
        assert!(rx.try_recv().is_ok());
    }
}
