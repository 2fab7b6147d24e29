//! Event Bus (L5, spec §4.10): `connect`/`subscribe`/`send_to_mission`/
//! `send_to_session`/`send_to_user`/`disconnect`, plus the single-active-
//! connection invariant and the 30s heartbeat / 120s timeout.
//!
//! Grounded on `llmspell-events/src/bus.rs`'s pub/sub shape (`DashMap`
//! pattern subscriptions, a `Subscription` record, `mpsc` per-subscriber
//! channels). The teacher's bus has no connection-identity concept at all
//! (it routes by glob pattern over a flat event stream); the
//! `(user_id, scope, session_id?)` single-active-connection invariant and
//! the heartbeat task are new, built to satisfy spec §4.10 directly.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use maestro_core::events::EventSink;

use crate::event::{EventKind, EventScope, MaestroEvent};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(120);

/// Which of the three WebSocket endpoints (spec §6) a connection belongs
/// to: `…/ws/research`, `…/ws/documents/{user_id}`, `…/ws/{writing_session_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionScope {
    Research,
    Documents,
    Writing,
}

/// A message pushed down a connection's outgoing channel: either a
/// domain event or a bare heartbeat ping (heartbeats are not part of the
/// spec §4.10 event-kind enumeration, so they travel out-of-band).
#[derive(Debug, Clone)]
pub enum OutgoingMessage {
    Event(MaestroEvent),
    Heartbeat,
}

struct Connection {
    id: Uuid,
    user_id: String,
    scope: ConnectionScope,
    session_id: Option<String>,
    sender: mpsc::UnboundedSender<OutgoingMessage>,
    last_heartbeat_ack: parking_lot::RwLock<DateTime<Utc>>,
    mission_subs: parking_lot::RwLock<HashSet<String>>,
    session_subs: parking_lot::RwLock<HashSet<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("unknown connection {0}")]
    UnknownConnection(Uuid),
}

type ConnectionKey = (String, ConnectionScope, Option<String>);

/// Process-wide pub/sub hub. All subscription state lives here; the
/// WebSocket transport (`transport.rs`) only translates wire frames to and
/// from these calls (Design Notes §9).
pub struct EventBus {
    connections: Arc<DashMap<Uuid, Arc<Connection>>>,
    by_tuple: Arc<DashMap<ConnectionKey, Uuid>>,
    mission_index: Arc<DashMap<String, HashSet<Uuid>>>,
    session_index: Arc<DashMap<String, HashSet<Uuid>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            by_tuple: Arc::new(DashMap::new()),
            mission_index: Arc::new(DashMap::new()),
            session_index: Arc::new(DashMap::new()),
        }
    }

    /// Establish a connection, closing any existing connection with a
    /// matching `(user_id, scope, session_id?)` tuple first (spec §4.10's
    /// "establishing a new connection with matching tuple closes the
    /// older one"). Returns the new connection id and its outgoing
    /// message receiver; the caller (the WebSocket transport) drains the
    /// receiver onto the socket and calls `heartbeat_ack`/`disconnect` in
    /// response to wire events.
    pub fn connect(
        &self,
        user_id: &str,
        scope: ConnectionScope,
        session_id: Option<String>,
    ) -> (Uuid, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let key: ConnectionKey = (user_id.to_string(), scope, session_id.clone());
        if let Some((_, old_id)) = self.by_tuple.remove(&key) {
            debug!(%old_id, "closing superseded connection for matching tuple");
            self.disconnect(old_id);
        }

        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection = Arc::new(Connection {
            id,
            user_id: user_id.to_string(),
            scope,
            session_id,
            sender,
            last_heartbeat_ack: parking_lot::RwLock::new(Utc::now()),
            mission_subs: parking_lot::RwLock::new(HashSet::new()),
            session_subs: parking_lot::RwLock::new(HashSet::new()),
        });
        self.connections.insert(id, connection);
        self.by_tuple.insert(key, id);
        (id, receiver)
    }

    /// Subscribe a connection to a mission or a writing session's updates.
    pub fn subscribe_mission(&self, connection_id: Uuid, mission_id: &str) -> Result<(), BusError> {
        let connection = self.connection(connection_id)?;
        connection.mission_subs.write().insert(mission_id.to_string());
        self.mission_index.entry(mission_id.to_string()).or_default().insert(connection_id);
        Ok(())
    }

    pub fn subscribe_session(&self, connection_id: Uuid, session_id: &str) -> Result<(), BusError> {
        let connection = self.connection(connection_id)?;
        connection.session_subs.write().insert(session_id.to_string());
        self.session_index.entry(session_id.to_string()).or_default().insert(connection_id);
        Ok(())
    }

    pub fn unsubscribe_mission(&self, connection_id: Uuid, mission_id: &str) {
        if let Some(connection) = self.connections.get(&connection_id) {
            connection.mission_subs.write().remove(mission_id);
        }
        if let Some(mut set) = self.mission_index.get_mut(mission_id) {
            set.remove(&connection_id);
        }
    }

    /// Deliver to every connection subscribed to `mission_id`.
    pub fn send_to_mission(&self, mission_id: &str, kind: EventKind, data: serde_json::Value) {
        let event = MaestroEvent::new(kind, EventScope::Mission { mission_id: mission_id.to_string() }, data);
        let Some(subscribers) = self.mission_index.get(mission_id) else {
            return;
        };
        for connection_id in subscribers.iter() {
            self.deliver(*connection_id, event.clone());
        }
    }

    /// Deliver to every connection subscribed to `session_id` (a writing
    /// session, spec §4.10/§6).
    pub fn send_to_session(&self, session_id: &str, kind: EventKind, data: serde_json::Value) {
        let event = MaestroEvent::new(kind, EventScope::Session { session_id: session_id.to_string() }, data);
        let Some(subscribers) = self.session_index.get(session_id) else {
            return;
        };
        for connection_id in subscribers.iter() {
            self.deliver(*connection_id, event.clone());
        }
    }

    /// Deliver to every connection opened by `user_id`, regardless of
    /// mission/session subscriptions (spec §4.10's direct user channel,
    /// e.g. `chat_title_update`).
    pub fn send_to_user(&self, user_id: &str, kind: EventKind, data: serde_json::Value) {
        let event = MaestroEvent::new(kind, EventScope::User { user_id: user_id.to_string() }, data);
        for entry in self.connections.iter() {
            if entry.value().user_id == user_id {
                self.deliver(entry.key().clone(), event.clone());
            }
        }
    }

    fn deliver(&self, connection_id: Uuid, event: MaestroEvent) {
        if let Some(connection) = self.connections.get(&connection_id) {
            if connection.sender.send(OutgoingMessage::Event(event)).is_err() {
                debug!(%connection_id, "dropping dead connection on delivery failure");
                drop(connection);
                self.disconnect(connection_id);
            }
        }
    }

    /// Record a `heartbeat_ack` received from the client (spec §6's
    /// client→server message kinds).
    pub fn heartbeat_ack(&self, connection_id: Uuid) {
        if let Some(connection) = self.connections.get(&connection_id) {
            *connection.last_heartbeat_ack.write() = Utc::now();
        }
    }

    /// Send a heartbeat ping and report whether the connection has
    /// exceeded the 120s timeout (spec §4.10); callers run this on a 30s
    /// tick per connection and disconnect on `true`.
    pub fn tick_heartbeat(&self, connection_id: Uuid) -> bool {
        let Some(connection) = self.connections.get(&connection_id) else {
            return true;
        };
        let elapsed = Utc::now().signed_duration_since(*connection.last_heartbeat_ack.read());
        if elapsed > chrono::Duration::from_std(HEARTBEAT_TIMEOUT).unwrap() {
            warn!(%connection_id, "heartbeat timeout, disconnecting");
            return true;
        }
        let _ = connection.sender.send(OutgoingMessage::Heartbeat);
        false
    }

    pub fn heartbeat_interval() -> Duration {
        HEARTBEAT_INTERVAL
    }

    pub fn disconnect(&self, connection_id: Uuid) {
        if let Some((_, connection)) = self.connections.remove(&connection_id) {
            let key: ConnectionKey = (connection.user_id.clone(), connection.scope, connection.session_id.clone());
            self.by_tuple.remove(&key);
            for mission_id in connection.mission_subs.read().iter() {
                if let Some(mut set) = self.mission_index.get_mut(mission_id) {
                    set.remove(&connection_id);
                }
            }
            for session_id in connection.session_subs.read().iter() {
                if let Some(mut set) = self.session_index.get_mut(session_id) {
                    set.remove(&connection_id);
                }
            }
        }
    }

    fn connection(&self, connection_id: Uuid) -> Result<Arc<Connection>, BusError> {
        self.connections
            .get(&connection_id)
            .map(|entry| entry.value().clone())
            .ok_or(BusError::UnknownConnection(connection_id))
    }
}

/// Lets `maestro-tools` (and later `maestro-research`/`maestro-controller`)
/// emit events without depending on this crate's connection-management
/// surface directly — they only see the narrow `EventSink` seam declared
/// in `maestro-core`.
impl EventSink for EventBus {
    fn emit(&self, event_type: &str, payload: serde_json::Value) {
        let kind = match event_type {
            "web_search_complete" => EventKind::WebSearchComplete,
            "web_search_error" => EventKind::WebSearchError,
            "arxiv_fetch_start" => EventKind::ArxivFetchStart,
            "arxiv_fetch_complete" => EventKind::ArxivFetchComplete,
            other => {
                debug!(event_type = other, "ignoring event with no mission/session target via EventSink");
                return;
            }
        };
        let Some(mission_id) = payload.get("mission_id").and_then(|v| v.as_str()) else {
            debug!(event_type, "dropping event with no mission_id for routing");
            return;
        };
        self.send_to_mission(mission_id, kind, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_with_matching_tuple_closes_the_older_connection() {
        let bus = EventBus::new();
        let (first_id, mut first_rx) = bus.connect("user-1", ConnectionScope::Research, None);
        let (second_id, _second_rx) = bus.connect("user-1", ConnectionScope::Research, None);
        assert_ne!(first_id, second_id);
        assert!(bus.connections.get(&first_id).is_none());
        assert!(first_rx.try_recv().is_err());
    }

    #[test]
    fn send_to_mission_delivers_only_to_subscribers() {
        let bus = EventBus::new();
        let (conn_a, mut rx_a) = bus.connect("user-1", ConnectionScope::Research, None);
        let (_conn_b, mut rx_b) = bus.connect("user-2", ConnectionScope::Research, None);
        bus.subscribe_mission(conn_a, "mission-1").unwrap();

        bus.send_to_mission("mission-1", EventKind::StatusUpdate, serde_json::json!({"phase": "planning"}));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn disconnect_clears_subscriptions() {
        let bus = EventBus::new();
        let (conn, _rx) = bus.connect("user-1", ConnectionScope::Research, None);
        bus.subscribe_mission(conn, "mission-1").unwrap();
        bus.disconnect(conn);
        assert!(bus.mission_index.get("mission-1").map(|s| s.is_empty()).unwrap_or(true));
    }

    #[test]
    fn event_sink_routes_by_mission_id_in_payload() {
        let bus = EventBus::new();
        let (conn, mut rx) = bus.connect("user-1", ConnectionScope::Research, None);
        bus.subscribe_mission(conn, "mission-9").unwrap();
        EventSink::emit(&bus, "web_search_complete", serde_json::json!({"mission_id": "mission-9"}));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn distinct_session_ids_are_independent_connections() {
        let bus = EventBus::new();
        let (a, _) = bus.connect("user-1", ConnectionScope::Writing, Some("session-a".into()));
        let (b, _) = bus.connect("user-1", ConnectionScope::Writing, Some("session-b".into()));
        assert_ne!(a, b);
        assert!(bus.connections.get(&a).is_some());
        assert!(bus.connections.get(&b).is_some());
    }
}
