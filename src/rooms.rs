//! Room membership: which connections are subscribed to which project.
//!
//! Held in `AppState` as an injectable component, never as ambient global
//! state. A connection may belong to several rooms at once; joining a new
//! project does not remove it from rooms it joined earlier. The only removal
//! path is `disconnect`, invoked by the transport when the channel closes.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::types::{ConnectionId, ProjectId};

pub struct RoomRegistry {
    rooms: RwLock<HashMap<ProjectId, HashSet<ConnectionId>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to a project's room, creating the room if absent.
    /// Idempotent.
    pub async fn join(&self, connection_id: &ConnectionId, project_id: &ProjectId) {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(project_id.clone())
            .or_default()
            .insert(connection_id.clone());
    }

    /// Snapshot of the connections currently in a project's room
    pub async fn members(&self, project_id: &ProjectId) -> Vec<ConnectionId> {
        let rooms = self.rooms.read().await;
        rooms
            .get(project_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a connection from every room it joined. Called by the
    /// transport when the connection's channel closes.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let mut rooms = self.rooms.write().await;
        for members in rooms.values_mut() {
            members.remove(connection_id);
        }
        rooms.retain(|_, members| !members.is_empty());
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
