use std::sync::Arc;

use crate::broadcast::Fanout;
use crate::rooms::RoomRegistry;
use crate::store::{MemoryStore, SceneStore};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn SceneStore>,
    pub rooms: RoomRegistry,
    pub fanout: Fanout,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Build state over a caller-provided store (used by tests to inject
    /// stores with controlled write-completion order)
    pub fn with_store(store: Arc<dyn SceneStore>) -> Self {
        Self {
            store,
            rooms: RoomRegistry::new(),
            fanout: Fanout::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
