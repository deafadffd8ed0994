// Public API for integration tests and potential library usage

pub mod api;
pub mod broadcast;
pub mod protocol;
pub mod rooms;
pub mod state;
pub mod store;
pub mod sync;
pub mod types;
pub mod ws;
