//! Fan-out of server events to subsets of a room.
//!
//! Each connection registers one outbound sender for its lifetime; delivery
//! to a room is a loop over a membership snapshot filtered by the event's
//! declared policy. A recipient whose channel has already closed is skipped
//! without aborting delivery to the rest.

use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};

use crate::protocol::ServerMessage;
use crate::types::ConnectionId;

/// Whether a broadcast echoes back to the connection that caused it.
///
/// Declared per event type in one dispatch table (`sync::fanout_policy`) so
/// the asymmetry stays an auditable contract rather than scattered call-site
/// logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutPolicy {
    /// Deliver to everyone in the room except the sender (high-frequency
    /// updates where the sender already holds the authoritative local value)
    ExcludeSender,
    /// Deliver to everyone in the room including the sender (low-frequency
    /// updates where the echo doubles as a write acknowledgment)
    IncludeSender,
}

pub struct Fanout {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection's outbound channel for its lifetime
    pub async fn register(
        &self,
        connection_id: &ConnectionId,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) {
        let mut senders = self.senders.write().await;
        senders.insert(connection_id.clone(), tx);
    }

    pub async fn unregister(&self, connection_id: &ConnectionId) {
        let mut senders = self.senders.write().await;
        senders.remove(connection_id);
    }

    /// Deliver a message to a single connection. Ignores a closed channel.
    pub async fn send_to(&self, connection_id: &ConnectionId, msg: ServerMessage) {
        let senders = self.senders.read().await;
        if let Some(tx) = senders.get(connection_id) {
            let _ = tx.send(msg);
        }
    }

    /// Deliver a message to the given room members per the policy. A closed
    /// recipient channel is logged and skipped; it never aborts delivery to
    /// the remaining members.
    pub async fn deliver(
        &self,
        members: &[ConnectionId],
        origin: &ConnectionId,
        policy: FanoutPolicy,
        msg: ServerMessage,
    ) {
        let senders = self.senders.read().await;
        for member in members {
            if policy == FanoutPolicy::ExcludeSender && member == origin {
                continue;
            }
            if let Some(tx) = senders.get(member) {
                if tx.send(msg.clone()).is_err() {
                    tracing::debug!("Dropping delivery to closed connection {}", member);
                }
            }
        }
    }
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_msg() -> ServerMessage {
        ServerMessage::Error {
            code: "TEST".to_string(),
            msg: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_exclude_sender_skips_origin() {
        let fanout = Fanout::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        fanout.register(&"a".to_string(), tx_a).await;
        fanout.register(&"b".to_string(), tx_b).await;

        let members = vec!["a".to_string(), "b".to_string()];
        fanout
            .deliver(
                &members,
                &"a".to_string(),
                FanoutPolicy::ExcludeSender,
                error_msg(),
            )
            .await;

        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_include_sender_reaches_origin() {
        let fanout = Fanout::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        fanout.register(&"a".to_string(), tx_a).await;
        fanout.register(&"b".to_string(), tx_b).await;

        let members = vec!["a".to_string(), "b".to_string()];
        fanout
            .deliver(
                &members,
                &"a".to_string(),
                FanoutPolicy::IncludeSender,
                error_msg(),
            )
            .await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_closed_recipient_does_not_block_others() {
        let fanout = Fanout::new();
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        fanout.register(&"a".to_string(), tx_a).await;
        fanout.register(&"b".to_string(), tx_b).await;
        drop(rx_a);

        let members = vec!["a".to_string(), "b".to_string()];
        fanout
            .deliver(
                &members,
                &"c".to_string(),
                FanoutPolicy::IncludeSender,
                error_msg(),
            )
            .await;

        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let fanout = Fanout::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        fanout.register(&"a".to_string(), tx_a).await;
        fanout.unregister(&"a".to_string()).await;

        fanout.send_to(&"a".to_string(), error_msg()).await;
        assert!(rx_a.try_recv().is_err());
    }
}
