//! Relay Module
//!
//! Forwards bytes to the client addressed by a destination id, unchanged.

use std::sync::Arc;

use crate::protocol::{HUB_ID, INVALID_ID};
use crate::registry::{ClientRegistry, SocketId};

/// Result of one forwarding attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Written in full to this connection
    Delivered(SocketId),

    /// No live client carries the id
    NoTarget,

    /// The write failed; that connection has been shut down
    SendFailed(SocketId),
}

impl RelayOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, RelayOutcome::Delivered(_))
    }
}

/// Pass-through forwarder between client connections
#[derive(Clone)]
pub struct Relay {
    registry: Arc<ClientRegistry>,
}

impl Relay {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Write `raw` to the first client whose id is `goal`
    ///
    /// The reserved hub and invalid ids never resolve to a client. A failed
    /// write shuts down only the target connection; its receive loop then
    /// deregisters it.
    pub fn forward(&self, goal: u8, raw: &[u8]) -> RelayOutcome {
        if goal == HUB_ID || goal == INVALID_ID {
            return RelayOutcome::NoTarget;
        }

        let Some((socket, peer)) = self.registry.peer_by_id(goal) else {
            return RelayOutcome::NoTarget;
        };

        match peer.send(raw) {
            Ok(()) => {
                tracing::trace!("[sock={}]: relayed {} bytes to id {}", socket, raw.len(), goal);
                RelayOutcome::Delivered(socket)
            }
            Err(e) => {
                tracing::warn!("[sock={}]: relay to id {} failed: {}", socket, goal, e);
                peer.shutdown();
                RelayOutcome::SendFailed(socket)
            }
        }
    }
}
