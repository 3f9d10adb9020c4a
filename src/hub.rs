//! Hub Module
//!
//! The processing core that coordinates codec, dispatcher and relay.
//!
//! ## Responsibilities
//! - Classify each received buffer (frame, legacy JSON, or garbage)
//! - Route frames addressed to other clients through the relay
//! - Hand hub-addressed requests to the dispatcher
//! - Encode replies in the sender's framing and write them back

use std::sync::Arc;

use crate::config::Config;
use crate::dispatcher::{Body, Dispatcher, Request};
use crate::protocol::{self, FrameType, Inbound, Reply, HUB_ID};
use crate::provision::CredentialStore;
use crate::registry::{ClientRegistry, SocketId};
use crate::relay::{Relay, RelayOutcome};

/// How replies to a request are wrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFraming {
    /// Bare JSON followed by a newline
    Legacy,

    /// A frame of this type from the hub to the requester
    Framed(FrameType),
}

/// The hub's processing core
///
/// ## Concurrency Model
///
/// `handle` is called from a single processing thread, so requests are
/// applied one at a time in queue order. The registry it shares with the
/// connection threads guards itself.
pub struct Hub {
    /// Hub configuration
    config: Config,

    /// Live clients
    registry: Arc<ClientRegistry>,

    /// Administrative command handling
    dispatcher: Dispatcher,

    /// Client-to-client forwarding
    relay: Relay,
}

impl Hub {
    /// Build a hub with a fresh registry
    pub fn new(config: Config, store: Arc<dyn CredentialStore>) -> Self {
        let registry = Arc::new(ClientRegistry::new(config.id_policy));
        Self::with_registry(config, registry, store)
    }

    /// Build a hub over an existing registry
    pub fn with_registry(
        config: Config,
        registry: Arc<ClientRegistry>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let dispatcher = Dispatcher::from_config(&config, Arc::clone(&registry), store);
        let relay = Relay::new(Arc::clone(&registry));

        Self {
            config,
            registry,
            dispatcher,
            relay,
        }
    }

    /// Process one received buffer from `socket`
    pub fn handle(&self, socket: SocketId, data: &[u8]) {
        match protocol::classify(data) {
            Inbound::Invalid(e) => {
                // Dropped without a reply
                tracing::debug!("[sock={}]: dropping {} bytes: {}", socket, data.len(), e);
            }
            Inbound::Legacy(json) => {
                tracing::debug!("[sock={}]: {} byte JSON request", socket, json.len());
                let request = Request {
                    socket,
                    body: Body::Json(json),
                    raw: data,
                };
                let replies = self.dispatcher.dispatch(&request);
                self.respond(socket, ReplyFraming::Legacy, &replies);
            }
            Inbound::Frame(frame) if !frame.is_for_hub() => {
                match self.relay.forward(frame.goal, data) {
                    RelayOutcome::Delivered(target) => {
                        tracing::trace!("[sock={}]: frame relayed to sock {}", socket, target);
                    }
                    RelayOutcome::NoTarget => {
                        tracing::debug!(
                            "[sock={}]: no client with id {}, frame dropped",
                            socket,
                            frame.goal
                        );
                    }
                    RelayOutcome::SendFailed(target) => {
                        tracing::debug!("[sock={}]: relay to sock {} failed", socket, target);
                    }
                }
            }
            Inbound::Frame(frame) => {
                tracing::debug!(
                    "[sock={}]: {:?} frame for hub, {} bytes",
                    socket,
                    frame.frame_type,
                    frame.length()
                );
                let (body, reply_type) = match frame.frame_type {
                    FrameType::Command => (Body::Text(&frame.payload), FrameType::Command),
                    FrameType::Binary => (Body::Binary, FrameType::Json),
                    _ => (Body::Json(&frame.payload), FrameType::Json),
                };
                let request = Request {
                    socket,
                    body,
                    raw: data,
                };
                let replies = self.dispatcher.dispatch(&request);
                self.respond(socket, ReplyFraming::Framed(reply_type), &replies);
            }
        }
    }

    /// Encode and send replies to the requester
    ///
    /// A write failure shuts the requester's connection down.
    fn respond(&self, socket: SocketId, framing: ReplyFraming, replies: &[Reply]) {
        if replies.is_empty() {
            return;
        }

        let (Some(record), Some(peer)) = (
            self.registry.find_by_socket(socket),
            self.registry.peer_by_socket(socket),
        ) else {
            return;
        };

        for reply in replies {
            let json = reply.to_json();
            let bytes = match framing {
                ReplyFraming::Legacy => protocol::encode_legacy(&json),
                ReplyFraming::Framed(frame_type) => {
                    match protocol::encode(frame_type, record.id, HUB_ID, &json) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            tracing::warn!("[sock={}]: reply not encodable: {}", socket, e);
                            continue;
                        }
                    }
                }
            };

            if let Err(e) = peer.send(&bytes) {
                tracing::warn!("[sock={}]: error writing reply: {}", socket, e);
                peer.shutdown();
                return;
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Live client registry (read-only use by display surfaces)
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
