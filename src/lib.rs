//! # framehub
//!
//! A small TCP hub for a handful of peers:
//! - Clients connect, register a display name, and query who is online
//! - Framed data addressed to another client id is relayed unchanged
//! - A narrow command set provisions upstream network credentials
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │         (accept loop, client cap, keepalive)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one receive thread per client
//!                       ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Processing Stage (depth-1 queue)               │
//! │                 Hub: classify via codec                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ goal == hub             │ goal == peer
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Dispatcher  │─────────▶│    Relay    │
//!   │ (commands)  │ transmit │ (raw bytes) │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Credential  │          │   Client    │
//!   │   Store     │          │  Registry   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod registry;
pub mod provision;
pub mod relay;
pub mod dispatcher;
pub mod hub;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HubError, Result};
pub use config::Config;
pub use hub::Hub;
pub use network::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of framehub
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
