//! Network Module
//!
//! TCP server and client connection handling.
//!
//! ## Architecture
//! - Single acceptor thread, refusing new clients while the cap is reached
//! - One receive thread per connection
//! - One processing thread, fed through a depth-1 queue, applies every
//!   request in arrival order

mod server;
mod connection;
mod peer;
pub mod processor;

pub use server::{configure_keepalive, Server, ShutdownHandle};
pub use connection::{Connection, Received};
pub use peer::TcpPeer;
