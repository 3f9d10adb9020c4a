//! Registry Module
//!
//! Tracks every live client connection.
//!
//! ## Responsibilities
//! - One record per open socket, created on accept, removed on close
//! - Id assignment (peer address low byte, or a sequential counter)
//! - Name, id and socket lookups for the dispatcher and relay
//! - Insertion-ordered snapshots for listing and display surfaces
//!
//! ## Data Structure Choice
//! A Vec wrapped in a RwLock:
//! - Accept order is iteration order, which `list` must preserve
//! - The client cap is small, so linear lookups are cheap
//! - Lookups return copies; the lock is never held across socket I/O

mod record;
mod table;

pub use record::{id_from_addr, ClientRecord, PeerHandle, PeerWriter, SocketId, MAX_NAME_LEN};
pub use table::ClientRegistry;
