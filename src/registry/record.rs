//! Client record definitions

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Longest display name a client may register (bytes)
pub const MAX_NAME_LEN: usize = 32;

/// Opaque handle of one accepted connection
///
/// Assigned by the server in accept order and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(u64);

impl SocketId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live connection as seen by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    /// Connection handle, unique while the connection is open
    pub socket: SocketId,

    /// Numeric id used as frame destination (not guaranteed unique)
    pub id: u8,

    /// Observed peer address
    pub ip: IpAddr,
    pub port: u16,

    /// Display name, set by the register command
    pub name: Option<String>,
}

impl ClientRecord {
    /// Whether the client has registered a name
    pub fn is_registered(&self) -> bool {
        self.name.is_some()
    }

    /// Peer socket address
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// Write side of a client connection
///
/// Implemented over TCP by the network layer; the registry only stores it
/// so that replies and relayed frames can reach the peer.
pub trait PeerWriter: Send + Sync {
    /// Write all bytes to the peer
    fn send(&self, bytes: &[u8]) -> io::Result<()>;

    /// Close the connection in both directions
    fn shutdown(&self);
}

/// Shared handle to a peer's write side
pub type PeerHandle = Arc<dyn PeerWriter>;

/// Derive a client id from the low byte of the peer's address
pub fn id_from_addr(ip: IpAddr) -> u8 {
    match ip {
        IpAddr::V4(v4) => v4.octets()[3],
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.octets()[3],
            None => v6.octets()[15],
        },
    }
}
