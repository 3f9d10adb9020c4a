//! Client registry implementation
//!
//! Insertion-ordered Vec behind a RwLock.

use std::net::SocketAddr;

use parking_lot::RwLock;

use crate::config::IdPolicy;
use crate::protocol::{HUB_ID, INVALID_ID};

use super::{id_from_addr, ClientRecord, PeerHandle, SocketId};

/// A record and the write side of its connection
struct Entry {
    record: ClientRecord,
    peer: PeerHandle,
}

/// State guarded by the registry lock
struct Inner {
    /// Live clients in accept order
    entries: Vec<Entry>,

    /// Next candidate for `IdPolicy::Sequential`
    next_id: u8,
}

/// Registry of live client connections
///
/// ## Concurrency:
/// - `register`/`remove` are called by the connection lifecycle (accept/close)
/// - `set_name` is the single field write done by the dispatcher
/// - All lookups take the read lock and return copies, so no caller ever
///   holds the lock while doing I/O
pub struct ClientRegistry {
    inner: RwLock<Inner>,
    id_policy: IdPolicy,
}

impl ClientRegistry {
    /// Create an empty registry using the given id policy
    pub fn new(id_policy: IdPolicy) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: Vec::new(),
                next_id: 1,
            }),
            id_policy,
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Register a freshly accepted connection and return its assigned id
    ///
    /// Registering a socket that is already present replaces its record.
    /// Under `IdPolicy::PeerAddress` a host byte equal to 0, `HUB_ID` or
    /// `INVALID_ID` is replaced by the next free sequential id.
    pub fn register(&self, socket: SocketId, addr: SocketAddr, peer: PeerHandle) -> u8 {
        let mut inner = self.inner.write();

        let id = match self.id_policy {
            IdPolicy::PeerAddress => match id_from_addr(addr.ip()) {
                id if is_reserved(id) => Self::next_sequential_id(&mut inner),
                id => id,
            },
            IdPolicy::Sequential => Self::next_sequential_id(&mut inner),
        };

        let record = ClientRecord {
            socket,
            id,
            ip: addr.ip(),
            port: addr.port(),
            name: None,
        };

        match inner.entries.iter().position(|e| e.record.socket == socket) {
            Some(index) => inner.entries[index] = Entry { record, peer },
            None => inner.entries.push(Entry { record, peer }),
        }

        id
    }

    /// Set the display name of a connection
    ///
    /// Returns false when the socket is not registered. A second call
    /// overwrites the first name.
    pub fn set_name(&self, socket: SocketId, name: impl Into<String>) -> bool {
        let mut inner = self.inner.write();
        match inner.entries.iter_mut().find(|e| e.record.socket == socket) {
            Some(entry) => {
                entry.record.name = Some(name.into());
                true
            }
            None => false,
        }
    }

    /// Remove a connection's record; a no-op for unknown sockets
    pub fn remove(&self, socket: SocketId) -> Option<ClientRecord> {
        let mut inner = self.inner.write();
        let index = inner.entries.iter().position(|e| e.record.socket == socket)?;
        Some(inner.entries.remove(index).record)
    }

    /// Shut down every registered connection
    ///
    /// Records stay in place until each receive loop observes the close and
    /// removes its own entry.
    pub fn close_all(&self) {
        let peers: Vec<PeerHandle> = self
            .inner
            .read()
            .entries
            .iter()
            .map(|e| e.peer.clone())
            .collect();

        for peer in peers {
            peer.shutdown();
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Find the record of a connection
    pub fn find_by_socket(&self, socket: SocketId) -> Option<ClientRecord> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| e.record.socket == socket)
            .map(|e| e.record.clone())
    }

    /// Find the first record (in accept order) carrying this id
    pub fn find_by_id(&self, id: u8) -> Option<ClientRecord> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| e.record.clone())
    }

    /// Find the first record registered under this name
    ///
    /// Unnamed connections never match.
    pub fn find_by_name(&self, name: &str) -> Option<ClientRecord> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| e.record.name.as_deref() == Some(name))
            .map(|e| e.record.clone())
    }

    /// Write handle of a connection
    pub fn peer_by_socket(&self, socket: SocketId) -> Option<PeerHandle> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| e.record.socket == socket)
            .map(|e| e.peer.clone())
    }

    /// Socket and write handle of the first connection carrying this id
    pub fn peer_by_id(&self, id: u8) -> Option<(SocketId, PeerHandle)> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| (e.record.socket, e.peer.clone()))
    }

    /// Copy of all records in accept order
    pub fn snapshot(&self) -> Vec<ClientRecord> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|e| e.record.clone())
            .collect()
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn id_policy(&self) -> IdPolicy {
        self.id_policy
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Pick the next counter value that is not reserved and, when possible,
    /// not held by a live client (called with the write lock held)
    fn next_sequential_id(inner: &mut Inner) -> u8 {
        let mut fallback = None;

        for _ in 0..=u8::MAX as usize {
            let candidate = inner.next_id;
            inner.next_id = inner.next_id.wrapping_add(1);

            if is_reserved(candidate) {
                continue;
            }
            if inner.entries.iter().any(|e| e.record.id == candidate) {
                fallback.get_or_insert(candidate);
                continue;
            }
            return candidate;
        }

        // Every usable id is taken; share one
        fallback.unwrap_or(1)
    }
}

/// Ids that never name a client
fn is_reserved(id: u8) -> bool {
    id == 0 || id == HUB_ID || id == INVALID_ID
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(IdPolicy::PeerAddress)
    }
}
