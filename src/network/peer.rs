//! TCP peer writer
//!
//! Write side of an accepted connection, shared by the processing thread
//! (replies) and the relay (forwarded frames).

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

use parking_lot::Mutex;

use crate::registry::PeerWriter;

/// Write handle over a cloned TcpStream
pub struct TcpPeer {
    stream: TcpStream,

    /// Keeps concurrent writers from interleaving partial writes
    write_lock: Mutex<()>,
}

impl TcpPeer {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            write_lock: Mutex::new(()),
        }
    }
}

impl PeerWriter for TcpPeer {
    fn send(&self, bytes: &[u8]) -> io::Result<()> {
        let _guard = self.write_lock.lock();
        let mut stream = &self.stream;
        stream.write_all(bytes)?;
        stream.flush()
    }

    fn shutdown(&self) {
        // Already-closed sockets report NotConnected; nothing left to do then
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
