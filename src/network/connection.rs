//! Connection Handler
//!
//! Receive loop of one accepted client.

use std::io::{ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::Sender;

use crate::protocol::UnitAssembler;
use crate::registry::{ClientRegistry, SocketId};

/// One protocol unit on its way to the processing stage
#[derive(Debug, Clone)]
pub struct Received {
    /// Connection it arrived on
    pub socket: SocketId,

    /// A complete frame, or the read that carried a legacy request
    pub data: Bytes,
}

/// Handles a single client connection
pub struct Connection {
    /// Registry handle of this connection
    socket: SocketId,

    /// TCP stream read side
    stream: TcpStream,

    /// Peer address for logging
    peer_addr: SocketAddr,

    /// Live client registry; this connection removes itself on close
    registry: Arc<ClientRegistry>,

    /// Depth-1 queue into the processing stage
    queue: Sender<Received>,

    /// Size of a single read
    buffer_size: usize,
}

impl Connection {
    /// Create a new connection handler for an already registered socket
    pub fn new(
        socket: SocketId,
        stream: TcpStream,
        peer_addr: SocketAddr,
        registry: Arc<ClientRegistry>,
        queue: Sender<Received>,
        buffer_size: usize,
    ) -> Self {
        Self {
            socket,
            stream,
            peer_addr,
            registry,
            queue,
            buffer_size,
        }
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Frames are forwarded once their declared length has arrived; a
    /// legacy request is forwarded as the read that carried it. Returns when
    /// the peer closes, a read fails, a frame header is unusable, or the
    /// processing stage is gone; the connection is deregistered and its
    /// socket released in every case.
    pub fn handle(mut self) {
        tracing::debug!("[sock={}]: receive loop started for {}", self.socket, self.peer_addr);

        let mut buffer = vec![0u8; self.buffer_size];
        let mut assembler = UnitAssembler::new();

        loop {
            let len = match self.stream.read(&mut buffer) {
                Ok(0) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    break;
                }
                Ok(len) => len,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset
                            | ErrorKind::ConnectionAborted
                            | ErrorKind::NotConnected
                    ) =>
                {
                    tracing::debug!("Connection to {} lost: {}", self.peer_addr, e);
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "[sock={}]: recv() failed: {} -> closing the socket",
                        self.socket,
                        e
                    );
                    break;
                }
            };

            tracing::trace!("[sock={}]: {} bytes received", self.socket, len);

            let units = match assembler.push(&buffer[..len]) {
                Ok(units) => units,
                Err(e) => {
                    tracing::warn!("[sock={}]: {} -> closing the socket", self.socket, e);
                    break;
                }
            };

            if !self.forward(units) {
                tracing::debug!("[sock={}]: processing stage stopped", self.socket);
                break;
            }
        }

        if assembler.pending() > 0 {
            tracing::debug!(
                "[sock={}]: {} bytes of an incomplete frame discarded",
                self.socket,
                assembler.pending()
            );
        }
        self.close();
    }

    /// Queue units for processing; false once the processing stage is gone
    fn forward(&self, units: Vec<Bytes>) -> bool {
        units.into_iter().all(|data| {
            self.queue
                .send(Received {
                    socket: self.socket,
                    data,
                })
                .is_ok()
        })
    }

    /// Deregister and release the socket
    fn close(&self) {
        if let Some(record) = self.registry.remove(self.socket) {
            tracing::info!(
                "[sock={}]: closed, id {} ({}) deregistered",
                self.socket,
                record.id,
                record.name.as_deref().unwrap_or("unregistered")
            );
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}
