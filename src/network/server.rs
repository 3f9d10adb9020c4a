//! TCP Server
//!
//! Accepts connections up to the client cap and feeds one processing thread.

use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::Sender;
use socket2::{SockRef, TcpKeepalive};

use crate::config::{Config, KeepaliveConfig};
use crate::error::Result;
use crate::hub::Hub;
use crate::provision::CredentialStore;
use crate::registry::{ClientRegistry, SocketId};

use super::{processor, Connection, Received, TcpPeer};

/// Cloneable handle that stops a running server
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// TCP server for the hub
pub struct Server {
    config: Config,
    listener: TcpListener,
    hub: Arc<Hub>,
    shutdown: ShutdownHandle,

    /// Next connection handle to assign
    next_socket: u64,

    /// Receive-loop threads still running
    workers: Vec<JoinHandle<()>>,
}

impl Server {
    /// Bind the listen address and build the hub
    pub fn bind(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        let hub = Arc::new(Hub::new(config.clone(), store));

        Ok(Self {
            config,
            listener,
            hub,
            shutdown: ShutdownHandle::default(),
            next_socket: 1,
            workers: Vec::new(),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Live client registry
    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(self.hub.registry())
    }

    /// Handle that stops `run`
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Start the server (blocking until shutdown or a fatal listener error)
    pub fn run(mut self) -> Result<()> {
        let (tx, rx) = processor::queue();
        let stage = processor::spawn(Arc::clone(&self.hub), rx)?;

        let result = self.accept_loop(&tx);

        tracing::info!("Shutting down, closing {} connections", self.hub.registry().len());
        drop(tx);
        self.hub.registry().close_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        let _ = stage.join();

        result
    }

    /// Accept connections until shutdown
    fn accept_loop(&mut self, tx: &Sender<Received>) -> Result<()> {
        let poll = self.config.accept_poll();
        let backoff = self.config.accept_backoff();

        while !self.shutdown.is_shutdown() {
            self.workers.retain(|worker| !worker.is_finished());

            // Only accept while a slot is free; never evict a live client
            let live = self.hub.registry().len();
            if live >= self.config.max_clients {
                tracing::warn!("too many TCP connections ({}), waiting for a free slot", live);
                thread::sleep(backoff);
                continue;
            }

            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.admit(stream, addr, tx) {
                        tracing::warn!("Failed to admit {}: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::Interrupted
                            | ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                    ) =>
                {
                    tracing::debug!("Transient accept error: {}", e);
                }
                Err(e) => {
                    tracing::error!("Unable to accept connection: {}", e);
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    /// Configure, register, and spawn the receive loop of a new connection
    fn admit(&mut self, stream: TcpStream, addr: SocketAddr, tx: &Sender<Received>) -> Result<()> {
        // Accepted sockets may inherit the listener's non-blocking mode
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        if self.config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(self.config.write_timeout_ms)))?;
        }
        if let Err(e) = configure_keepalive(&stream, &self.config.keepalive) {
            tracing::warn!("Keepalive not applied for {}: {}", addr, e);
        }

        let socket = SocketId::new(self.next_socket);
        self.next_socket += 1;

        let registry = self.registry();
        let peer = Arc::new(TcpPeer::new(stream.try_clone()?));
        let id = registry.register(socket, addr, peer);
        tracing::info!("[sock={}]: connection accepted from {} as id {}", socket, addr, id);

        let connection = Connection::new(
            socket,
            stream,
            addr,
            Arc::clone(&registry),
            tx.clone(),
            self.config.recv_buffer_size,
        );

        match thread::Builder::new()
            .name(format!("hub-recv-{}", socket))
            .spawn(move || connection.handle())
        {
            Ok(worker) => {
                self.workers.push(worker);
                Ok(())
            }
            Err(e) => {
                if let Some(peer) = registry.peer_by_socket(socket) {
                    peer.shutdown();
                }
                registry.remove(socket);
                Err(e.into())
            }
        }
    }
}

/// Apply keepalive idle time, retransmit interval and retry count
pub fn configure_keepalive(stream: &TcpStream, config: &KeepaliveConfig) -> io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(config.idle);

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "windows"
    ))]
    let keepalive = keepalive.with_interval(config.interval);

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd"
    ))]
    let keepalive = keepalive.with_retries(config.retries);

    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}
