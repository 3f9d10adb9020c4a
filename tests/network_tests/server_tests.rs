//! Server Tests
//!
//! Runs a real hub on a loopback port and drives it with `HubClient`.
//!
//! Loopback peers all share the address byte 1, so tests that relay between
//! clients use sequential ids.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use framehub::client::{Framing, HubClient};
use framehub::config::{Config, ConfigBuilder, IdPolicy, KeepaliveConfig};
use framehub::network::{configure_keepalive, ShutdownHandle};
use framehub::protocol::{FrameType, FRAME_HEAD, HUB_ID, MAX_PAYLOAD_SIZE};
use framehub::provision::{CredentialStore, MemoryCredentialStore};
use framehub::registry::ClientRegistry;
use framehub::{HubError, Server};
use serde_json::json;
use socket2::SockRef;

// =============================================================================
// Test Helpers
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    store: Arc<MemoryCredentialStore>,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start(builder: ConfigBuilder) -> Self {
        let config = builder
            .listen_addr("127.0.0.1:0")
            .accept_poll_ms(5)
            .accept_backoff_ms(20)
            .build();
        let store = Arc::new(MemoryCredentialStore::new());
        let server = Server::bind(config, store.clone()).unwrap();

        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            registry,
            store,
            shutdown,
            thread: Some(thread),
        }
    }

    fn sequential() -> Self {
        Self::start(Config::builder().id_policy(IdPolicy::Sequential))
    }

    fn client(&self, framing: Framing) -> HubClient {
        let client = HubClient::connect(self.addr, framing).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client
    }

    /// Connect and register, so the connection is known to be accepted
    fn registered(&self, framing: Framing, name: &str) -> HubClient {
        let mut client = self.client(framing);
        assert_eq!(client.register(name).unwrap(), json!({"status": "succeed"}));
        client
    }

    fn stop(&mut self) {
        self.shutdown.shutdown();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn is_timeout(err: &HubError) -> bool {
    matches!(err, HubError::Io(e)
        if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut))
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_accept_registers_connection() {
    let server = TestServer::start(Config::builder());
    let client = server.client(Framing::Legacy);
    let local = client.local_addr().unwrap();

    assert!(wait_until(|| server.registry.len() == 1));
    let record = server.registry.snapshot().remove(0);
    assert_eq!(record.port, local.port());
    assert_eq!(record.id, 1);
    assert!(!record.is_registered());
}

#[test]
fn test_bind_rejects_invalid_config() {
    let store = Arc::new(MemoryCredentialStore::new());
    let zero_cap = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_clients(0)
        .build();
    assert!(matches!(
        Server::bind(zero_cap, store.clone()),
        Err(HubError::Config(_))
    ));

    let tiny_buffer = Config::builder()
        .listen_addr("127.0.0.1:0")
        .recv_buffer_size(4)
        .build();
    assert!(matches!(
        Server::bind(tiny_buffer, store),
        Err(HubError::Config(_))
    ));
}

#[test]
fn test_disconnect_deregisters() {
    let server = TestServer::start(Config::builder());
    let client = server.registered(Framing::Legacy, "alpha");
    assert_eq!(server.registry.len(), 1);

    drop(client);
    assert!(wait_until(|| server.registry.is_empty()));
}

#[test]
fn test_shutdown_closes_clients() {
    let mut server = TestServer::start(Config::builder());
    let mut client = server.registered(Framing::Legacy, "alpha");

    server.stop();

    let err = client.recv_reply().unwrap_err();
    assert!(!is_timeout(&err), "expected closed connection, got {:?}", err);
    assert!(server.registry.is_empty());
}

#[test]
fn test_client_cap_defers_extra_connection() {
    let server = TestServer::start(Config::builder().max_clients(2));
    let first = server.registered(Framing::Legacy, "one");
    let _second = server.registered(Framing::Legacy, "two");

    // The third connection completes at the TCP level but is not served
    let mut third = server.client(Framing::Legacy);
    third.send_json(&json!({"command": "register", "name": "three"})).unwrap();
    third.set_read_timeout(Some(Duration::from_millis(300))).unwrap();
    let err = third.recv_reply().unwrap_err();
    assert!(is_timeout(&err), "unexpected error {:?}", err);
    assert_eq!(server.registry.len(), 2);

    // A free slot lets it in; the request it already sent is then served
    drop(first);
    third.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(third.recv_reply().unwrap(), json!({"status": "succeed"}));
    assert_eq!(server.registry.len(), 2);
}

// =============================================================================
// Socket Option Tests
// =============================================================================

#[test]
fn test_configure_keepalive_sets_default_timing() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (stream, _) = listener.accept().unwrap();

    let config = KeepaliveConfig::default();
    configure_keepalive(&stream, &config).unwrap();

    let socket = SockRef::from(&stream);
    assert!(socket.keepalive().unwrap());
    assert_eq!(socket.keepalive_time().unwrap(), Duration::from_secs(3));

    #[cfg(target_os = "linux")]
    {
        assert_eq!(socket.keepalive_interval().unwrap(), Duration::from_secs(1));
        assert_eq!(socket.keepalive_retries().unwrap(), 2);
    }
}

#[test]
fn test_configure_keepalive_custom_values() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (stream, _) = listener.accept().unwrap();

    let config = KeepaliveConfig {
        idle: Duration::from_secs(10),
        interval: Duration::from_secs(4),
        retries: 5,
    };
    configure_keepalive(&stream, &config).unwrap();

    let socket = SockRef::from(&stream);
    assert_eq!(socket.keepalive_time().unwrap(), Duration::from_secs(10));

    #[cfg(target_os = "linux")]
    {
        assert_eq!(socket.keepalive_interval().unwrap(), Duration::from_secs(4));
        assert_eq!(socket.keepalive_retries().unwrap(), 5);
    }
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_register_and_list_over_tcp() {
    let server = TestServer::start(Config::builder());
    let mut client = server.client(Framing::Legacy);

    assert_eq!(
        client.request(&json!({"command": "list"})).unwrap(),
        json!({"status": "unregister"})
    );
    assert_eq!(
        client.register("alpha").unwrap(),
        json!({"status": "succeed"})
    );

    let list = client.request(&json!({"command": "list"})).unwrap();
    let entries = list.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "alpha");
    assert_eq!(entries[0]["ip"], "127.0.0.1");
    assert_eq!(entries[0]["id"], 1);
}

#[test]
fn test_framed_requests_over_tcp() {
    let server = TestServer::sequential();
    let mut client = server.client(Framing::Framed);
    client.set_source(1);

    assert_eq!(client.register("alpha").unwrap(), json!({"status": "succeed"}));

    client.send_command("mark alpha").unwrap();
    let frame = client.recv_frame().unwrap();
    assert_eq!(frame.frame_type, FrameType::Command);
    assert_eq!(frame.goal, 1);
    assert_eq!(frame.source, HUB_ID);
    assert_eq!(&frame.payload[..], br#"{"mark":1}"#);
}

#[test]
fn test_garbage_gets_no_reply() {
    let server = TestServer::start(Config::builder());
    let mut client = server.registered(Framing::Legacy, "alpha");

    client.send_raw(b"\x01\x02garbage").unwrap();
    thread::sleep(Duration::from_millis(100));

    // The connection stays usable
    let list = client.request(&json!({"command": "list"})).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[test]
fn test_oversized_frame_header_closes_connection() {
    let server = TestServer::start(Config::builder());
    let mut client = server.registered(Framing::Legacy, "alpha");

    let mut header = vec![FRAME_HEAD, FrameType::Binary as u8, 2, 1];
    header.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_le_bytes());
    client.send_raw(&header).unwrap();

    let mut buf = [0u8; 64];
    let err = client.recv_raw(&mut buf).unwrap_err();
    assert!(!is_timeout(&err), "expected closed connection, got {:?}", err);
    assert!(wait_until(|| server.registry.is_empty()));
}

// =============================================================================
// Relay Tests
// =============================================================================

#[test]
fn test_relay_between_clients() {
    let server = TestServer::sequential();
    let mut a = server.registered(Framing::Framed, "alpha");
    let mut b = server.registered(Framing::Framed, "beta");
    a.set_source(1);

    a.send_frame(FrameType::Binary, 2, b"hello").unwrap();

    let frame = b.recv_frame().unwrap();
    assert_eq!(frame.frame_type, FrameType::Binary);
    assert_eq!(frame.goal, 2);
    assert_eq!(frame.source, 1);
    assert_eq!(&frame.payload[..], b"hello");
}

#[test]
fn test_relay_to_missing_id_is_dropped() {
    let server = TestServer::sequential();
    let mut a = server.registered(Framing::Framed, "alpha");
    let mut b = server.registered(Framing::Framed, "beta");

    a.send_frame(FrameType::Binary, 9, b"hello").unwrap();
    thread::sleep(Duration::from_millis(100));

    // Nothing reaches the other client and the sender is still served
    assert!(b.recv_replies(Duration::from_millis(200)).unwrap().is_empty());
    let list = a.request(&json!({"command": "list"})).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[test]
fn test_json_transmit_between_clients() {
    let server = TestServer::sequential();
    let mut a = server.registered(Framing::Legacy, "alpha");
    let mut b = server.registered(Framing::Legacy, "beta");

    let request = json!({"transmit": "2", "data": "ping"});
    assert_eq!(a.request(&request).unwrap(), json!({"status": "succeed"}));

    // The receiver gets the original request bytes, without a newline
    let expected = request.to_string().into_bytes();
    let mut received = Vec::new();
    let mut buf = [0u8; 256];
    while received.len() < expected.len() {
        let n = b.recv_raw(&mut buf).unwrap();
        received.extend_from_slice(&buf[..n]);
    }
    assert_eq!(received, expected);
}

#[test]
fn test_frame_larger_than_one_read_is_relayed_whole() {
    let server = TestServer::sequential();
    let mut a = server.registered(Framing::Framed, "alpha");
    let mut b = server.registered(Framing::Framed, "beta");
    a.set_source(1);

    // The second 4 KiB read of this frame starts with a hub request
    let mut payload = vec![b'x'; 4096 - 8];
    payload.extend_from_slice(br#"{"command":"router","ssid":"hijacked","pwd":"pw"}"#);
    payload.extend_from_slice(&[b'y'; 6000]);
    a.send_frame(FrameType::Binary, 2, &payload).unwrap();

    let frame = b.recv_frame().unwrap();
    assert_eq!(frame.frame_type, FrameType::Binary);
    assert_eq!(frame.goal, 2);
    assert_eq!(frame.source, 1);
    assert_eq!(frame.payload.len(), payload.len());
    assert_eq!(&frame.payload[..], &payload[..]);

    // Nothing inside the payload reached the hub
    assert!(a.recv_replies(Duration::from_millis(200)).unwrap().is_empty());
    assert_eq!(server.store.load_credentials().unwrap(), None);
}
