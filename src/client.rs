//! Hub Client
//!
//! Blocking client used by the CLI and the integration tests.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::{HubError, Result};
use crate::protocol::{self, Frame, FrameType, HUB_ID, INVALID_ID};

/// How requests are put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Bare JSON; replies are newline-terminated JSON
    Legacy,

    /// Frames addressed to the hub; replies are frames
    Framed,
}

/// Blocking client connection to a hub
pub struct HubClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    framing: Framing,

    /// Source id written into outgoing frames
    source: u8,
}

impl HubClient {
    /// Connect to a hub
    pub fn connect(addr: impl ToSocketAddrs, framing: Framing) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
            framing,
            source: INVALID_ID,
        })
    }

    /// Set the source id written into outgoing frames
    pub fn set_source(&mut self, id: u8) {
        self.source = id;
    }

    /// Set a read timeout (`None` blocks forever)
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.writer.set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.writer.local_addr()?)
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Send a JSON request to the hub in this client's framing
    pub fn send_json(&mut self, request: &Value) -> Result<()> {
        let body = request.to_string();
        match self.framing {
            Framing::Legacy => self.send_raw(body.as_bytes()),
            Framing::Framed => self.send_frame(FrameType::Json, HUB_ID, body.as_bytes()),
        }
    }

    /// Send argv-style command text to the hub (framed only)
    pub fn send_command(&mut self, text: &str) -> Result<()> {
        match self.framing {
            Framing::Framed => self.send_frame(FrameType::Command, HUB_ID, text.as_bytes()),
            Framing::Legacy => Err(HubError::Protocol(
                "Command text requires framed mode".to_string(),
            )),
        }
    }

    /// Send a frame to any destination id
    pub fn send_frame(&mut self, frame_type: FrameType, goal: u8, payload: &[u8]) -> Result<()> {
        protocol::write_frame(&mut self.writer, frame_type, goal, self.source, payload)
    }

    /// Send bytes exactly as given
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    // =========================================================================
    // Receiving
    // =========================================================================

    /// Read one reply and parse its JSON
    pub fn recv_reply(&mut self) -> Result<Value> {
        match self.framing {
            Framing::Legacy => {
                let mut line = String::new();
                if self.reader.read_line(&mut line)? == 0 {
                    return Err(HubError::Transport("Connection closed by hub".to_string()));
                }
                Ok(serde_json::from_str(line.trim_end())?)
            }
            Framing::Framed => {
                let frame = self.recv_frame()?;
                Ok(serde_json::from_slice(&frame.payload)?)
            }
        }
    }

    /// Read one frame
    pub fn recv_frame(&mut self) -> Result<Frame> {
        protocol::read_frame(&mut self.reader)
    }

    /// Read whatever bytes arrive next, such as data forwarded by `transmit`
    pub fn recv_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.reader.read(buf)?;
        if n == 0 {
            return Err(HubError::Transport("Connection closed by hub".to_string()));
        }
        Ok(n)
    }

    /// Read replies until none arrives within `idle`
    pub fn recv_replies(&mut self, idle: Duration) -> Result<Vec<Value>> {
        self.set_read_timeout(Some(idle))?;
        let mut replies = Vec::new();

        let outcome = loop {
            match self.recv_reply() {
                Ok(reply) => replies.push(reply),
                Err(HubError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        self.set_read_timeout(None)?;
        outcome.map(|()| replies)
    }

    /// Send a JSON request and wait for one reply
    pub fn request(&mut self, request: &Value) -> Result<Value> {
        self.send_json(request)?;
        self.recv_reply()
    }

    /// Register a display name for this connection
    pub fn register(&mut self, name: &str) -> Result<Value> {
        self.request(&json!({ "command": "register", "name": name }))
    }
}
