//! Frame definitions
//!
//! The fixed header and the parsed frame handed to the dispatcher or relay.

use bytes::Bytes;

/// Sentinel byte that starts every frame (1010 1010)
pub const FRAME_HEAD: u8 = 0xAA;

/// Destination id that addresses the hub itself
pub const HUB_ID: u8 = 0x10;

/// Id that never belongs to a client
pub const INVALID_ID: u8 = 0xF0;

/// Header size: head (1) + type (1) + goal (1) + source (1) + length (4)
pub const HEADER_SIZE: usize = 8;

/// Maximum payload size (64 KB)
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

/// Frame payload types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Failed verification; never dispatched or relayed
    Unknown = 0x00,

    /// JSON command object
    Json = 0x01,

    /// Opaque binary data
    Binary = 0x02,

    /// argv-style command text
    Command = 0x03,
}

impl FrameType {
    /// Map a wire byte to a frame type; unrecognized bytes are `Unknown`
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => FrameType::Json,
            0x02 => FrameType::Binary,
            0x03 => FrameType::Command,
            _ => FrameType::Unknown,
        }
    }
}

/// The fixed 8-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub head: u8,
    pub frame_type: FrameType,
    pub goal: u8,
    pub source: u8,
    /// Declared payload length (little-endian on the wire)
    pub length: u32,
}

impl FrameHeader {
    /// Read the header fields from the start of `bytes`.
    ///
    /// Only the layout is parsed here; sentinel and length consistency are
    /// checked by the codec.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            head: bytes[0],
            frame_type: FrameType::from_byte(bytes[1]),
            goal: bytes[2],
            source: bytes[3],
            length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

/// A verified frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,

    /// Destination id
    pub goal: u8,

    /// Originating id
    pub source: u8,

    pub payload: Bytes,
}

impl Frame {
    /// Whether the frame is addressed to the hub
    pub fn is_for_hub(&self) -> bool {
        self.goal == HUB_ID
    }

    /// Declared length, always equal to the payload size once verified
    pub fn length(&self) -> u32 {
        self.payload.len() as u32
    }
}
