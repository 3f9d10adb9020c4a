//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬──────────────┬─────────────┐
//! │ Head (1) │ Type (1) │ Goal (1) │ Src (1)  │ Len (4, LE)  │   Payload   │
//! └──────────┴──────────┴──────────┴──────────┴──────────────┴─────────────┘
//! ```
//!
//! `decode` takes one complete unit: the declared length must equal exactly
//! the number of bytes after the header.
//!
//! ### Legacy mode
//! A buffer whose first byte is `{` carries a bare JSON object for the hub.
//! Replies in this mode are the JSON text followed by `\n`.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{HubError, Result};
use super::{Frame, FrameHeader, FrameType, FRAME_HEAD, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// First byte of a legacy raw JSON request
pub const LEGACY_JSON_START: u8 = b'{';

/// Terminator appended to legacy replies
pub const LEGACY_REPLY_END: u8 = b'\n';

/// Classification of one received buffer
#[derive(Debug)]
pub enum Inbound<'a> {
    /// A verified frame
    Frame(Frame),

    /// Raw JSON addressed to the hub
    Legacy(&'a [u8]),

    /// Neither; dropped without a reply
    Invalid(HubError),
}

// =============================================================================
// Frame Encoding/Decoding
// =============================================================================

/// Encode a frame to bytes
///
/// Format: head (1) + type (1) + goal (1) + source (1) + payload_len (4) + payload
pub fn encode(frame_type: FrameType, goal: u8, source: u8, payload: &[u8]) -> Result<Bytes> {
    if frame_type == FrameType::Unknown {
        return Err(HubError::Protocol(
            "Cannot encode a frame of unknown type".to_string(),
        ));
    }
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(HubError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(FRAME_HEAD);
    message.put_u8(frame_type as u8);
    message.put_u8(goal);
    message.put_u8(source);
    message.put_u32_le(payload.len() as u32);
    message.put_slice(payload);

    Ok(message.freeze())
}

/// Decode a frame from one received buffer
///
/// Fails when the sentinel is wrong, the type byte is not a known type, or
/// the declared length differs from the bytes actually present.
pub fn decode(bytes: &[u8]) -> Result<Frame> {
    let header = FrameHeader::parse(bytes).ok_or_else(|| {
        HubError::MalformedFrame(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        ))
    })?;

    if header.head != FRAME_HEAD {
        return Err(HubError::MalformedFrame(format!(
            "Bad sentinel: 0x{:02x}",
            header.head
        )));
    }

    if header.frame_type == FrameType::Unknown {
        return Err(HubError::MalformedFrame(format!(
            "Unknown frame type: 0x{:02x}",
            bytes[1]
        )));
    }

    let actual = bytes.len() - HEADER_SIZE;
    if header.length as usize != actual {
        return Err(HubError::MalformedFrame(format!(
            "Length mismatch: declared {}, received {}",
            header.length, actual
        )));
    }

    Ok(Frame {
        frame_type: header.frame_type,
        goal: header.goal,
        source: header.source,
        payload: Bytes::copy_from_slice(&bytes[HEADER_SIZE..]),
    })
}

/// Classify one received buffer as a frame, a legacy JSON request, or garbage
pub fn classify(bytes: &[u8]) -> Inbound<'_> {
    if bytes.first() == Some(&LEGACY_JSON_START) {
        return Inbound::Legacy(bytes);
    }

    match decode(bytes) {
        Ok(frame) => Inbound::Frame(frame),
        Err(e) => Inbound::Invalid(e),
    }
}

/// Encode a legacy reply: the JSON text and a trailing newline
pub fn encode_legacy(json: &[u8]) -> Bytes {
    let mut message = BytesMut::with_capacity(json.len() + 1);
    message.put_slice(json);
    message.put_u8(LEGACY_REPLY_END);
    message.freeze()
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete frame from a stream
///
/// Blocks until the header and the declared payload have been received
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    if header[0] != FRAME_HEAD {
        return Err(HubError::MalformedFrame(format!(
            "Bad sentinel: 0x{:02x}",
            header[0]
        )));
    }

    // Parse payload length
    let payload_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

    // Validate payload length
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(HubError::MalformedFrame(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    // Combine and decode
    let mut full_message = vec![0u8; HEADER_SIZE + payload_len];
    full_message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut full_message[HEADER_SIZE..])?;
    }

    decode(&full_message)
}

/// Encode a frame and write it to a stream
pub fn write_frame<W: Write>(
    writer: &mut W,
    frame_type: FrameType,
    goal: u8,
    source: u8,
    payload: &[u8],
) -> Result<()> {
    let bytes = encode(frame_type, goal, source, payload)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
