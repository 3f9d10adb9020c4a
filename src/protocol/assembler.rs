//! Receive-side unit assembly
//!
//! Splits a connection's byte stream into the units the hub classifies:
//! - A frame is cut at `HEADER_SIZE + length`, however many reads it spans
//! - A read that starts with `{` is one legacy JSON request as received
//! - Anything else is passed on as received and dropped by the hub

use bytes::{Bytes, BytesMut};

use crate::error::{HubError, Result};
use super::{FRAME_HEAD, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// Per-connection buffer of bytes not yet forming a complete unit
#[derive(Debug, Default)]
pub struct UnitAssembler {
    pending: BytesMut,
}

impl UnitAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one read and take every unit it completes
    ///
    /// Fails when a frame header declares more than `MAX_PAYLOAD_SIZE`
    /// bytes; the stream cannot be resynchronized after that.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>> {
        self.pending.extend_from_slice(chunk);

        let mut units = Vec::new();
        while let Some(unit) = self.next_unit()? {
            units.push(unit);
        }
        Ok(units)
    }

    /// Bytes held back waiting for the rest of a frame
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn next_unit(&mut self) -> Result<Option<Bytes>> {
        let Some(&first) = self.pending.first() else {
            return Ok(None);
        };

        if first != FRAME_HEAD {
            return Ok(Some(self.pending.split().freeze()));
        }
        if self.pending.len() < HEADER_SIZE {
            return Ok(None);
        }

        let length = u32::from_le_bytes([
            self.pending[4],
            self.pending[5],
            self.pending[6],
            self.pending[7],
        ]);
        if length > MAX_PAYLOAD_SIZE {
            self.pending.clear();
            return Err(HubError::MalformedFrame(format!(
                "Declared payload too large: {} bytes (max {})",
                length, MAX_PAYLOAD_SIZE
            )));
        }

        let total = HEADER_SIZE + length as usize;
        if self.pending.len() < total {
            return Ok(None);
        }
        Ok(Some(self.pending.split_to(total).freeze()))
    }
}
