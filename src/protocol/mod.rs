//! Protocol Module
//!
//! Defines the wire protocol between clients and the hub.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬──────────────┬─────────────┐
//! │ Head (1) │ Type (1) │ Goal (1) │ Src (1)  │ Len (4, LE)  │   Payload   │
//! └──────────┴──────────┴──────────┴──────────┴──────────────┴─────────────┘
//! ```
//!
//! ### Frame Types
//! - 0x00: UNKNOWN - failed verification
//! - 0x01: JSON    - JSON command object
//! - 0x02: BINARY  - opaque data
//! - 0x03: COMMAND - argv-style command text
//!
//! ### Reserved Ids
//! - 0x10: the hub itself
//! - 0xF0: invalid / unassigned
//!
//! ### Legacy Mode
//! A read starting with `{` is a bare JSON request for the hub.
//!
//! ### Units
//! Frames are reassembled from the stream by their declared length; a
//! legacy request is the single read that carried it.
//!
//! ### Replies
//! JSON objects carrying `status` (`succeed`, `failed`, `unregister`,
//! `unknown`, `invalid`), `id`, `mark`, or client listings.

mod frame;
mod command;
mod reply;
mod codec;
mod assembler;

pub use frame::{
    Frame, FrameHeader, FrameType, FRAME_HEAD, HEADER_SIZE, HUB_ID, INVALID_ID, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType, LookupKey};
pub use reply::{Reply, Status};
pub use codec::{
    classify, decode, encode, encode_legacy, read_frame, write_frame, Inbound, LEGACY_JSON_START,
    LEGACY_REPLY_END,
};
pub use assembler::UnitAssembler;
