//! Assembler Tests
//!
//! Tests for cutting a connection's byte stream into protocol units.

use framehub::protocol::{
    classify, encode, FrameType, Inbound, UnitAssembler, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use framehub::HubError;

// =============================================================================
// Frame Reassembly Tests
// =============================================================================

#[test]
fn test_frame_in_one_read() {
    let frame = encode(FrameType::Binary, 2, 1, b"hello").unwrap();
    let mut assembler = UnitAssembler::new();

    let units = assembler.push(&frame).unwrap();
    assert_eq!(units, vec![frame]);
    assert_eq!(assembler.pending(), 0);
}

#[test]
fn test_frame_split_across_reads() {
    let payload = vec![b'x'; 10_000];
    let frame = encode(FrameType::Binary, 2, 1, &payload).unwrap();
    let mut assembler = UnitAssembler::new();

    let mut units = Vec::new();
    for chunk in frame.chunks(4096) {
        units.extend(assembler.push(chunk).unwrap());
    }

    assert_eq!(units.len(), 1);
    assert_eq!(units[0], frame);
    assert_eq!(assembler.pending(), 0);
}

#[test]
fn test_header_split_across_reads() {
    let frame = encode(FrameType::Json, 2, 1, b"{}").unwrap();
    let mut assembler = UnitAssembler::new();

    assert!(assembler.push(&frame[..3]).unwrap().is_empty());
    assert_eq!(assembler.pending(), 3);
    assert_eq!(assembler.push(&frame[3..]).unwrap(), vec![frame]);
}

#[test]
fn test_json_inside_split_payload_stays_in_the_frame() {
    let mut payload = vec![b'x'; 4096 - HEADER_SIZE];
    payload.extend_from_slice(br#"{"command":"router","ssid":"other","pwd":"pw"}"#);
    let frame = encode(FrameType::Binary, 2, 1, &payload).unwrap();
    let mut assembler = UnitAssembler::new();

    // The second read starts with `{` but belongs to the frame
    assert!(assembler.push(&frame[..4096]).unwrap().is_empty());
    let units = assembler.push(&frame[4096..]).unwrap();

    assert_eq!(units.len(), 1);
    match classify(&units[0]) {
        Inbound::Frame(decoded) => {
            assert_eq!(decoded.goal, 2);
            assert_eq!(&decoded.payload[..], &payload[..]);
        }
        other => panic!("Expected frame, got {:?}", other),
    }
}

#[test]
fn test_back_to_back_frames_in_one_read() {
    let first = encode(FrameType::Binary, 2, 1, b"one").unwrap();
    let second = encode(FrameType::Binary, 3, 1, b"two").unwrap();
    let mut stream = first.to_vec();
    stream.extend_from_slice(&second);
    stream.extend_from_slice(&second[..5]);

    let mut assembler = UnitAssembler::new();
    let units = assembler.push(&stream).unwrap();

    assert_eq!(units, vec![first, second]);
    assert_eq!(assembler.pending(), 5);
}

#[test]
fn test_oversized_declared_length_is_an_error() {
    let mut header = encode(FrameType::Binary, 2, 1, b"").unwrap().to_vec();
    header[4..8].copy_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_le_bytes());

    let mut assembler = UnitAssembler::new();
    let result = assembler.push(&header);

    assert!(matches!(result, Err(HubError::MalformedFrame(_))));
    assert_eq!(assembler.pending(), 0);
}

// =============================================================================
// Legacy and Garbage Tests
// =============================================================================

#[test]
fn test_legacy_read_is_one_unit() {
    let request = br#"{"command":"list"}"#;
    let mut assembler = UnitAssembler::new();

    let units = assembler.push(request).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(&units[0][..], &request[..]);
    assert_eq!(assembler.pending(), 0);
}

#[test]
fn test_legacy_after_frame_in_same_read() {
    let frame = encode(FrameType::Binary, 2, 1, b"data").unwrap();
    let mut stream = frame.to_vec();
    stream.extend_from_slice(br#"{"command":"list"}"#);

    let mut assembler = UnitAssembler::new();
    let units = assembler.push(&stream).unwrap();

    assert_eq!(units.len(), 2);
    assert_eq!(units[0], frame);
    assert!(matches!(classify(&units[1]), Inbound::Legacy(_)));
}

#[test]
fn test_garbage_read_is_passed_through() {
    let mut assembler = UnitAssembler::new();
    let units = assembler.push(b"\x01\x02garbage").unwrap();

    assert_eq!(units.len(), 1);
    assert!(matches!(classify(&units[0]), Inbound::Invalid(_)));
}
