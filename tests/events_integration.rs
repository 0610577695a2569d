//! Integration tests for the game-event stream.
//!
//! These tests validate that the walker:
//! - Accumulates frame deltas into non-decreasing timestamps
//! - Realigns to a byte boundary after bit-packed payloads
//! - Reads both header layouts
//! - Reports unknown and truncated records with their position

use proptest::prelude::*;
use sc2_parser::events::{decode_amount, EventKind, EventStatistics, EventStream, HotkeyOperation};
use sc2_parser::readers::GameEventsReader;
use sc2_parser::ParserError;

/// Encodes a frame delta below 2^14 the way the stream stores it.
fn timestamp(delta: u32) -> Vec<u8> {
    assert!(delta < 1 << 14);
    if delta < 64 {
        vec![(delta << 2) as u8]
    } else {
        vec![(((delta >> 8) << 2) | 1) as u8, (delta & 0xFF) as u8]
    }
}

/// A game-start record: category 0, player 1, code 0x05, no payload.
fn game_start(delta: u32) -> Vec<u8> {
    let mut data = timestamp(delta);
    data.extend_from_slice(&[0x01, 0x05]);
    data
}

// ========================
// Timestamps
// ========================

proptest! {
    #[test]
    fn frames_are_cumulative_and_non_decreasing(deltas in prop::collection::vec(0u32..(1 << 14), 0..64)) {
        let data: Vec<u8> = deltas.iter().flat_map(|&d| game_start(d)).collect();
        let reader = GameEventsReader::dialect_17326();
        let events = reader.parse(&data).unwrap();

        prop_assert_eq!(events.len(), deltas.len());
        let mut expected = 0u32;
        for (event, delta) in events.iter().zip(&deltas) {
            expected += delta;
            prop_assert_eq!(event.frame, expected);
        }
        prop_assert!(events.windows(2).all(|w| w[0].frame <= w[1].frame));
    }
}

#[test]
fn test_three_byte_timestamp() {
    // 0b10 in the low bits: two more bytes follow
    let data = [0x06, 0x01, 0x02, 0x01, 0x05];
    let events = GameEventsReader::dialect_16561().parse(&data).unwrap();
    assert_eq!(events[0].frame, 0x01_01_02);
}

// ========================
// Alignment
// ========================

#[test]
fn test_bit_packed_hotkey_realigns() {
    let data = [
        0x00, 0x21, 0x3D, 0xFA, // P1 hotkey group 3: op 0b10, no mask, 5 bits left over
        0x04, 0x22, 0x1D, 0x01, // P2 hotkey group 1: op 0b01, no mask
    ];
    let events = GameEventsReader::dialect_16561().parse(&data).unwrap();
    assert_eq!(events.len(), 2);

    match &events[0].kind {
        EventKind::Hotkey(hotkey) => {
            assert_eq!(hotkey.group, 3);
            assert_eq!(hotkey.operation, HotkeyOperation::Select);
            assert!(hotkey.mask.is_none());
        }
        other => panic!("Expected hotkey, got {other:?}"),
    }
    match &events[1].kind {
        EventKind::Hotkey(hotkey) => {
            assert_eq!(hotkey.group, 1);
            assert_eq!(hotkey.operation, HotkeyOperation::Add);
        }
        other => panic!("Expected hotkey, got {other:?}"),
    }
    assert_eq!(events[1].frame, 1);
    assert_eq!(events[1].player_id, 2);
}

#[test]
fn test_stream_offsets_track_records() {
    let data = [0x00, 0x21, 0x3D, 0xFA, 0x04, 0x22, 0x1D, 0x01];
    let reader = GameEventsReader::dialect_16561();
    let mut stream = reader.stream(&data);

    assert_eq!(stream.current_offset(), 0);
    let first = stream.next().unwrap().unwrap();
    assert_eq!(stream.current_offset(), 4);
    let second = stream.next().unwrap().unwrap();
    assert!(stream.is_finished());

    assert_eq!((first.offset, second.offset), (0, 4));
    assert_eq!(first.bytes, &data[..4]);
    assert_eq!(second.bytes, &data[4..]);
    assert!(stream.next().is_none());
}

// ========================
// Header layouts
// ========================

#[test]
fn test_legacy_header_and_ability() {
    // header 0b001_00101 -> category 1, player 5; code 0x1B -> ability
    let data = [0x00, 0b001_00101, 0x1B, 0x00, 0x20, 0x00, 0x00, 0x05];
    let events = GameEventsReader::legacy().parse(&data).unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].category, 1);
    assert_eq!(events[0].player_id, 5);
    assert_eq!(events[0].kind.type_name(), "Ability");
    assert_eq!(events[0].bytes, data);
}

#[test]
fn test_resource_transfer_recipient() {
    let mut data = vec![0x00, 0x21, 0x3F, 0x00];
    for raw in [0x0000_0110u32, 0x0000_0020, 0, 0] {
        data.extend_from_slice(&raw.to_be_bytes());
    }

    let events = GameEventsReader::legacy().parse(&data).unwrap();
    match &events[0].kind {
        EventKind::ResourceTransfer(transfer) => {
            assert_eq!(transfer.recipient, 3);
            assert_eq!(transfer.minerals, 16);
            assert_eq!(transfer.gas, 0);
        }
        other => panic!("Expected transfer, got {other:?}"),
    }
    assert_eq!(decode_amount(0x0000_0110), 16);
}

// ========================
// Errors
// ========================

#[test]
fn test_unknown_event_reports_position() {
    let mut data = game_start(1);
    data.extend_from_slice(&[0x00, 0x01, 0x0B]); // 0x0B is not a join code after 17326
    let err = GameEventsReader::dialect_17326().parse(&data).unwrap_err();

    match err {
        ParserError::UnknownEvent {
            category,
            code,
            offset,
        } => {
            assert_eq!(category, 0);
            assert_eq!(code, 0x0B);
            assert_eq!(offset, 3);
        }
        other => panic!("Expected UnknownEvent, got {other:?}"),
    }
}

#[test]
fn test_truncation_keeps_prior_events_in_sink() {
    let mut data = game_start(0);
    data.extend(game_start(2));
    data.extend_from_slice(&[0x00, 0x21, 0x1B]); // ability with no payload

    let reader = GameEventsReader::dialect_17326();
    let mut events = Vec::new();
    let err = reader.stream(&data).walk_into(&mut events).unwrap_err();

    assert!(err.is_truncation());
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].frame, 2);
    assert!(reader.parse(&data).is_err());
}

#[test]
fn test_stream_ending_mid_header() {
    let mut data = game_start(3);
    data.extend_from_slice(&[0x08, 0x01]); // delta 2, header, no code byte

    let reader = GameEventsReader::dialect_16561();
    let mut events = Vec::new();
    let err = reader.stream(&data).walk_into(&mut events).unwrap_err();

    assert!(matches!(err, ParserError::UnexpectedEof { offset: 5, .. }));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].frame, 3);
}

#[test]
fn test_statistics_over_stream() {
    let data = [0x00, 0x21, 0x3D, 0xFA, 0x04, 0x22, 0x1D, 0x01, 0x00, 0x01, 0x05];
    let reader = GameEventsReader::dialect_16561();
    let events: Vec<_> = EventStream::new(&data, reader.table(), reader.layout())
        .collect::<Result<_, _>>()
        .unwrap();

    let stats = EventStatistics::from_events(&events);
    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.hotkey_events, 2);
    assert_eq!(stats.actions_per_player.get(&1), Some(&1));
    assert_eq!(stats.actions_per_player.get(&2), Some(&1));
}
