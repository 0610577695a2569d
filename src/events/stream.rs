//! The game-event stream walker.
//!
//! Every record of `replay.game.events` has the same envelope:
//!
//! ```text
//! [frame delta: variable] [header: 1] [code: 1] [payload: dialect specific]
//! ```
//!
//! The header carries the 3-bit category and the 5-bit player id. Payloads
//! may end mid-byte; the walker realigns after every record so the next
//! envelope always starts on a byte boundary.

use std::collections::HashMap;

use tracing::trace;

use super::dispatch::DispatchTable;
use super::types::{EventHeader, EventKind, GameEvent, FRAMES_PER_SECOND};
use crate::binary::BitReader;
use crate::error::{ParserError, Result};

/// How the category and player id are pulled out of the header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// Two sub-byte reads: 5 bits of player id, then 3 bits of category.
    /// Used before build 16561.
    SplitBits,
    /// One whole byte: `category = h >> 5`, `player_id = h & 0x1F`.
    PackedByte,
}

impl HeaderLayout {
    /// Reads the header, returning `(category, player_id)`.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the header byte is missing.
    pub fn read(self, reader: &mut BitReader<'_>) -> Result<(u8, u8)> {
        match self {
            HeaderLayout::SplitBits => {
                let player_id = reader.read_bits(5)? as u8;
                let category = reader.read_bits(3)? as u8;
                Ok((category, player_id))
            }
            HeaderLayout::PackedByte => {
                let header = reader.read_u8()?;
                Ok((header >> 5, header & 0x1F))
            }
        }
    }
}

/// Iterator over the records of a game-event stream.
///
/// Yields one decoded [`GameEvent`] per record. The first error ends the
/// iteration; the stream cannot resynchronize after an unknown or truncated
/// record because the length of the failed record is unknown.
///
/// # Example
///
/// ```
/// use sc2_parser::events::{DispatchTable, EventKind, EventStream, HeaderLayout};
///
/// // delta 1, category 0 / player 1, code 0x05 (game start)
/// let data = [0x04, 0x01, 0x05];
/// let table = DispatchTable::legacy();
/// let events: Vec<_> = EventStream::new(&data, &table, HeaderLayout::PackedByte)
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].frame, 1);
/// assert_eq!(events[0].kind, EventKind::GameStart);
/// ```
pub struct EventStream<'a, 't> {
    reader: BitReader<'a>,
    table: &'t DispatchTable,
    layout: HeaderLayout,
    /// Cumulative frame count.
    frame: u32,
    finished: bool,
}

impl<'a, 't> EventStream<'a, 't> {
    /// Creates a walker over `data` using one dialect's table and header
    /// layout.
    #[must_use]
    pub fn new(data: &'a [u8], table: &'t DispatchTable, layout: HeaderLayout) -> Self {
        Self {
            reader: BitReader::new(data),
            table,
            layout,
            frame: 0,
            finished: false,
        }
    }

    /// Returns the byte offset of the next record.
    #[must_use]
    pub fn current_offset(&self) -> usize {
        self.reader.position()
    }

    /// Returns the cumulative frame count of the last decoded record.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Returns whether iteration has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished || self.reader.is_empty()
    }

    /// Decodes every remaining record into `sink`.
    ///
    /// Records decoded before a failure stay in `sink`.
    ///
    /// # Errors
    ///
    /// - `ParserError::UnexpectedEof` if a record is truncated
    /// - `ParserError::UnknownEvent` if no dispatch entry matches a record
    pub fn walk_into(&mut self, sink: &mut Vec<GameEvent>) -> Result<()> {
        for event in self.by_ref() {
            sink.push(event?);
        }
        Ok(())
    }

    fn parse_next(&mut self) -> Result<GameEvent> {
        let offset = self.reader.position();

        let delta = self.reader.read_timestamp()?;
        let frame = self.frame.checked_add(delta).ok_or_else(|| {
            ParserError::invalid_data(offset, format!("frame counter overflow adding {delta}"))
        })?;

        let (category, player_id) = self.layout.read(&mut self.reader)?;
        let code = self.reader.read_u8()?;

        let entry = self
            .table
            .lookup(category, code)
            .ok_or(ParserError::UnknownEvent {
                category,
                code,
                offset,
            })?;

        let header = EventHeader {
            frame,
            category,
            code,
            player_id,
            offset,
        };
        let mut event = entry.leaf.decode(&mut self.reader, &header)?;
        self.reader.align();
        event.bytes = self.reader.consumed_since(offset).to_vec();
        self.frame = frame;

        trace!(
            offset,
            frame,
            player_id,
            category,
            code,
            entry = entry.name,
            "decoded game event"
        );

        Ok(event)
    }
}

impl Iterator for EventStream<'_, '_> {
    type Item = Result<GameEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }

        match self.parse_next() {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Statistics about the events of a replay.
#[derive(Debug, Default, Clone)]
pub struct EventStatistics {
    /// Total number of events.
    pub total_events: u32,

    /// Number of ability events.
    pub ability_events: u32,

    /// Number of selection events.
    pub selection_events: u32,

    /// Number of hotkey events.
    pub hotkey_events: u32,

    /// Number of resource transfers.
    pub transfer_events: u32,

    /// Number of decoded camera movements.
    pub camera_events: u32,

    /// Number of fixed-shape events kept as raw payload.
    pub unknown_events: u32,

    /// Player actions per player id.
    pub actions_per_player: HashMap<u8, u32>,

    /// Frame of the last event.
    pub last_frame: u32,
}

impl EventStatistics {
    /// Creates new empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds statistics over a slice of events.
    #[must_use]
    pub fn from_events(events: &[GameEvent]) -> Self {
        let mut stats = Self::new();
        for event in events {
            stats.record(event);
        }
        stats
    }

    /// Records an event in the statistics.
    pub fn record(&mut self, event: &GameEvent) {
        self.total_events += 1;
        self.last_frame = self.last_frame.max(event.frame);

        match &event.kind {
            EventKind::Ability(_) => self.ability_events += 1,
            EventKind::Selection(_) => self.selection_events += 1,
            EventKind::Hotkey(_) => self.hotkey_events += 1,
            EventKind::ResourceTransfer(_) => self.transfer_events += 1,
            EventKind::CameraMovement(_) => self.camera_events += 1,
            EventKind::Unknown { .. } => self.unknown_events += 1,
            EventKind::PlayerJoin | EventKind::GameStart | EventKind::PlayerLeave => {}
        }

        if event.kind.is_player_action() {
            *self.actions_per_player.entry(event.player_id).or_insert(0) += 1;
        }
    }

    /// Returns a player's actions per minute of game time.
    #[must_use]
    pub fn actions_per_minute(&self, player_id: u8) -> f64 {
        let actions = self.actions_per_player.get(&player_id).copied().unwrap_or(0);
        let minutes = f64::from(self.last_frame) / f64::from(FRAMES_PER_SECOND) / 60.0;
        if minutes > 0.0 {
            f64::from(actions) / minutes
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::dispatch::{CodePredicate, Leaf};

    fn three_bits(reader: &mut BitReader<'_>, _: &EventHeader) -> Result<EventKind> {
        let value = reader.read_bits(3)? as u8;
        Ok(EventKind::Unknown {
            payload: vec![value],
        })
    }

    fn odd_table() -> DispatchTable {
        DispatchTable::new().on(
            0x01,
            "three_bits",
            CodePredicate::Exact(0x42),
            Leaf::Decode(three_bits),
        )
    }

    // ========================
    // Header layouts
    // ========================

    #[test]
    fn test_header_layouts_agree_on_aligned_byte() {
        let data = [0b001_00101];
        let mut reader = BitReader::new(&data);
        assert_eq!(HeaderLayout::SplitBits.read(&mut reader).unwrap(), (1, 5));
        let mut reader = BitReader::new(&data);
        assert_eq!(HeaderLayout::PackedByte.read(&mut reader).unwrap(), (1, 5));
    }

    // ========================
    // Walking
    // ========================

    #[test]
    fn test_realigns_after_partial_byte_payload() {
        let data = [
            0x04, 0x21, 0x42, 0xFD, // delta 1, P1, 3-bit payload = 5
            0x08, 0x22, 0x42, 0x02, // delta 2, P2, 3-bit payload = 2
        ];
        let table = odd_table();
        let events: Vec<_> = EventStream::new(&data, &table, HeaderLayout::PackedByte)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].frame, 1);
        assert_eq!(events[0].offset, 0);
        assert_eq!(events[0].bytes, vec![0x04, 0x21, 0x42, 0xFD]);
        assert_eq!(events[0].kind, EventKind::Unknown { payload: vec![5] });
        assert_eq!(events[1].offset, 4);
        assert_eq!(events[1].bytes, data[4..].to_vec());
        assert_eq!(events[1].frame, 3);
        assert_eq!(events[1].player_id, 2);
        assert_eq!(events[1].kind, EventKind::Unknown { payload: vec![2] });
    }

    #[test]
    fn test_unknown_event_stops_iteration() {
        let data = [0x00, 0x21, 0x43, 0x00, 0x00, 0x00];
        let table = odd_table();
        let mut stream = EventStream::new(&data, &table, HeaderLayout::PackedByte);

        match stream.next() {
            Some(Err(ParserError::UnknownEvent {
                category,
                code,
                offset,
            })) => {
                assert_eq!((category, code, offset), (1, 0x43, 0));
            }
            other => panic!("Expected UnknownEvent, got {other:?}"),
        }
        assert!(stream.next().is_none());
        assert!(stream.is_finished());
    }

    #[test]
    fn test_walk_into_keeps_events_before_truncation() {
        let data = [0x04, 0x21, 0x42, 0x00, 0x08, 0x21];
        let table = odd_table();
        let mut stream = EventStream::new(&data, &table, HeaderLayout::PackedByte);
        let mut events = Vec::new();

        let err = stream.walk_into(&mut events).unwrap_err();
        assert!(err.is_truncation());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].frame, 1);
    }

    #[test]
    fn test_empty_stream() {
        let table = DispatchTable::legacy();
        let mut stream = EventStream::new(&[], &table, HeaderLayout::SplitBits);
        assert!(stream.next().is_none());
        assert_eq!(stream.frame(), 0);
    }

    // ========================
    // Statistics
    // ========================

    #[test]
    fn test_statistics() {
        let header = EventHeader {
            frame: 16 * 60,
            category: 0x01,
            code: 0x09,
            player_id: 1,
            offset: 0,
        };
        let events = vec![
            header.into_event(EventKind::PlayerLeave),
            header.into_event(EventKind::Unknown { payload: vec![] }),
        ];
        let stats = EventStatistics::from_events(&events);
        assert!(events[0].bytes.is_empty());
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.unknown_events, 1);
        assert_eq!(stats.last_frame, 960);
        assert!(stats.actions_per_player.is_empty());
        assert!((stats.actions_per_minute(1) - 0.0).abs() < f64::EPSILON);
    }
}
